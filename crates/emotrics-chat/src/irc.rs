//! IRCv3 line parsing for the Twitch chat protocol

use chrono::{TimeZone, Utc};
use std::collections::HashMap;

use emotrics_core::ChatMessage;

/// One parsed IRC line: `@tags :prefix COMMAND params :trailing`.
#[derive(Debug, Clone, PartialEq)]
pub struct IrcMessage {
    pub tags: HashMap<String, String>,
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl IrcMessage {
    /// Parse a single line (without the trailing CRLF). Returns `None` for
    /// lines with no command.
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        let mut tags = HashMap::new();
        if let Some(tagged) = rest.strip_prefix('@') {
            let (raw_tags, remainder) = tagged.split_once(' ')?;
            for tag in raw_tags.split(';') {
                match tag.split_once('=') {
                    Some((key, value)) => tags.insert(key.to_string(), value.to_string()),
                    None => tags.insert(tag.to_string(), String::new()),
                };
            }
            rest = remainder;
        }

        let mut prefix = None;
        if let Some(prefixed) = rest.strip_prefix(':') {
            let (raw_prefix, remainder) = prefixed.split_once(' ')?;
            prefix = Some(raw_prefix.to_string());
            rest = remainder;
        }

        let (front, trailing) = match rest.split_once(" :") {
            Some((front, trailing)) => (front, Some(trailing)),
            None => (rest, None),
        };

        let mut words = front.split_whitespace();
        let command = words.next()?.to_string();
        let mut params: Vec<String> = words.map(str::to_string).collect();
        if let Some(trailing) = trailing {
            params.push(trailing.to_string());
        }

        Some(Self {
            tags,
            prefix,
            command,
            params,
        })
    }

    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }
}

/// Expand the `emotes=` tag into one emote name per occurrence, in message
/// order. The tag format is `id:start-end,start-end/id:...` and the ranges
/// are Unicode code-point indices into the message text.
pub fn emote_occurrences(tag: &str, text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut occurrences: Vec<(usize, String)> = Vec::new();

    for entry in tag.split('/') {
        let Some((_, ranges)) = entry.split_once(':') else {
            continue;
        };
        for range in ranges.split(',') {
            let Some((start, end)) = range.split_once('-') else {
                continue;
            };
            let (Ok(start), Ok(end)) = (start.parse::<usize>(), end.parse::<usize>()) else {
                continue;
            };
            if start > end || end >= chars.len() {
                continue;
            }
            let name: String = chars[start..=end].iter().collect();
            occurrences.push((start, name));
        }
    }

    occurrences.sort_by_key(|(start, _)| *start);
    occurrences.into_iter().map(|(_, name)| name).collect()
}

/// Convert a parsed PRIVMSG into a [`ChatMessage`]. Returns `None` for lines
/// missing the channel or text parameter.
pub fn chat_message_from(irc: &IrcMessage) -> Option<ChatMessage> {
    let target = irc.params.first()?;
    let channel = target.strip_prefix('#').unwrap_or(target).to_string();
    let text = irc.params.get(1)?.clone();

    let emotes = irc
        .tag("emotes")
        .map(|tag| emote_occurrences(tag, &text))
        .unwrap_or_default();

    let timestamp = irc
        .tag("tmi-sent-ts")
        .and_then(|value| value.parse::<i64>().ok())
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
        .unwrap_or_else(Utc::now);

    Some(ChatMessage {
        channel,
        text,
        emotes,
        timestamp,
    })
}
