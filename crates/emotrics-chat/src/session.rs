//! Anonymous Twitch chat session over IRC-on-websocket

use anyhow::{Context, Result, anyhow};
use futures::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use std::collections::VecDeque;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, trace, warn};

use emotrics_core::ChatMessage;

use crate::irc::{IrcMessage, chat_message_from};

const CHAT_URL: &str = "wss://irc-ws.chat.twitch.tv:443";
/// Twitch treats any `justinfan*` nick as an anonymous read-only login.
const ANONYMOUS_NICK: &str = "justinfan12345";

type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsReader = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// One live read-only chat session bound to a single channel.
///
/// The session owns the websocket; callers drive it by awaiting
/// [`next_message`](Self::next_message) in a loop. Keepalive (server PING and
/// websocket ping frames) is answered internally.
pub struct ChatSession {
    channel: String,
    writer: WsWriter,
    reader: WsReader,
    pending: VecDeque<ChatMessage>,
}

impl ChatSession {
    /// Open an anonymous session and join the channel. The tags capability is
    /// requested so messages carry emote ranges and server timestamps.
    pub async fn connect(channel: &str) -> Result<Self> {
        let (stream, _) = connect_async(CHAT_URL)
            .await
            .context("Failed to open chat websocket")?;
        let (mut writer, reader) = stream.split();

        for line in [
            "CAP REQ :twitch.tv/tags twitch.tv/commands".to_string(),
            format!("NICK {ANONYMOUS_NICK}"),
            format!("JOIN #{channel}"),
        ] {
            writer
                .send(Message::Text(line))
                .await
                .context("Failed to send chat handshake")?;
        }

        debug!(channel, "chat session opened");
        Ok(Self {
            channel: channel.to_string(),
            writer,
            reader,
            pending: VecDeque::new(),
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Wait for the next chat message on this session.
    ///
    /// Returns `Ok(None)` when the server closes the stream and `Err` on
    /// transport failures or a server-requested reconnect; both mean the
    /// session is finished and a new one must be connected.
    pub async fn next_message(&mut self) -> Result<Option<ChatMessage>> {
        loop {
            if let Some(message) = self.pending.pop_front() {
                return Ok(Some(message));
            }

            match self.reader.next().await {
                Some(Ok(Message::Text(frame))) => self.handle_frame(&frame).await?,
                Some(Ok(Message::Ping(payload))) => {
                    self.writer
                        .send(Message::Pong(payload))
                        .await
                        .context("Failed to answer websocket ping")?;
                }
                Some(Ok(Message::Close(_))) | None => {
                    debug!(channel = %self.channel, "chat stream closed by server");
                    return Ok(None);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    return Err(anyhow!(e).context("chat websocket read failed"));
                }
            }
        }
    }

    /// A websocket text frame can carry several CRLF-separated IRC lines.
    async fn handle_frame(&mut self, frame: &str) -> Result<()> {
        for line in frame.lines() {
            let line = line.trim_end_matches('\r');
            if line.is_empty() {
                continue;
            }
            let Some(irc) = IrcMessage::parse(line) else {
                trace!(channel = %self.channel, line, "unparseable chat line");
                continue;
            };

            match irc.command.as_str() {
                "PRIVMSG" => match chat_message_from(&irc) {
                    Some(message) => self.pending.push_back(message),
                    None => warn!(channel = %self.channel, line, "malformed PRIVMSG"),
                },
                "PING" => {
                    let payload = irc
                        .params
                        .first()
                        .map(String::as_str)
                        .unwrap_or("tmi.twitch.tv");
                    self.writer
                        .send(Message::Text(format!("PONG :{payload}")))
                        .await
                        .context("Failed to answer server PING")?;
                }
                "RECONNECT" => {
                    return Err(anyhow!("server requested reconnect"));
                }
                _ => trace!(channel = %self.channel, command = %irc.command, "ignoring chat line"),
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("channel", &self.channel)
            .field("pending", &self.pending.len())
            .finish()
    }
}
