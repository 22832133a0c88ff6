//! 7TV response models

use serde::Deserialize;

use emotrics_core::{Emote, EmoteSource};

/// `/v3/users/twitch/{id}`: the user's active emote set.
#[derive(Debug, Deserialize)]
pub(crate) struct SevenTvUserResponse {
    pub emote_set: Option<SevenTvEmoteSet>,
}

/// An emote set object, also the shape of `/v3/emote-sets/global`.
#[derive(Debug, Deserialize)]
pub(crate) struct SevenTvEmoteSet {
    #[serde(default)]
    pub emotes: Vec<SevenTvEmote>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SevenTvEmote {
    pub name: String,
}

pub(crate) fn collect_set(set: SevenTvEmoteSet) -> Vec<Emote> {
    set.emotes
        .into_iter()
        .map(|e| Emote::new(e.name, EmoteSource::SevenTv))
        .collect()
}

pub(crate) fn collect_user(resp: SevenTvUserResponse) -> Vec<Emote> {
    resp.emote_set.map(collect_set).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_response() {
        let json = r#"{
            "id": "60b0dc1277137b000de9e675",
            "username": "forsen",
            "emote_set": {
                "id": "60b0dc1277137b000de9e676",
                "emotes": [
                    {"id": "60ae2e3db2ecb0150537ea84", "name": "FeelsOkayMan"},
                    {"id": "60ae4ec30e35477634988c18", "name": "peepoHey"}
                ]
            }
        }"#;

        let resp: SevenTvUserResponse = serde_json::from_str(json).unwrap();
        let emotes = collect_user(resp);
        assert_eq!(emotes.len(), 2);
        assert_eq!(emotes[0], Emote::new("FeelsOkayMan", EmoteSource::SevenTv));
        assert_eq!(emotes[1], Emote::new("peepoHey", EmoteSource::SevenTv));
    }

    #[test]
    fn test_parse_user_response_no_set() {
        let resp: SevenTvUserResponse =
            serde_json::from_str(r#"{"id": "x", "username": "y", "emote_set": null}"#).unwrap();
        assert!(collect_user(resp).is_empty());
    }

    #[test]
    fn test_parse_global_set() {
        let json = r#"{"id": "global", "emotes": [{"id": "1", "name": "RainTime"}]}"#;
        let set: SevenTvEmoteSet = serde_json::from_str(json).unwrap();
        let emotes = collect_set(set);
        assert_eq!(emotes, vec![Emote::new("RainTime", EmoteSource::SevenTv)]);
    }
}
