//! BetterTTV response models

use serde::Deserialize;

use emotrics_core::{Emote, EmoteSource};

/// `/3/cached/users/twitch/{id}`: the channel's own uploads plus emotes
/// shared from other channels.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BttvUserResponse {
    #[serde(default)]
    pub channel_emotes: Vec<BttvEmote>,
    #[serde(default)]
    pub shared_emotes: Vec<BttvEmote>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BttvEmote {
    pub code: String,
}

pub(crate) fn collect_user(resp: BttvUserResponse) -> Vec<Emote> {
    resp.channel_emotes
        .into_iter()
        .chain(resp.shared_emotes)
        .map(|e| Emote::new(e.code, EmoteSource::Bttv))
        .collect()
}

pub(crate) fn collect_global(emotes: Vec<BttvEmote>) -> Vec<Emote> {
    emotes
        .into_iter()
        .map(|e| Emote::new(e.code, EmoteSource::Bttv))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_response() {
        let json = r#"{
            "id": "5678",
            "bots": [],
            "channelEmotes": [
                {"id": "54fa8f1401e468494b85b537", "code": "monkaS", "imageType": "png"}
            ],
            "sharedEmotes": [
                {"id": "5e76d338d6581c3724c0f0b2", "code": "catJAM", "imageType": "gif"},
                {"id": "5f1b0186cf6d2144653d2970", "code": "PepeLaugh", "imageType": "gif"}
            ]
        }"#;

        let resp: BttvUserResponse = serde_json::from_str(json).unwrap();
        let emotes = collect_user(resp);
        assert_eq!(emotes.len(), 3);
        assert_eq!(emotes[0], Emote::new("monkaS", EmoteSource::Bttv));
        assert_eq!(emotes[1], Emote::new("catJAM", EmoteSource::Bttv));
        assert_eq!(emotes[2], Emote::new("PepeLaugh", EmoteSource::Bttv));
    }

    #[test]
    fn test_parse_user_response_missing_lists() {
        let resp: BttvUserResponse = serde_json::from_str(r#"{"id": "5678"}"#).unwrap();
        assert!(collect_user(resp).is_empty());
    }

    #[test]
    fn test_parse_global_response() {
        let json = r#"[
            {"id": "54fa925e01e468494b85b54d", "code": "OhMyGoodness", "imageType": "png"},
            {"id": "54fab45f633595ca4c713abc", "code": "CiGrip", "imageType": "png"}
        ]"#;

        let emotes: Vec<BttvEmote> = serde_json::from_str(json).unwrap();
        let emotes = collect_global(emotes);
        assert_eq!(emotes.len(), 2);
        assert!(emotes.iter().all(|e| e.source == EmoteSource::Bttv));
    }
}
