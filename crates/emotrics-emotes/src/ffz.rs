//! FrankerFaceZ response models

use serde::Deserialize;
use std::collections::BTreeMap;

use emotrics_core::{Emote, EmoteSource};

/// Shape shared by `/v1/set/global` and `/v1/room/id/{id}`: a map of emote
/// sets, each holding a list of emoticons.
#[derive(Debug, Deserialize)]
pub(crate) struct FfzSetsResponse {
    #[serde(default)]
    pub sets: BTreeMap<String, FfzSet>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FfzSet {
    #[serde(default)]
    pub emoticons: Vec<FfzEmote>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FfzEmote {
    pub name: String,
}

pub(crate) fn collect(resp: FfzSetsResponse) -> Vec<Emote> {
    resp.sets
        .into_values()
        .flat_map(|set| set.emoticons)
        .map(|e| Emote::new(e.name, EmoteSource::Ffz))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_room_response() {
        let json = r#"{
            "room": {"twitch_id": 22484632, "id": "forsen"},
            "sets": {
                "105458": {
                    "id": 105458,
                    "emoticons": [
                        {"id": 128054, "name": "forsenE", "width": 28},
                        {"id": 270930, "name": "forsenCD", "width": 32}
                    ]
                }
            }
        }"#;

        let resp: FfzSetsResponse = serde_json::from_str(json).unwrap();
        let emotes = collect(resp);
        assert_eq!(emotes.len(), 2);
        assert_eq!(emotes[0], Emote::new("forsenE", EmoteSource::Ffz));
        assert_eq!(emotes[1], Emote::new("forsenCD", EmoteSource::Ffz));
    }

    #[test]
    fn test_parse_global_response_multiple_sets() {
        let json = r#"{
            "default_sets": [3],
            "sets": {
                "3": {"emoticons": [{"id": 28136, "name": "LilZ"}]},
                "1532818": {"emoticons": [{"id": 720507, "name": "CatBag"}]}
            }
        }"#;

        let resp: FfzSetsResponse = serde_json::from_str(json).unwrap();
        let emotes = collect(resp);
        assert_eq!(emotes.len(), 2);
        assert!(emotes.iter().all(|e| e.source == EmoteSource::Ffz));
    }

    #[test]
    fn test_parse_empty_sets() {
        let resp: FfzSetsResponse = serde_json::from_str(r#"{"sets": {}}"#).unwrap();
        assert!(collect(resp).is_empty());
    }
}
