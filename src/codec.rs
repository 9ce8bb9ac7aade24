//! Saved document codec
//!
//! The host persists one UTF-8 string. The document inside it is a JSON
//! object with two ordered arrays, `cardInstances` and `cardDropZones`.

use serde::{Deserialize, Serialize};

use crate::entity::{InstanceFragment, ZoneFragment};
use crate::error::{PersistError, PersistResult};

/// Complete saved state of a card session
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSavedState {
    pub card_instances: Vec<InstanceFragment>,
    pub card_drop_zones: Vec<ZoneFragment>,
}

impl GameSavedState {
    pub fn is_empty(&self) -> bool {
        self.card_instances.is_empty() && self.card_drop_zones.is_empty()
    }
}

pub fn encode(state: &GameSavedState) -> PersistResult<String> {
    serde_json::to_string(state).map_err(PersistError::Encode)
}

pub fn decode(saved: &str) -> PersistResult<GameSavedState> {
    serde_json::from_str(saved).map_err(PersistError::Decode)
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::card::{CardCategory, CardDefinition};
    use crate::entity::Placement;

    const SCENARIO: &str = r#"{
        "cardInstances": [{
            "definition": {"id": "bolt", "name": "Bolt", "category": "INSTANT", "template": "cards/bolt"},
            "placement": {"kind": "inZone", "zone": [-3, 0, 3]}
        }],
        "cardDropZones": [{
            "position": [-3, 0, 3],
            "rotation": [0, 180, 0],
            "size": [2.5, 5, 3],
            "category": "INSTANT"
        }]
    }"#;

    #[test]
    fn test_decode_document() {
        let state = decode(SCENARIO).unwrap();
        assert_eq!(state.card_drop_zones.len(), 1);
        let zone = &state.card_drop_zones[0];
        assert_eq!(zone.position, Vec3::new(-3.0, 0.0, 3.0));
        assert_eq!(zone.size, Vec3::new(2.5, 5.0, 3.0));
        assert_eq!(zone.category, CardCategory::Instant);

        assert_eq!(state.card_instances.len(), 1);
        assert_eq!(
            state.card_instances[0].definition,
            CardDefinition::new("bolt", "Bolt", CardCategory::Instant, "cards/bolt")
        );
        assert_eq!(
            state.card_instances[0].placement,
            Placement::InZone { zone: Vec3::new(-3.0, 0.0, 3.0) }
        );
    }

    #[test]
    fn test_encode_uses_stable_field_names() {
        let json: serde_json::Value =
            serde_json::from_str(&encode(&GameSavedState::default()).unwrap()).unwrap();
        assert_eq!(json, serde_json::json!({"cardInstances": [], "cardDropZones": []}));
    }

    #[test]
    fn test_empty_document_is_stable() {
        let first = encode(&GameSavedState::default()).unwrap();
        let second = encode(&decode(&first).unwrap()).unwrap();
        assert_eq!(first, second);
        assert!(decode(&first).unwrap().is_empty());
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(decode("{not json"), Err(PersistError::Decode(_))));
        assert!(matches!(decode(r#"{"cardInstances": []}"#), Err(PersistError::Decode(_))));
        assert!(matches!(
            decode(r#"{"cardInstances": [], "cardDropZones": [{"position": [1, 2]}]}"#),
            Err(PersistError::Decode(_))
        ));
    }
}
