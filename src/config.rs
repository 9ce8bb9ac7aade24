//! Session configuration
//!
//! Bootstrap layout and zone placement. Loaded from JSON; any missing field
//! falls back to the defaults below.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::card::CardCategory;
use crate::consts::{DEFAULT_MAX_SETTLE_ROUNDS, DEFAULT_NAMESPACE};
use crate::engine::Transform;
use crate::error::{PersistError, PersistResult};

/// Grid that gives each bootstrapped card its own starting slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapLayout {
    /// Slot 0 position
    pub origin: Vec3,
    /// Offset between columns (x) and rows (z)
    pub spacing: Vec3,
    /// Slots per row
    pub columns: u32,
    /// Rotation of every starting slot
    pub rotation: Vec3,
}

impl Default for BootstrapLayout {
    fn default() -> Self {
        Self {
            origin: Vec3::new(-6.0, 1.0, -4.0),
            spacing: Vec3::new(2.5, 0.0, -3.5),
            columns: 4,
            rotation: Vec3::new(0.0, 180.0, 0.0),
        }
    }
}

impl BootstrapLayout {
    /// Starting transform for the `index`-th library card
    pub fn slot(&self, index: usize) -> Transform {
        let columns = self.columns.max(1) as usize;
        let col = (index % columns) as f32;
        let row = (index / columns) as f32;
        let offset = Vec3::new(col * self.spacing.x, row * self.spacing.y, row * self.spacing.z);
        Transform::new(self.origin + offset, self.rotation)
    }
}

/// Placement of one drop zone created at bootstrap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneLayout {
    pub position: Vec3,
    pub rotation: Vec3,
    pub size: Vec3,
    pub category: CardCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Key in a shared save slot
    pub namespace: String,
    /// Engine polls a settle may spend before giving up on spawns
    pub max_settle_rounds: u32,
    pub layout: BootstrapLayout,
    /// Zones created at bootstrap, in creation order
    pub zones: Vec<ZoneLayout>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let rotation = Vec3::new(0.0, 180.0, 0.0);
        let size = Vec3::new(2.5, 5.0, 3.0);
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            max_settle_rounds: DEFAULT_MAX_SETTLE_ROUNDS,
            layout: BootstrapLayout::default(),
            zones: vec![
                ZoneLayout {
                    position: Vec3::new(-3.0, 0.0, 3.0),
                    rotation,
                    size,
                    category: CardCategory::Instant,
                },
                ZoneLayout {
                    position: Vec3::new(3.0, 0.0, 3.0),
                    rotation,
                    size,
                    category: CardCategory::Creature,
                },
            ],
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> PersistResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| PersistError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file
    pub fn load(path: impl AsRef<Path>) -> PersistResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&json)?;
        log::info!("Loaded session config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn validate(&self) -> PersistResult<()> {
        if self.namespace.is_empty() {
            return Err(PersistError::Config("namespace must not be empty".to_string()));
        }
        if self.max_settle_rounds == 0 {
            return Err(PersistError::Config("max_settle_rounds must be positive".to_string()));
        }
        for (i, zone) in self.zones.iter().enumerate() {
            if zone.size.min_element() <= 0.0 {
                return Err(PersistError::Config(format!("zone {i} has a non-positive size")));
            }
            if self.zones[..i].iter().any(|z| z.position == zone.position) {
                return Err(PersistError::Config(format!("zone {i} shares its anchor")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_two_zones() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.zones.len(), 2);
        assert_eq!(config.zones[0].category, CardCategory::Instant);
        assert_eq!(config.zones[1].category, CardCategory::Creature);
    }

    #[test]
    fn test_slots_are_unique() {
        let layout = BootstrapLayout::default();
        let slots: Vec<Vec3> = (0..12).map(|i| layout.slot(i).position).collect();
        for (i, a) in slots.iter().enumerate() {
            assert!(slots[i + 1..].iter().all(|b| a.distance(*b) >= 2.0));
        }
        assert_eq!(layout.slot(5).position, Vec3::new(-3.5, 1.0, -7.5));
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config = SessionConfig::from_json(r#"{"namespace": "table.one"}"#).unwrap();
        assert_eq!(config.namespace, "table.one");
        assert_eq!(config.max_settle_rounds, DEFAULT_MAX_SETTLE_ROUNDS);
        assert_eq!(config.zones.len(), 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(
            SessionConfig::from_json(r#"{"max_settle_rounds": 0}"#),
            Err(PersistError::Config(_))
        ));
        assert!(matches!(
            SessionConfig::from_json(r#"{"namespace": ""}"#),
            Err(PersistError::Config(_))
        ));
        assert!(matches!(
            SessionConfig::from_json(r#"{"zones": 5}"#),
            Err(PersistError::Config(_))
        ));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let err = SessionConfig::load("/nonexistent/deckstate.json").unwrap_err();
        assert!(matches!(err, PersistError::Io(_)));
    }
}
