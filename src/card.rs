//! Card definitions and the static card library
//!
//! Definitions are immutable. Many instances may share one definition.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PersistError, PersistResult};

/// Card type, used by drop zones as an acceptance filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CardCategory {
    Creature,
    Instant,
    Sorcery,
    Artifact,
    Enchantment,
    Land,
}

impl CardCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardCategory::Creature => "CREATURE",
            CardCategory::Instant => "INSTANT",
            CardCategory::Sorcery => "SORCERY",
            CardCategory::Artifact => "ARTIFACT",
            CardCategory::Enchantment => "ENCHANTMENT",
            CardCategory::Land => "LAND",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "CREATURE" => Some(CardCategory::Creature),
            "INSTANT" => Some(CardCategory::Instant),
            "SORCERY" => Some(CardCategory::Sorcery),
            "ARTIFACT" => Some(CardCategory::Artifact),
            "ENCHANTMENT" => Some(CardCategory::Enchantment),
            "LAND" => Some(CardCategory::Land),
            _ => None,
        }
    }
}

impl fmt::Display for CardCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intrinsic identity of a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDefinition {
    /// Stable id, unique within a library
    pub id: String,
    /// Display name
    pub name: String,
    pub category: CardCategory,
    /// Engine template (asset reference) the card is spawned from
    pub template: String,
}

impl CardDefinition {
    pub fn new(id: &str, name: &str, category: CardCategory, template: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category,
            template: template.to_string(),
        }
    }
}

/// Ordered, read-only card library consulted at bootstrap
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardLibrary {
    pub cards: Vec<CardDefinition>,
}

impl CardLibrary {
    pub fn new(cards: Vec<CardDefinition>) -> Self {
        Self { cards }
    }

    /// The starter set shipped with the table
    pub fn builtin() -> Self {
        use CardCategory::*;
        Self::new(vec![
            CardDefinition::new("spark-bolt", "Spark Bolt", Instant, "cards/spark-bolt"),
            CardDefinition::new("forest-bear", "Forest Bear", Creature, "cards/forest-bear"),
            CardDefinition::new("quick-ward", "Quick Ward", Instant, "cards/quick-ward"),
            CardDefinition::new("grove-elf", "Grove Elf", Creature, "cards/grove-elf"),
            CardDefinition::new("sudden-growth", "Sudden Growth", Instant, "cards/sudden-growth"),
            CardDefinition::new("dawn-angel", "Dawn Angel", Creature, "cards/dawn-angel"),
            CardDefinition::new("mind-twist", "Mind Twist", Instant, "cards/mind-twist"),
            CardDefinition::new("river-drake", "River Drake", Creature, "cards/river-drake"),
        ])
    }

    /// Parse a library from a JSON array of definitions
    pub fn from_json(json: &str) -> PersistResult<Self> {
        let cards: Vec<CardDefinition> =
            serde_json::from_str(json).map_err(|e| PersistError::Config(e.to_string()))?;
        Ok(Self::new(cards))
    }

    /// Load a library file
    pub fn load(path: impl AsRef<Path>) -> PersistResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let library = Self::from_json(&json)?;
        log::info!("Loaded {} card definitions from {}", library.len(), path.as_ref().display());
        Ok(library)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CardDefinition> {
        self.cards.iter()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
