//! Persistence error types
//!
//! Entity-level errors (spawn failures, stale instances, bad zone references)
//! are collected and logged by the session; document-level errors abort.

use glam::Vec3;
use thiserror::Error;

use crate::card::CardCategory;

/// Errors raised while loading, tracking or saving a card session
#[derive(Error, Debug)]
pub enum PersistError {
    /// The engine refused to create an object from the given template.
    #[error("spawn rejected for template '{template}': {reason}")]
    SpawnRejected {
        /// Template (asset) that was requested.
        template: String,
        /// Engine-supplied reason.
        reason: String,
    },

    /// The engine never acknowledged a spawn within the settle bound.
    #[error("spawn ticket {ticket} was not acknowledged in time")]
    SpawnTimedOut {
        /// Raw ticket value.
        ticket: u64,
    },

    /// The saved string is not a valid document.
    #[error("saved document could not be decoded: {0}")]
    Decode(#[source] serde_json::Error),

    /// The live state could not be encoded.
    #[error("saved document could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),

    /// The instance's engine object no longer exists.
    #[error("card instance {id} has no live engine object")]
    StaleInstance {
        /// Instance id.
        id: u32,
    },

    /// A card was paired with a zone that filters a different category.
    #[error("card '{card}' ({card_category}) does not fit zone {zone} ({zone_category})")]
    CategoryMismatch {
        /// Card definition id.
        card: String,
        /// Zone id.
        zone: u32,
        /// Category of the card.
        card_category: CardCategory,
        /// Category the zone accepts.
        zone_category: CardCategory,
    },

    /// A saved instance references a zone anchor that no live zone occupies.
    #[error("no drop zone anchored at {anchor:?}")]
    UnknownZone {
        /// Saved anchor position.
        anchor: Vec3,
    },

    /// No live instance with this id.
    #[error("unknown card instance {0}")]
    UnknownInstance(u32),

    /// No live zone with this id.
    #[error("unknown drop zone {0}")]
    UnknownZoneId(u32),

    /// The load entry point runs once per session.
    #[error("session already loaded")]
    AlreadyLoaded,

    /// Two subscribers tried to share one namespace.
    #[error("namespace '{0}' is already registered")]
    DuplicateNamespace(String),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Filesystem failure while reading configuration.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for persistence operations.
pub type PersistResult<T> = Result<T, PersistError>;
