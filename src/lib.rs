//! Deckstate - session persistence for card tables
//!
//! Core modules:
//! - `engine`: Host engine boundary (plus a deterministic in-memory engine)
//! - `spawn`: Safe spawn gate (pending creations are never lost by a save)
//! - `entity`: Card instances and drop zones
//! - `registry`: Ordered entity tables
//! - `session`: Bootstrap, restore and snapshot orchestration
//! - `codec`: Saved document wire format
//! - `subscriber`: Host-level save slot shared by several subsystems

pub mod card;
pub mod codec;
pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod registry;
pub mod session;
pub mod spawn;
pub mod subscriber;

pub use card::{CardCategory, CardDefinition, CardLibrary};
pub use codec::GameSavedState;
pub use config::SessionConfig;
pub use engine::{Engine, EngineEvent, ObjectHandle, SpawnTicket, Transform};
pub use entity::{CardDropZone, CardInstance, InstanceFragment, Placement, ZoneFragment};
pub use error::{PersistError, PersistResult};
pub use session::{LoadReport, Session};
pub use subscriber::{SaveSlot, SaveSubscriber};

/// Crate-wide constants
pub mod consts {
    /// Namespace the card session registers under in a shared save slot
    pub const DEFAULT_NAMESPACE: &str = "deckstate.cards";

    /// Engine poll rounds a settle may spend before expiring in-flight spawns
    pub const DEFAULT_MAX_SETTLE_ROUNDS: u32 = 64;

    /// Height above a zone's anchor where dropped cards are released, capped
    /// at a quarter of the zone's height so the drop point stays inside it
    pub const DROP_LIFT: f32 = 1.0;

    /// Tolerance when matching a saved zone anchor against live zones
    pub const ANCHOR_EPSILON: f32 = 1e-4;
}
