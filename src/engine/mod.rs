//! Host engine boundary
//!
//! The host owns rendering, physics and object spawning. This module only
//! names what the persistence core needs from it:
//! - Fire-and-forget spawn requests, acknowledged later through events
//! - Existence and transform queries for live objects
//! - Fire-and-forget motion requests
//! - Containment notifications when objects enter or leave zones

pub mod sim;

pub use sim::{SimConfig, SimEngine};

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::PersistResult;

/// Live reference to an engine object
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectHandle(pub u64);

impl fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Receipt for an outstanding spawn request.
///
/// Engines hand out tickets in strictly increasing order, so ticket order is
/// request order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpawnTicket(pub u64);

/// Position plus Euler rotation (degrees)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
}

impl Transform {
    pub fn new(position: Vec3, rotation: Vec3) -> Self {
        Self { position, rotation }
    }
}

/// What the engine should build
#[derive(Debug, Clone, PartialEq)]
pub enum SpawnTemplate {
    /// A card object from an asset reference
    Card { asset: String },
    /// A trigger region of the given extents
    Zone { size: Vec3 },
}

impl SpawnTemplate {
    /// Short label for logs and errors
    pub fn label(&self) -> String {
        match self {
            SpawnTemplate::Card { asset } => asset.clone(),
            SpawnTemplate::Zone { size } => format!("zone {size:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub template: SpawnTemplate,
    pub transform: Transform,
}

/// Notifications delivered by [`Engine::poll_events`]
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A spawn request finished and the object is live
    Spawned { ticket: SpawnTicket, object: ObjectHandle },
    /// A spawn request failed after it was accepted
    SpawnFailed { ticket: SpawnTicket, reason: String },
    /// An object came to rest inside a container
    Entered { object: ObjectHandle, container: ObjectHandle },
    /// An object left a container
    Left { object: ObjectHandle, container: ObjectHandle },
    /// An object was permanently removed from the session
    Destroyed { object: ObjectHandle },
}

/// The subset of a host simulation engine the persistence core drives
pub trait Engine {
    /// Ask the engine to create an object. Returns immediately; the object
    /// becomes live once a matching `Spawned` event is polled.
    ///
    /// Fails with `PersistError::SpawnRejected` when the template is invalid.
    fn request_spawn(&mut self, request: &SpawnRequest) -> PersistResult<SpawnTicket>;

    /// Drain pending notifications in delivery order
    fn poll_events(&mut self) -> Vec<EngineEvent>;

    /// Whether the object is still part of the session
    fn object_exists(&self, object: ObjectHandle) -> bool;

    /// Current transform of a live object
    fn transform_of(&self, object: ObjectHandle) -> Option<Transform>;

    /// Start moving an object toward `target`. Completion is observed through
    /// containment events, never through this call.
    fn move_object(&mut self, object: ObjectHandle, target: Transform);
}
