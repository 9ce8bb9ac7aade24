//! Deterministic in-memory engine
//!
//! Behaves like a fire-and-forget host: spawns are acknowledged on later
//! polls in seeded-random order, moves land on the next poll, and zones
//! report containment for axis-aligned regions (rotation is ignored).

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec3;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::{Engine, EngineEvent, ObjectHandle, SpawnRequest, SpawnTemplate, SpawnTicket, Transform};
use crate::error::{PersistError, PersistResult};

/// Tuning for the simulated engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Seed for acknowledgement order
    pub seed: u64,
    /// Spawns acknowledged per poll (0 = all in-flight)
    pub acks_per_poll: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed,
            acks_per_poll: 0,
        }
    }
}

#[derive(Debug, Clone)]
enum SimKind {
    Card { asset: String },
    Zone { size: Vec3 },
}

#[derive(Debug, Clone)]
struct SimObject {
    kind: SimKind,
    transform: Transform,
    container: Option<ObjectHandle>,
}

pub struct SimEngine {
    rng: Pcg32,
    acks_per_poll: usize,
    next_ticket: u64,
    next_handle: u64,
    objects: BTreeMap<ObjectHandle, SimObject>,
    in_flight: Vec<(SpawnTicket, SpawnRequest)>,
    moves: Vec<(ObjectHandle, Transform)>,
    events: Vec<EngineEvent>,
    rejected_assets: BTreeSet<String>,
    failing_assets: BTreeSet<String>,
}

impl SimEngine {
    pub fn new(config: SimConfig) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(config.seed),
            acks_per_poll: config.acks_per_poll,
            next_ticket: 1,
            next_handle: 1,
            objects: BTreeMap::new(),
            in_flight: Vec::new(),
            moves: Vec::new(),
            events: Vec::new(),
            rejected_assets: BTreeSet::new(),
            failing_assets: BTreeSet::new(),
        }
    }

    /// Refuse spawn requests for this asset synchronously
    pub fn reject_asset(&mut self, asset: &str) {
        self.rejected_assets.insert(asset.to_string());
    }

    /// Accept spawn requests for this asset but fail them on acknowledgement
    pub fn fail_asset(&mut self, asset: &str) {
        self.failing_assets.insert(asset.to_string());
    }

    /// Remove an object out-of-band (as a player deleting it would)
    pub fn destroy(&mut self, object: ObjectHandle) -> bool {
        if self.objects.remove(&object).is_none() {
            return false;
        }
        self.moves.retain(|(h, _)| *h != object);
        self.events.push(EngineEvent::Destroyed { object });
        true
    }

    /// Container currently holding the object
    pub fn container_of(&self, object: ObjectHandle) -> Option<ObjectHandle> {
        self.objects.get(&object).and_then(|o| o.container)
    }

    /// Asset a card object was spawned from
    pub fn asset_of(&self, object: ObjectHandle) -> Option<&str> {
        match &self.objects.get(&object)?.kind {
            SimKind::Card { asset } => Some(asset),
            SimKind::Zone { .. } => None,
        }
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn allocate_handle(&mut self) -> ObjectHandle {
        let handle = ObjectHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }

    fn zone_contains(center: Vec3, size: Vec3, point: Vec3) -> bool {
        let half = size / 2.0;
        let delta = (point - center).abs();
        delta.x <= half.x && delta.y <= half.y && delta.z <= half.z
    }

    /// Recompute which zones hold a card and queue containment events.
    /// Overlapping zones each get an `Entered`; the last one delivered
    /// becomes the container.
    fn update_containment(&mut self, object: ObjectHandle) {
        let Some(obj) = self.objects.get(&object) else {
            return;
        };
        if !matches!(obj.kind, SimKind::Card { .. }) {
            return;
        }
        let position = obj.transform.position;
        let previous = obj.container;

        let containing: Vec<ObjectHandle> = self
            .objects
            .iter()
            .filter_map(|(handle, o)| match o.kind {
                SimKind::Zone { size } if Self::zone_contains(o.transform.position, size, position) => {
                    Some(*handle)
                }
                _ => None,
            })
            .collect();

        if let Some(old) = previous {
            if !containing.contains(&old) {
                self.events.push(EngineEvent::Left { object, container: old });
            }
        }
        let entered: Vec<ObjectHandle> =
            containing.iter().copied().filter(|zone| Some(*zone) != previous).collect();
        for zone in &entered {
            self.events.push(EngineEvent::Entered { object, container: *zone });
        }

        let current = entered.last().copied().or(previous.filter(|p| containing.contains(p)));
        if let Some(obj) = self.objects.get_mut(&object) {
            obj.container = current;
        }
    }

    fn acknowledge(&mut self) {
        if self.in_flight.is_empty() {
            return;
        }
        self.in_flight.shuffle(&mut self.rng);
        let take = if self.acks_per_poll == 0 {
            self.in_flight.len()
        } else {
            self.acks_per_poll.min(self.in_flight.len())
        };
        let acked: Vec<_> = self.in_flight.drain(..take).collect();

        for (ticket, request) in acked {
            let kind = match request.template {
                SpawnTemplate::Card { asset } => {
                    if self.failing_assets.contains(&asset) {
                        self.events.push(EngineEvent::SpawnFailed {
                            ticket,
                            reason: format!("asset '{asset}' failed to load"),
                        });
                        continue;
                    }
                    SimKind::Card { asset }
                }
                SpawnTemplate::Zone { size } => SimKind::Zone { size },
            };
            let object = self.allocate_handle();
            self.objects.insert(
                object,
                SimObject {
                    kind,
                    transform: request.transform,
                    container: None,
                },
            );
            self.events.push(EngineEvent::Spawned { ticket, object });
            self.update_containment(object);
        }
    }

    fn apply_moves(&mut self) {
        for (object, target) in std::mem::take(&mut self.moves) {
            if let Some(obj) = self.objects.get_mut(&object) {
                obj.transform = target;
                self.update_containment(object);
            }
        }
    }
}

impl Default for SimEngine {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl Engine for SimEngine {
    fn request_spawn(&mut self, request: &SpawnRequest) -> PersistResult<SpawnTicket> {
        if let SpawnTemplate::Card { asset } = &request.template {
            if asset.is_empty() || self.rejected_assets.contains(asset) {
                return Err(PersistError::SpawnRejected {
                    template: asset.clone(),
                    reason: "unknown asset".to_string(),
                });
            }
        }
        let ticket = SpawnTicket(self.next_ticket);
        self.next_ticket += 1;
        self.in_flight.push((ticket, request.clone()));
        log::trace!("spawn {} requested as ticket {}", request.template.label(), ticket.0);
        Ok(ticket)
    }

    fn poll_events(&mut self) -> Vec<EngineEvent> {
        // Moves issued before this poll land before new objects appear
        self.apply_moves();
        self.acknowledge();
        std::mem::take(&mut self.events)
    }

    fn object_exists(&self, object: ObjectHandle) -> bool {
        self.objects.contains_key(&object)
    }

    fn transform_of(&self, object: ObjectHandle) -> Option<Transform> {
        self.objects.get(&object).map(|o| o.transform)
    }

    fn move_object(&mut self, object: ObjectHandle, target: Transform) {
        self.moves.push((object, target));
    }
}
