//! Safe spawn gate
//!
//! Engine spawns are fire-and-forget: the object appears on some later poll,
//! in whatever order the engine finishes them. The gate turns that into an
//! explicit acknowledge protocol:
//! - `request` records the ticket in a pending set before returning
//! - `poll` marks pending entries as spawned or failed
//! - `take_ready` releases settled entries strictly in request order
//! - `expire` stops waiting on whatever is still in flight
//!
//! Expired requests are kept as late entries: if the engine answers after
//! all, the object is released on the next `take_ready` instead of being
//! left live but unregistered. A save that drains the gate first can never
//! miss a requested entity.

use std::collections::BTreeMap;

use crate::engine::{Engine, EngineEvent, ObjectHandle, SpawnRequest, SpawnTicket};
use crate::error::{PersistError, PersistResult};

#[derive(Debug, Clone, PartialEq)]
enum SpawnStatus {
    InFlight,
    Spawned(ObjectHandle),
    Failed { template: String, reason: String },
}

#[derive(Debug)]
struct PendingSpawn<I> {
    intent: I,
    template: String,
    status: SpawnStatus,
}

/// A request the gate has finished with
#[derive(Debug)]
pub struct Settled<I> {
    pub ticket: SpawnTicket,
    /// Caller data attached at request time
    pub intent: I,
    pub outcome: PersistResult<ObjectHandle>,
}

impl<I> Settled<I> {
    fn from_pending(ticket: SpawnTicket, pending: PendingSpawn<I>) -> Self {
        let outcome = match pending.status {
            SpawnStatus::Spawned(object) => Ok(object),
            SpawnStatus::Failed { template, reason } => {
                Err(PersistError::SpawnRejected { template, reason })
            }
            SpawnStatus::InFlight => Err(PersistError::SpawnTimedOut { ticket: ticket.0 }),
        };
        Self {
            ticket,
            intent: pending.intent,
            outcome,
        }
    }
}

/// Pending-creation set keyed by ticket, carrying caller intent `I`
#[derive(Debug)]
pub struct SpawnGate<I> {
    pending: BTreeMap<SpawnTicket, PendingSpawn<I>>,
    /// Expired requests the engine may still acknowledge
    late: BTreeMap<SpawnTicket, PendingSpawn<I>>,
}

impl<I> Default for SpawnGate<I> {
    fn default() -> Self {
        Self {
            pending: BTreeMap::new(),
            late: BTreeMap::new(),
        }
    }
}

impl<I> SpawnGate<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit a spawn. On success the ticket is pending before this returns.
    pub fn request<E: Engine>(
        &mut self,
        engine: &mut E,
        request: SpawnRequest,
        intent: I,
    ) -> PersistResult<SpawnTicket> {
        let ticket = engine.request_spawn(&request)?;
        self.pending.insert(
            ticket,
            PendingSpawn {
                intent,
                template: request.template.label(),
                status: SpawnStatus::InFlight,
            },
        );
        Ok(ticket)
    }

    /// Poll the engine once. Spawn acknowledgements are consumed; every other
    /// event is handed back in delivery order.
    pub fn poll<E: Engine>(&mut self, engine: &mut E) -> Vec<EngineEvent> {
        let mut passthrough = Vec::new();
        for event in engine.poll_events() {
            match event {
                EngineEvent::Spawned { ticket, object } => {
                    if let Some(entry) = self.pending.get_mut(&ticket) {
                        entry.status = SpawnStatus::Spawned(object);
                    } else if let Some(entry) = self.late.get_mut(&ticket) {
                        log::info!("Late ack for expired spawn ticket {} ({object})", ticket.0);
                        entry.status = SpawnStatus::Spawned(object);
                    } else {
                        log::debug!("ack for unknown spawn ticket {}", ticket.0);
                    }
                }
                EngineEvent::SpawnFailed { ticket, reason } => {
                    if let Some(entry) = self.pending.get_mut(&ticket) {
                        entry.status = SpawnStatus::Failed {
                            template: entry.template.clone(),
                            reason,
                        };
                    } else if let Some(entry) = self.late.remove(&ticket) {
                        log::warn!(
                            "Expired spawn ticket {} ({}) failed: {reason}",
                            ticket.0,
                            entry.template
                        );
                    } else {
                        log::debug!("failure for unknown spawn ticket {}", ticket.0);
                    }
                }
                other => passthrough.push(other),
            }
        }
        passthrough
    }

    /// Release late arrivals, then the longest run of settled entries at the
    /// front of the queue. An in-flight entry holds back everything requested
    /// after it.
    pub fn take_ready(&mut self) -> Vec<Settled<I>> {
        let (arrived, waiting): (BTreeMap<_, _>, BTreeMap<_, _>) = std::mem::take(&mut self.late)
            .into_iter()
            .partition(|(_, p)| p.status != SpawnStatus::InFlight);
        self.late = waiting;

        let mut ready: Vec<Settled<I>> = arrived
            .into_iter()
            .map(|(ticket, pending)| Settled::from_pending(ticket, pending))
            .collect();
        while let Some(entry) = self.pending.first_entry() {
            if entry.get().status == SpawnStatus::InFlight {
                break;
            }
            let (ticket, pending) = entry.remove_entry();
            ready.push(Settled::from_pending(ticket, pending));
        }
        ready
    }

    /// Stop waiting on unanswered requests and return their tickets. They
    /// move to the late set; everything left in the queue is settled and
    /// comes out of the next `take_ready` in one run.
    pub fn expire(&mut self) -> Vec<SpawnTicket> {
        let (waiting, settled): (BTreeMap<_, _>, BTreeMap<_, _>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|(_, p)| p.status == SpawnStatus::InFlight);
        self.pending = settled;
        let expired: Vec<SpawnTicket> = waiting.keys().copied().collect();
        self.late.extend(waiting);
        expired
    }

    /// Whether an acknowledged object is still waiting for release
    pub fn holds(&self, object: ObjectHandle) -> bool {
        self.pending
            .values()
            .chain(self.late.values())
            .any(|p| p.status == SpawnStatus::Spawned(object))
    }

    /// Requests the engine has not answered yet
    pub fn in_flight(&self) -> usize {
        self.pending
            .values()
            .filter(|p| p.status == SpawnStatus::InFlight)
            .count()
    }

    /// Expired requests still without an answer
    pub fn late(&self) -> usize {
        self.late
            .values()
            .filter(|p| p.status == SpawnStatus::InFlight)
            .count()
    }

    /// Nothing is queued for release (late answers may still arrive)
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::engine::{SimConfig, SimEngine, SpawnTemplate, Transform};

    fn card(asset: &str) -> SpawnRequest {
        SpawnRequest {
            template: SpawnTemplate::Card { asset: asset.to_string() },
            transform: Transform::new(Vec3::new(0.0, 10.0, 0.0), Vec3::ZERO),
        }
    }

    #[test]
    fn test_request_is_pending_immediately() {
        let mut engine = SimEngine::default();
        let mut gate = SpawnGate::new();
        gate.request(&mut engine, card("cards/a"), "a").unwrap();
        assert_eq!(gate.in_flight(), 1);
        assert!(!gate.is_idle());
        assert!(gate.take_ready().is_empty());
    }

    #[test]
    fn test_release_follows_request_order() {
        let mut engine = SimEngine::new(SimConfig { seed: 3, acks_per_poll: 1 });
        let mut gate = SpawnGate::new();
        for i in 0..6 {
            gate.request(&mut engine, card("cards/a"), i).unwrap();
        }

        let mut released = Vec::new();
        while !gate.is_idle() {
            gate.poll(&mut engine);
            released.extend(gate.take_ready().into_iter().map(|s| s.intent));
        }
        assert_eq!(released, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_async_failure_settles_as_rejection() {
        let mut engine = SimEngine::default();
        engine.fail_asset("cards/broken");
        let mut gate = SpawnGate::new();
        gate.request(&mut engine, card("cards/broken"), ()).unwrap();
        gate.request(&mut engine, card("cards/ok"), ()).unwrap();
        gate.poll(&mut engine);

        let ready = gate.take_ready();
        assert_eq!(ready.len(), 2);
        assert!(matches!(ready[0].outcome, Err(PersistError::SpawnRejected { .. })));
        assert!(ready[1].outcome.is_ok());
    }

    #[test]
    fn test_sync_rejection_leaves_gate_untouched() {
        let mut engine = SimEngine::default();
        engine.reject_asset("cards/bad");
        let mut gate: SpawnGate<()> = SpawnGate::new();
        assert!(gate.request(&mut engine, card("cards/bad"), ()).is_err());
        assert!(gate.is_idle());
    }

    #[test]
    fn test_expire_times_out_unanswered() {
        let mut engine = SimEngine::default();
        let mut gate = SpawnGate::new();
        let ticket = gate.request(&mut engine, card("cards/a"), ()).unwrap();

        assert_eq!(gate.expire(), vec![ticket]);
        assert!(gate.is_idle());
        assert_eq!(gate.in_flight(), 0);
        assert_eq!(gate.late(), 1);
        assert!(gate.take_ready().is_empty());
    }

    #[test]
    fn test_expire_releases_settled_entries() {
        let mut engine = SimEngine::new(SimConfig { seed: 9, acks_per_poll: 1 });
        let mut gate = SpawnGate::new();
        for i in 0..3 {
            gate.request(&mut engine, card("cards/a"), i).unwrap();
        }
        gate.poll(&mut engine);

        let expired = gate.expire();
        assert_eq!(expired.len(), 2);
        let ready = gate.take_ready();
        assert_eq!(ready.len(), 1);
        assert!(ready[0].outcome.is_ok());
        assert!(!expired.contains(&ready[0].ticket));
    }

    #[test]
    fn test_late_ack_is_released_after_expiry() {
        let mut engine = SimEngine::default();
        let mut gate = SpawnGate::new();
        gate.request(&mut engine, card("cards/a"), "a").unwrap();
        gate.expire();

        gate.poll(&mut engine);
        assert!(gate.holds(ObjectHandle(1)));
        let ready = gate.take_ready();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].intent, "a");
        assert_eq!(ready[0].outcome.as_ref().ok(), Some(&ObjectHandle(1)));
        assert_eq!(gate.late(), 0);
    }

    #[test]
    fn test_late_failure_is_dropped() {
        let mut engine = SimEngine::default();
        engine.fail_asset("cards/broken");
        let mut gate = SpawnGate::new();
        gate.request(&mut engine, card("cards/broken"), ()).unwrap();
        gate.expire();

        gate.poll(&mut engine);
        assert_eq!(gate.late(), 0);
        assert!(gate.take_ready().is_empty());
    }

    #[test]
    fn test_holds_acknowledged_objects_behind_in_flight() {
        let mut engine = SimEngine::new(SimConfig { seed: 11, acks_per_poll: 1 });
        let mut gate = SpawnGate::new();
        gate.request(&mut engine, card("cards/a"), ()).unwrap();
        gate.request(&mut engine, card("cards/b"), ()).unwrap();

        // One ack per poll: either the first ticket is released, or the
        // second one is held behind it.
        gate.poll(&mut engine);
        let ready = gate.take_ready();
        if ready.is_empty() {
            assert_eq!(gate.in_flight(), 1);
            let held = (1..=2).map(ObjectHandle).any(|h| gate.holds(h));
            assert!(held);
        } else {
            assert_eq!(ready[0].ticket, SpawnTicket(1));
        }
    }
}
