//! Card session orchestration
//!
//! The host calls `on_load` once (empty string = first run) and `on_save`
//! whenever it wants a snapshot. Every entity is created through the spawn
//! gate and appended to its registry only once the engine has acknowledged
//! it, in request order. `on_save` drains the gate before walking the
//! registries, so a card requested before a save is always in that save.

use crate::card::{CardDefinition, CardLibrary};
use crate::codec::{self, GameSavedState};
use crate::config::{SessionConfig, ZoneLayout};
use crate::engine::{Engine, EngineEvent, ObjectHandle, SpawnRequest, SpawnTemplate, SpawnTicket, Transform};
use crate::entity::{
    CardDropZone, CardInstance, ContainerEvent, InstanceFragment, InstanceId, Placement, ZoneFragment,
    ZoneId,
};
use crate::error::{PersistError, PersistResult};
use crate::registry::Registry;
use crate::spawn::{Settled, SpawnGate};

/// Outcome of the load entry point
#[derive(Debug, Default)]
pub struct LoadReport {
    /// True when the session started from an empty save
    pub bootstrapped: bool,
    pub instances: usize,
    pub zones: usize,
    /// Entities that could not be created (they are omitted)
    pub failures: Vec<PersistError>,
}

#[derive(Debug)]
enum ZoneOrigin {
    Fresh(ZoneLayout),
    Restored(ZoneFragment),
}

#[derive(Debug)]
enum InstanceOrigin {
    Fresh {
        definition: CardDefinition,
        drop_into: Option<ZoneId>,
    },
    Restored {
        fragment: InstanceFragment,
        zone: Option<ZoneId>,
    },
}

/// What to build once a spawn is acknowledged
#[derive(Debug)]
enum SpawnIntent {
    Zone(ZoneOrigin),
    Instance(InstanceOrigin),
}

fn card_request(definition: &CardDefinition, transform: Transform) -> SpawnRequest {
    SpawnRequest {
        template: SpawnTemplate::Card {
            asset: definition.template.clone(),
        },
        transform,
    }
}

fn zone_request(position: glam::Vec3, rotation: glam::Vec3, size: glam::Vec3) -> SpawnRequest {
    SpawnRequest {
        template: SpawnTemplate::Zone { size },
        transform: Transform::new(position, rotation),
    }
}

/// Live card table: the engine plus both entity registries
pub struct Session<E: Engine> {
    config: SessionConfig,
    library: CardLibrary,
    engine: E,
    gate: SpawnGate<SpawnIntent>,
    instances: Registry<CardInstance>,
    zones: Registry<CardDropZone>,
    /// Events for objects acknowledged but not yet registered
    deferred: Vec<EngineEvent>,
    failures: Vec<PersistError>,
    next_id: u32,
    loaded: bool,
}

impl<E: Engine> Session<E> {
    pub fn new(config: SessionConfig, library: CardLibrary, engine: E) -> Self {
        Self {
            config,
            library,
            engine,
            gate: SpawnGate::new(),
            instances: Registry::new(),
            zones: Registry::new(),
            deferred: Vec::new(),
            failures: Vec::new(),
            next_id: 1,
            loaded: false,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn instances(&self) -> &Registry<CardInstance> {
        &self.instances
    }

    pub fn zones(&self) -> &Registry<CardDropZone> {
        &self.zones
    }

    pub fn instance(&self, id: InstanceId) -> Option<&CardInstance> {
        self.instances.iter().find(|i| i.id() == id)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Spawns requested but not yet acknowledged
    pub fn in_flight(&self) -> usize {
        self.gate.in_flight()
    }

    /// Entity failures collected since the last call
    pub fn take_failures(&mut self) -> Vec<PersistError> {
        std::mem::take(&mut self.failures)
    }

    /// Load entry point. An empty string bootstraps a new table; anything
    /// else must be a saved document. A document that fails to decode aborts
    /// before any entity is created.
    pub fn on_load(&mut self, saved: &str) -> PersistResult<LoadReport> {
        if self.loaded {
            return Err(PersistError::AlreadyLoaded);
        }
        self.config.validate()?;

        let bootstrapped = saved.is_empty();
        if bootstrapped {
            self.bootstrap();
        } else {
            self.restore(saved)?;
        }
        self.loaded = true;

        let report = LoadReport {
            bootstrapped,
            instances: self.instances.len(),
            zones: self.zones.len(),
            failures: self.take_failures(),
        };
        log::info!(
            "Session loaded ({}): {} cards, {} zones, {} failures",
            if bootstrapped { "bootstrap" } else { "restore" },
            report.instances,
            report.zones,
            report.failures.len()
        );
        Ok(report)
    }

    /// Save entry point: settle pending spawns, drop deleted cards, encode
    pub fn on_save(&mut self) -> PersistResult<String> {
        self.settle();
        self.prune_stale();
        let state = self.snapshot();
        log::debug!(
            "Saving {} cards and {} zones",
            state.card_instances.len(),
            state.card_drop_zones.len()
        );
        codec::encode(&state)
    }

    /// Fragments of every registered entity, in registry order. Cards whose
    /// object is gone are skipped; spawns still in flight are not included.
    pub fn snapshot(&self) -> GameSavedState {
        let card_instances = self
            .instances
            .iter()
            .filter_map(|instance| match instance.save(&self.engine, &self.zones) {
                Ok(fragment) => Some(fragment),
                Err(e) => {
                    log::warn!("Skipping card {} in snapshot: {e}", instance.id());
                    None
                }
            })
            .collect();
        let card_drop_zones = self.zones.iter().map(CardDropZone::save).collect();

        GameSavedState {
            card_instances,
            card_drop_zones,
        }
    }

    /// Start creating a card outside bootstrap/restore. The card joins the
    /// registry once the engine acknowledges it (at the latest on next save).
    pub fn request_card(
        &mut self,
        definition: CardDefinition,
        transform: Transform,
    ) -> PersistResult<SpawnTicket> {
        let request = card_request(&definition, transform);
        let intent = SpawnIntent::Instance(InstanceOrigin::Fresh {
            definition,
            drop_into: None,
        });
        self.gate.request(&mut self.engine, request, intent)
    }

    /// Drop a card into a zone, leaving whatever zone holds it now
    pub fn move_card(&mut self, id: InstanceId, zone: ZoneId) -> PersistResult<()> {
        let instance = self
            .instances
            .iter()
            .find(|i| i.id() == id)
            .ok_or(PersistError::UnknownInstance(id.0))?;
        let target = self
            .zones
            .get(zone.index())
            .ok_or(PersistError::UnknownZoneId(zone.0))?;
        let source = instance.zone().and_then(|z| self.zones.get(z.index()));
        target.drop(&mut self.engine, source, instance)
    }

    /// Process one round of engine notifications
    pub fn pump(&mut self) {
        let mut events = std::mem::take(&mut self.deferred);
        events.extend(self.gate.poll(&mut self.engine));

        for settled in self.gate.take_ready() {
            self.register(settled);
        }
        for event in events {
            self.dispatch(event);
        }
    }

    /// Pump until every requested spawn is acknowledged, or expire what is
    /// left after `max_settle_rounds` polls. Expired spawns are still
    /// registered if the engine acknowledges them on a later pump.
    pub fn settle(&mut self) {
        let mut rounds = 0;
        while self.gate.in_flight() > 0 {
            if rounds >= self.config.max_settle_rounds {
                log::error!(
                    "{} spawns unanswered after {rounds} polls, giving up on them",
                    self.gate.in_flight()
                );
                for ticket in self.gate.expire() {
                    let e = PersistError::SpawnTimedOut { ticket: ticket.0 };
                    log::warn!("{e}, registering it if the engine answers later");
                    self.failures.push(e);
                }
                break;
            }
            self.pump();
            rounds += 1;
        }

        for settled in self.gate.take_ready() {
            self.register(settled);
        }
        for event in std::mem::take(&mut self.deferred) {
            self.dispatch(event);
        }
    }

    fn next_instance_id(&mut self) -> InstanceId {
        let id = self.next_id;
        self.next_id += 1;
        InstanceId(id)
    }

    fn submit(&mut self, request: SpawnRequest, intent: SpawnIntent) {
        if let Err(e) = self.gate.request(&mut self.engine, request, intent) {
            log::warn!("Omitting entity: {e}");
            self.failures.push(e);
        }
    }

    fn bootstrap(&mut self) {
        log::info!(
            "No saved state, bootstrapping {} zones and {} cards",
            self.config.zones.len(),
            self.library.len()
        );

        // Zones first so every card has its drop target
        for layout in self.config.zones.clone() {
            let request = zone_request(layout.position, layout.rotation, layout.size);
            self.submit(request, SpawnIntent::Zone(ZoneOrigin::Fresh(layout)));
        }
        self.settle();

        let cards: Vec<CardDefinition> = self.library.iter().cloned().collect();
        for (index, definition) in cards.into_iter().enumerate() {
            let drop_into = self.zones.iter().find(|z| z.accepts(&definition)).map(|z| z.id());
            if drop_into.is_none() {
                log::warn!(
                    "No zone accepts {} cards, '{}' stays loose",
                    definition.category,
                    definition.id
                );
            }
            let request = card_request(&definition, self.config.layout.slot(index));
            self.submit(
                request,
                SpawnIntent::Instance(InstanceOrigin::Fresh {
                    definition,
                    drop_into,
                }),
            );
        }
        self.settle();
    }

    fn restore(&mut self, saved: &str) -> PersistResult<()> {
        let document = codec::decode(saved)?;
        log::info!(
            "Restoring {} zones and {} cards",
            document.card_drop_zones.len(),
            document.card_instances.len()
        );

        for fragment in document.card_drop_zones {
            let request = zone_request(fragment.position, fragment.rotation, fragment.size);
            self.submit(request, SpawnIntent::Zone(ZoneOrigin::Restored(fragment)));
        }
        self.settle();

        for fragment in document.card_instances {
            let (zone, transform) = match fragment.placement {
                Placement::Loose { position, rotation } => (None, Transform::new(position, rotation)),
                Placement::InZone { zone: anchor } => {
                    let resolved = self
                        .resolve_zone(anchor, &fragment.definition)
                        .map(|z| (z.id(), z.drop_transform()));
                    match resolved {
                        Ok((id, transform)) => (Some(id), transform),
                        Err(e) => {
                            log::warn!("Omitting card '{}': {e}", fragment.definition.id);
                            self.failures.push(e);
                            continue;
                        }
                    }
                }
            };
            let request = card_request(&fragment.definition, transform);
            self.submit(
                request,
                SpawnIntent::Instance(InstanceOrigin::Restored { fragment, zone }),
            );
        }
        self.settle();
        Ok(())
    }

    /// First live zone at a saved anchor that accepts the card
    fn resolve_zone(
        &self,
        anchor: glam::Vec3,
        definition: &CardDefinition,
    ) -> PersistResult<&CardDropZone> {
        let mut anchored = self.zones.iter().filter(|z| z.is_anchored_at(anchor)).peekable();
        let first = *anchored.peek().ok_or(PersistError::UnknownZone { anchor })?;
        anchored
            .find(|z| z.accepts(definition))
            .ok_or_else(|| PersistError::CategoryMismatch {
                card: definition.id.clone(),
                zone: first.id().0,
                card_category: definition.category,
                zone_category: first.category(),
            })
    }

    /// Append an acknowledged entity to its registry
    fn register(&mut self, settled: Settled<SpawnIntent>) {
        let object = match settled.outcome {
            Ok(object) => object,
            Err(e) => {
                log::warn!("Spawn ticket {} failed: {e}", settled.ticket.0);
                self.failures.push(e);
                return;
            }
        };

        match settled.intent {
            SpawnIntent::Zone(origin) => {
                let id = ZoneId(self.zones.len() as u32);
                let zone = match origin {
                    ZoneOrigin::Fresh(layout) => CardDropZone::new(
                        id,
                        object,
                        layout.position,
                        layout.rotation,
                        layout.size,
                        layout.category,
                    ),
                    ZoneOrigin::Restored(fragment) => CardDropZone::from_fragment(id, object, fragment),
                };
                log::debug!("Zone {id} ({}) bound to {object}", zone.category());
                self.zones.push(zone);
            }
            SpawnIntent::Instance(origin) => {
                let id = self.next_instance_id();
                let instance = match origin {
                    InstanceOrigin::Fresh {
                        definition,
                        drop_into,
                    } => {
                        let instance = CardInstance::new(id, definition, object);
                        if let Some(zone) = drop_into.and_then(|z| self.zones.get(z.index())) {
                            if let Err(e) = zone.drop(&mut self.engine, None, &instance) {
                                log::warn!("Initial drop of card {id} failed: {e}");
                                self.failures.push(e);
                            }
                        }
                        instance
                    }
                    InstanceOrigin::Restored { fragment, zone } => {
                        CardInstance::from_fragment(id, fragment, object, zone)
                    }
                };
                log::debug!("Card {id} ({}) bound to {object}", instance.definition().id);
                self.instances.push(instance);
            }
        }
    }

    fn dispatch(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Entered { object, container } => {
                self.track_container(event, object, container, true)
            }
            EngineEvent::Left { object, container } => {
                self.track_container(event, object, container, false)
            }
            EngineEvent::Destroyed { object } => {
                if let Some(instance) = self.instances.find_by_object_mut(object) {
                    log::info!("Card {} was deleted", instance.id());
                    instance.on_destroyed();
                } else if self.gate.holds(object) {
                    self.deferred.push(event);
                }
            }
            EngineEvent::Spawned { .. } | EngineEvent::SpawnFailed { .. } => {
                log::trace!("spawn event outside the gate: {event:?}");
            }
        }
    }

    fn track_container(
        &mut self,
        event: EngineEvent,
        object: ObjectHandle,
        container: ObjectHandle,
        entered: bool,
    ) {
        let Some(zone) = self.zones.find_by_object(container) else {
            if self.gate.holds(container) {
                self.deferred.push(event);
            }
            return;
        };
        let Some(instance) = self.instances.find_by_object_mut(object) else {
            if self.gate.holds(object) {
                self.deferred.push(event);
            }
            return;
        };

        if !entered {
            instance.on_container_event(ContainerEvent::Left(zone.id()));
        } else if zone.accepts(instance.definition()) {
            instance.on_container_event(ContainerEvent::Entered(zone.id()));
        } else {
            log::debug!(
                "Zone {} ignores {} card {}",
                zone.id(),
                instance.definition().category,
                instance.id()
            );
        }
    }

    /// Remove cards whose engine object is gone
    fn prune_stale(&mut self) {
        let engine = &self.engine;
        self.instances.retain(|instance| {
            let live = instance.object_in(engine).is_some();
            if !live {
                let e = PersistError::StaleInstance { id: instance.id().0 };
                log::info!("Pruning card '{}': {e}", instance.definition().id);
            }
            live
        });
    }
}
