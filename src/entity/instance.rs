//! Card instances
//!
//! An instance outlives handle churn: it keeps its definition and current
//! zone even while the engine moves its object around, and only loses its
//! handle when the object is deleted.

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::{CardDropZone, Tracked, ZoneId};
use crate::card::CardDefinition;
use crate::engine::{Engine, ObjectHandle};
use crate::error::{PersistError, PersistResult};
use crate::registry::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub u32);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a saved card sits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Placement {
    /// Free on the table
    Loose { position: Vec3, rotation: Vec3 },
    /// Held by the zone anchored at `zone`
    InZone { zone: Vec3 },
}

/// Saved form of a card instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceFragment {
    pub definition: CardDefinition,
    pub placement: Placement,
}

/// Containment notification for an instance's object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerEvent {
    Entered(ZoneId),
    Left(ZoneId),
}

#[derive(Debug, Clone)]
pub struct CardInstance {
    id: InstanceId,
    definition: CardDefinition,
    object: Option<ObjectHandle>,
    zone: Option<ZoneId>,
}

impl CardInstance {
    /// Bind a new instance to a freshly spawned object; starts outside any zone
    pub fn new(id: InstanceId, definition: CardDefinition, object: ObjectHandle) -> Self {
        Self {
            id,
            definition,
            object: Some(object),
            zone: None,
        }
    }

    /// Rebuild an instance from its fragment once its object has been
    /// respawned. `zone` is the live zone the fragment's anchor resolved to.
    pub fn from_fragment(
        id: InstanceId,
        fragment: InstanceFragment,
        object: ObjectHandle,
        zone: Option<ZoneId>,
    ) -> Self {
        Self {
            id,
            definition: fragment.definition,
            object: Some(object),
            zone,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn definition(&self) -> &CardDefinition {
        &self.definition
    }

    pub fn zone(&self) -> Option<ZoneId> {
        self.zone
    }

    /// The live engine object, or `None` once it was deleted
    pub fn object_in<E: Engine>(&self, engine: &E) -> Option<ObjectHandle> {
        self.object.filter(|o| engine.object_exists(*o))
    }

    pub fn on_container_event(&mut self, event: ContainerEvent) {
        match event {
            ContainerEvent::Entered(zone) => {
                if self.zone != Some(zone) {
                    log::trace!("card {} entered zone {}", self.id, zone);
                }
                self.zone = Some(zone);
            }
            ContainerEvent::Left(zone) => {
                // A late `Left` for a zone we already moved past is stale
                if self.zone == Some(zone) {
                    log::trace!("card {} left zone {}", self.id, zone);
                    self.zone = None;
                }
            }
        }
    }

    /// The engine deleted this card's object
    pub fn on_destroyed(&mut self) {
        self.object = None;
        self.zone = None;
    }

    /// Capture the fragment that reproduces this card's placement.
    ///
    /// Fails with `StaleInstance` if the object is gone.
    pub fn save<E: Engine>(
        &self,
        engine: &E,
        zones: &Registry<CardDropZone>,
    ) -> PersistResult<InstanceFragment> {
        let stale = || PersistError::StaleInstance { id: self.id.0 };
        let object = self.object_in(engine).ok_or_else(stale)?;

        let placement = match self.zone {
            Some(zone) => {
                let zone = zones
                    .get(zone.index())
                    .ok_or(PersistError::UnknownZoneId(zone.0))?;
                Placement::InZone { zone: zone.anchor() }
            }
            None => {
                let transform = engine.transform_of(object).ok_or_else(stale)?;
                Placement::Loose {
                    position: transform.position,
                    rotation: transform.rotation,
                }
            }
        };

        Ok(InstanceFragment {
            definition: self.definition.clone(),
            placement,
        })
    }
}

impl Tracked for CardInstance {
    fn object(&self) -> Option<ObjectHandle> {
        self.object
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardCategory;
    use crate::engine::{EngineEvent, SimEngine, SpawnRequest, SpawnTemplate, Transform};
    use crate::entity::ZoneFragment;

    fn bolt() -> CardDefinition {
        CardDefinition::new("bolt", "Bolt", CardCategory::Instant, "cards/bolt")
    }

    fn spawn_at(engine: &mut SimEngine, transform: Transform) -> ObjectHandle {
        engine
            .request_spawn(&SpawnRequest {
                template: SpawnTemplate::Card { asset: "cards/bolt".to_string() },
                transform,
            })
            .unwrap();
        engine
            .poll_events()
            .into_iter()
            .find_map(|e| match e {
                EngineEvent::Spawned { object, .. } => Some(object),
                _ => None,
            })
            .unwrap()
    }

    fn zones() -> Registry<CardDropZone> {
        let mut zones = Registry::new();
        zones.push(CardDropZone::from_fragment(
            ZoneId(0),
            ObjectHandle(500),
            ZoneFragment {
                position: Vec3::new(-3.0, 0.0, 3.0),
                rotation: Vec3::new(0.0, 180.0, 0.0),
                size: Vec3::new(2.5, 5.0, 3.0),
                category: CardCategory::Instant,
            },
        ));
        zones
    }

    #[test]
    fn test_loose_save_captures_transform() {
        let mut engine = SimEngine::default();
        let transform = Transform::new(Vec3::new(1.0, 2.0, -4.5), Vec3::new(0.0, 90.0, 0.0));
        let object = spawn_at(&mut engine, transform);
        let instance = CardInstance::new(InstanceId(1), bolt(), object);

        let fragment = instance.save(&engine, &zones()).unwrap();
        assert_eq!(fragment.definition, bolt());
        assert_eq!(
            fragment.placement,
            Placement::Loose {
                position: transform.position,
                rotation: transform.rotation
            }
        );
    }

    #[test]
    fn test_in_zone_save_names_zone_anchor() {
        let mut engine = SimEngine::default();
        let object = spawn_at(&mut engine, Transform::default());
        let zones = zones();
        let instance = CardInstance::from_fragment(
            InstanceId(2),
            InstanceFragment {
                definition: bolt(),
                placement: Placement::InZone { zone: Vec3::new(-3.0, 0.0, 3.0) },
            },
            object,
            Some(ZoneId(0)),
        );

        let fragment = instance.save(&engine, &zones).unwrap();
        assert_eq!(fragment.placement, Placement::InZone { zone: Vec3::new(-3.0, 0.0, 3.0) });
    }

    #[test]
    fn test_container_events_last_one_wins() {
        let mut engine = SimEngine::default();
        let object = spawn_at(&mut engine, Transform::default());
        let mut instance = CardInstance::new(InstanceId(1), bolt(), object);
        assert_eq!(instance.zone(), None);

        instance.on_container_event(ContainerEvent::Entered(ZoneId(0)));
        instance.on_container_event(ContainerEvent::Entered(ZoneId(1)));
        assert_eq!(instance.zone(), Some(ZoneId(1)));

        // Leaving a zone the card is no longer in changes nothing
        instance.on_container_event(ContainerEvent::Left(ZoneId(0)));
        assert_eq!(instance.zone(), Some(ZoneId(1)));

        instance.on_container_event(ContainerEvent::Left(ZoneId(1)));
        assert_eq!(instance.zone(), None);
    }

    #[test]
    fn test_save_after_delete_is_stale() {
        let mut engine = SimEngine::default();
        let object = spawn_at(&mut engine, Transform::default());
        let instance = CardInstance::new(InstanceId(7), bolt(), object);
        engine.destroy(object);

        assert_eq!(instance.object_in(&engine), None);
        let err = instance.save(&engine, &zones()).unwrap_err();
        assert!(matches!(err, PersistError::StaleInstance { id: 7 }));
    }

    #[test]
    fn test_placement_wire_form() {
        let json = serde_json::to_value(Placement::InZone { zone: Vec3::new(-3.0, 0.0, 3.0) }).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "inZone", "zone": [-3.0, 0.0, 3.0]}));

        let loose: Placement = serde_json::from_str(
            r#"{"kind":"loose","position":[1,2,3],"rotation":[0,180,0]}"#,
        )
        .unwrap();
        assert_eq!(
            loose,
            Placement::Loose {
                position: Vec3::new(1.0, 2.0, 3.0),
                rotation: Vec3::new(0.0, 180.0, 0.0)
            }
        );
    }
}
