//! Card drop zones
//!
//! A zone is a fixed region that accepts one card category. Which cards it
//! holds is not stored here; each instance tracks its own zone.

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::{CardInstance, Tracked};
use crate::card::{CardCategory, CardDefinition};
use crate::consts::{ANCHOR_EPSILON, DROP_LIFT};
use crate::engine::{Engine, ObjectHandle, Transform};
use crate::error::{PersistError, PersistResult};

/// Registry position of a zone (zones live for the whole session)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ZoneId(pub u32);

impl ZoneId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Saved form of a zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneFragment {
    pub position: Vec3,
    /// Euler degrees
    pub rotation: Vec3,
    pub size: Vec3,
    pub category: CardCategory,
}

#[derive(Debug, Clone)]
pub struct CardDropZone {
    id: ZoneId,
    object: ObjectHandle,
    position: Vec3,
    rotation: Vec3,
    size: Vec3,
    category: CardCategory,
}

impl CardDropZone {
    /// Bind a freshly placed zone
    pub fn new(
        id: ZoneId,
        object: ObjectHandle,
        position: Vec3,
        rotation: Vec3,
        size: Vec3,
        category: CardCategory,
    ) -> Self {
        Self {
            id,
            object,
            position,
            rotation,
            size,
            category,
        }
    }

    /// Rebuild a zone from its saved fragment
    pub fn from_fragment(id: ZoneId, object: ObjectHandle, fragment: ZoneFragment) -> Self {
        Self::new(
            id,
            object,
            fragment.position,
            fragment.rotation,
            fragment.size,
            fragment.category,
        )
    }

    pub fn id(&self) -> ZoneId {
        self.id
    }

    pub fn handle(&self) -> ObjectHandle {
        self.object
    }

    pub fn category(&self) -> CardCategory {
        self.category
    }

    /// Anchor position; saved instances name their zone by it
    pub fn anchor(&self) -> Vec3 {
        self.position
    }

    pub fn is_anchored_at(&self, anchor: Vec3) -> bool {
        self.position.abs_diff_eq(anchor, ANCHOR_EPSILON)
    }

    pub fn accepts(&self, definition: &CardDefinition) -> bool {
        definition.category == self.category
    }

    /// Where dropped cards are released
    pub fn drop_transform(&self) -> Transform {
        let lift = DROP_LIFT.min(self.size.y * 0.25);
        Transform::new(self.position + Vec3::Y * lift, self.rotation)
    }

    /// Ask the engine to move `instance` into this zone. `source` is the zone
    /// the card is leaving, if any.
    ///
    /// The move is not awaited: the card's zone changes only once the engine
    /// reports containment.
    pub fn drop<E: Engine>(
        &self,
        engine: &mut E,
        source: Option<&CardDropZone>,
        instance: &CardInstance,
    ) -> PersistResult<()> {
        if !self.accepts(instance.definition()) {
            return Err(PersistError::CategoryMismatch {
                card: instance.definition().id.clone(),
                zone: self.id.0,
                card_category: instance.definition().category,
                zone_category: self.category,
            });
        }
        let Some(object) = instance.object_in(&*engine) else {
            return Err(PersistError::StaleInstance { id: instance.id().0 });
        };

        match source {
            Some(from) => log::debug!(
                "dropping card {} ({}) from zone {} into zone {}",
                instance.id().0,
                instance.definition().id,
                from.id,
                self.id
            ),
            None => log::debug!(
                "dropping card {} ({}) into zone {}",
                instance.id().0,
                instance.definition().id,
                self.id
            ),
        }
        engine.move_object(object, self.drop_transform());
        Ok(())
    }

    pub fn save(&self) -> ZoneFragment {
        ZoneFragment {
            position: self.position,
            rotation: self.rotation,
            size: self.size,
            category: self.category,
        }
    }
}

impl Tracked for CardDropZone {
    fn object(&self) -> Option<ObjectHandle> {
        Some(self.object)
    }
}
