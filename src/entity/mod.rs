//! Persistent entities: card instances and drop zones
//!
//! Both wrap an engine object and can be built either fresh or from a
//! saved fragment.

pub mod instance;
pub mod zone;

pub use instance::{CardInstance, ContainerEvent, InstanceFragment, InstanceId, Placement};
pub use zone::{CardDropZone, ZoneFragment, ZoneId};

use crate::engine::ObjectHandle;

/// An entity bound to (at most) one engine object
pub trait Tracked {
    fn object(&self) -> Option<ObjectHandle>;
}
