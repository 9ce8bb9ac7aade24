//! Shared host save slot
//!
//! Several subsystems can share one host-level save string. Each registers
//! under its own namespace and only ever sees its own sub-document.

use std::collections::BTreeMap;

use crate::engine::Engine;
use crate::error::{PersistError, PersistResult};
use crate::session::Session;

/// A subsystem that stores its state in a shared save slot
pub trait SaveSubscriber {
    /// Unique key inside the slot
    fn namespace(&self) -> &str;

    /// Restore from this subscriber's sub-document ("" on first run)
    fn load(&mut self, payload: &str) -> PersistResult<()>;

    /// Produce this subscriber's sub-document
    fn save(&mut self) -> PersistResult<String>;
}

impl<E: Engine> SaveSubscriber for Session<E> {
    fn namespace(&self) -> &str {
        &self.config().namespace
    }

    fn load(&mut self, payload: &str) -> PersistResult<()> {
        let report = self.on_load(payload)?;
        for failure in &report.failures {
            log::warn!("[{}] {failure}", self.config().namespace);
        }
        Ok(())
    }

    fn save(&mut self) -> PersistResult<String> {
        self.on_save()
    }
}

/// Splits one host save string into per-namespace sub-documents and back
#[derive(Default)]
pub struct SaveSlot {
    subscribers: Vec<Box<dyn SaveSubscriber>>,
}

impl SaveSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, subscriber: Box<dyn SaveSubscriber>) -> PersistResult<()> {
        let namespace = subscriber.namespace();
        if self.subscribers.iter().any(|s| s.namespace() == namespace) {
            return Err(PersistError::DuplicateNamespace(namespace.to_string()));
        }
        log::debug!("Registered save subscriber '{namespace}'");
        self.subscribers.push(subscriber);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Hand each subscriber its sub-document. An empty slot (or a namespace
    /// missing from it) means first run for that subscriber.
    pub fn load(&mut self, slot: &str) -> PersistResult<()> {
        let mut parts: BTreeMap<String, String> = if slot.is_empty() {
            BTreeMap::new()
        } else {
            serde_json::from_str(slot).map_err(PersistError::Decode)?
        };

        for subscriber in &mut self.subscribers {
            let payload = parts.remove(subscriber.namespace()).unwrap_or_default();
            subscriber.load(&payload)?;
        }
        for namespace in parts.keys() {
            log::warn!("No subscriber for saved namespace '{namespace}', dropping it");
        }
        Ok(())
    }

    pub fn save(&mut self) -> PersistResult<String> {
        let mut parts = BTreeMap::new();
        for subscriber in &mut self.subscribers {
            let payload = subscriber.save()?;
            parts.insert(subscriber.namespace().to_string(), payload);
        }
        serde_json::to_string(&parts).map_err(PersistError::Encode)
    }
}
