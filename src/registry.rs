//! Overlay registry: the live overlays of one controller, in creation order.
//!
//! Records own their render handle outright, so a record without a handle
//! cannot exist. Replacing a record's config never touches the handle.

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;

use rand::Rng;

use crate::config::OverlayConfig;
use crate::consts::{OVERLAY_ID_ALPHABET, OVERLAY_ID_LEN};
use crate::dom::{ListenerId, NodeId};

/// One live overlay.
pub struct OverlayRecord<H> {
    pub id: String,
    pub config: OverlayConfig,
    /// Node whose box the overlay is aligned against.
    pub host: NodeId,
    pub handle: H,
    /// `overlayEvent` listener bound on the overlay's backing node.
    pub listener: Option<ListenerId>,
}

/// Ordered collection of [`OverlayRecord`]s keyed by id.
pub struct OverlayRegistry<H> {
    records: Vec<OverlayRecord<H>>,
}

impl<H> Default for OverlayRegistry<H> {
    fn default() -> Self {
        Self { records: Vec::new() }
    }
}

/// A random id drawn from `[0-9a-z]`.
#[must_use]
pub fn random_id() -> String {
    let mut rng = rand::rng();
    (0..OVERLAY_ID_LEN)
        .map(|_| {
            let idx = rng.random_range(0..OVERLAY_ID_ALPHABET.len());
            OVERLAY_ID_ALPHABET[idx] as char
        })
        .collect()
}

impl<H> OverlayRegistry<H> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh id not used by any live record.
    #[must_use]
    pub fn generate_id(&self) -> String {
        loop {
            let id = random_id();
            if !self.contains(&id) {
                return id;
            }
        }
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.records.iter().any(|r| r.id == id)
    }

    /// Append a record. Hands it back if its id is already taken.
    pub fn insert(&mut self, record: OverlayRecord<H>) -> Option<OverlayRecord<H>> {
        if self.contains(&record.id) {
            return Some(record);
        }
        self.records.push(record);
        None
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&OverlayRecord<H>> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut OverlayRecord<H>> {
        self.records.iter_mut().find(|r| r.id == id)
    }

    /// Swap in a new config, keeping handle, host, and listener. Returns false
    /// for an unknown id.
    pub fn replace_config(&mut self, id: &str, config: OverlayConfig) -> bool {
        let Some(record) = self.get_mut(id) else {
            return false;
        };
        record.config = config;
        true
    }

    /// Remove a record by id, returning it if it was present.
    pub fn remove(&mut self, id: &str) -> Option<OverlayRecord<H>> {
        let index = self.records.iter().position(|r| r.id == id)?;
        Some(self.records.remove(index))
    }

    /// Take every record out, oldest first.
    pub fn drain(&mut self) -> std::vec::Drain<'_, OverlayRecord<H>> {
        self.records.drain(..)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OverlayRecord<H>> {
        self.records.iter()
    }

    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.id.as_str()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
