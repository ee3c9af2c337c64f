//! Object registry: live object -> {class, node}
//!
//! Objects are identified by the address of the caller's allocation and held
//! through a `Weak`, so the registry never keeps an object alive. An entry
//! whose object has been dropped is stale. Lookups treat stale entries as
//! absent, and they are swept once the table has doubled since the last sweep.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::rc::Weak;

use tracing::debug;

use super::{SlotKey, SlotTable};
use crate::node::WeakNode;
use crate::Result;

pub(crate) struct ObjectEntry {
    pub(crate) object: Weak<dyn Any>,
    pub(crate) object_type: TypeId,
    pub(crate) address: usize,
    pub(crate) class: SlotKey,
    pub(crate) node: WeakNode,
}

impl ObjectEntry {
    pub(crate) fn is_alive(&self) -> bool {
        self.object.strong_count() > 0
    }
}

pub(crate) struct ObjectRegistry {
    slots: SlotTable<ObjectEntry>,
    by_address: HashMap<usize, SlotKey>,
    batch: usize,
    sweep_at: usize,
}

impl ObjectRegistry {
    pub(crate) fn new(batch: usize) -> Self {
        let batch = batch.max(1);
        Self {
            slots: SlotTable::new(batch),
            by_address: HashMap::new(),
            batch,
            sweep_at: batch,
        }
    }

    /// Store a new entry; the caller has checked that `address` is free
    pub(crate) fn insert(
        &mut self,
        class: SlotKey,
        object: Weak<dyn Any>,
        object_type: TypeId,
        address: usize,
    ) -> Result<SlotKey> {
        if self.slots.len() >= self.sweep_at {
            self.sweep();
            self.sweep_at = self.batch.max(self.slots.len() * 2);
        }

        let key = self.slots.insert(ObjectEntry {
            object,
            object_type,
            address,
            class,
            node: WeakNode::new(),
        })?;
        self.by_address.insert(address, key);
        Ok(key)
    }

    /// Find the entry registered for `address`, alive or stale
    pub(crate) fn find(&self, address: usize) -> Option<(SlotKey, &ObjectEntry)> {
        let key = *self.by_address.get(&address)?;
        self.slots.get(key).map(|entry| (key, entry))
    }

    /// Find the live entry registered for `address` with an object of type `object_type`
    pub(crate) fn find_alive(&self, address: usize, object_type: TypeId) -> Option<(SlotKey, &ObjectEntry)> {
        self.find(address)
            .filter(|(_, entry)| entry.object_type == object_type && entry.is_alive())
    }

    pub(crate) fn remove(&mut self, key: SlotKey) -> Option<ObjectEntry> {
        let entry = self.slots.remove(key)?;
        if self.by_address.get(&entry.address) == Some(&key) {
            self.by_address.remove(&entry.address);
        }
        Some(entry)
    }

    /// Remember `node` as the node last produced/consumed for the entry
    pub(crate) fn set_node(&mut self, key: SlotKey, node: WeakNode) {
        if let Some(entry) = self.slots.get_mut(key) {
            entry.node = node;
        }
    }

    /// Drop every stale entry; returns how many were removed
    pub(crate) fn sweep(&mut self) -> usize {
        let stale: Vec<SlotKey> = self
            .slots
            .iter()
            .filter(|(_, entry)| !entry.is_alive())
            .map(|(key, _)| key)
            .collect();
        let swept = stale.into_iter().filter(|key| self.remove(*key).is_some()).count();
        if swept > 0 {
            debug!(swept, remaining = self.slots.len(), "Swept stale object entries");
        }
        swept
    }

    /// Forget every entry of `class`; returns how many live objects were orphaned
    pub(crate) fn remove_class(&mut self, class: SlotKey) -> usize {
        let keys: Vec<SlotKey> = self
            .slots
            .iter()
            .filter(|(_, entry)| entry.class == class)
            .map(|(key, _)| key)
            .collect();
        keys.into_iter()
            .filter_map(|key| self.remove(key))
            .filter(ObjectEntry::is_alive)
            .count()
    }

    pub(crate) fn count_class(&self, class: SlotKey) -> usize {
        self.slots
            .iter()
            .filter(|(_, entry)| entry.class == class && entry.is_alive())
            .count()
    }

    /// Number of live entries
    pub(crate) fn len(&self) -> usize {
        self.slots.iter().filter(|(_, entry)| entry.is_alive()).count()
    }

    /// Number of occupied slots, stale entries included
    pub(crate) fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Forget every entry; returns how many live objects were orphaned
    pub(crate) fn clear(&mut self) -> usize {
        let keys: Vec<SlotKey> = self.slots.iter().map(|(key, _)| key).collect();
        let orphaned = keys
            .into_iter()
            .filter_map(|key| self.remove(key))
            .filter(ObjectEntry::is_alive)
            .count();
        self.sweep_at = self.batch;
        orphaned
    }
}
