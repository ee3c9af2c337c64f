/*!
Generation-checked slot table.

Freed slots are reused before the table grows, and growth reserves a fixed
batch of slots at a time. Every slot carries a generation that is bumped on
free, so a [`SlotKey`] handed out for a previous occupant never resolves to
the new one.
*/

use crate::{PrefsError, Result};

/// Stable address of an occupied slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    index: u32,
    generation: u32,
}

impl SlotKey {
    /// Position of the slot in the table
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

#[derive(Debug)]
pub(crate) struct SlotTable<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    batch: usize,
    len: usize,
}

impl<T> SlotTable<T> {
    pub(crate) fn new(batch: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            batch: batch.max(1),
            len: 0,
        }
    }

    /// Store `value` in a free slot, growing the table if none is left
    pub(crate) fn insert(&mut self, value: T) -> Result<SlotKey> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            self.len += 1;
            return Ok(SlotKey {
                index,
                generation: slot.generation,
            });
        }

        let index = u32::try_from(self.slots.len())
            .map_err(|_| PrefsError::SlotExhausted("slot index overflow".to_string()))?;
        if self.slots.len() == self.slots.capacity() {
            self.slots
                .try_reserve_exact(self.batch)
                .map_err(|e| PrefsError::SlotExhausted(e.to_string()))?;
        }
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        self.len += 1;
        Ok(SlotKey {
            index,
            generation: 0,
        })
    }

    /// Free the slot addressed by `key` and return its value
    pub(crate) fn remove(&mut self, key: SlotKey) -> Option<T> {
        let slot = self.slots.get_mut(key.index())?;
        if slot.generation != key.generation {
            return None;
        }
        let value = slot.value.take()?;
        // a slot whose generation would wrap is retired instead of reused
        match slot.generation.checked_add(1) {
            Some(next) => {
                slot.generation = next;
                self.free.push(key.index);
            }
            None => slot.generation = u32::MAX,
        }
        self.len -= 1;
        Some(value)
    }

    pub(crate) fn get(&self, key: SlotKey) -> Option<&T> {
        self.slots
            .get(key.index())
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub(crate) fn get_mut(&mut self, key: SlotKey) -> Option<&mut T> {
        self.slots
            .get_mut(key.index())
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    /// Keys and values of all occupied slots, in slot order
    pub(crate) fn iter(&self) -> impl Iterator<Item = (SlotKey, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    SlotKey {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Number of slots allocated so far (occupied or free)
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }
}
