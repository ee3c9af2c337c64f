//! Class registry: class name -> conversion callbacks

use std::collections::HashMap;
use std::rc::Rc;

use super::{SlotKey, SlotTable};
use crate::class::ErasedClass;
use crate::{PrefsError, Result};

/// Maximum length of a class name in bytes
pub const MAX_CLASS_NAME: usize = 64;

/// Check that `name` can be used as a class name
///
/// # Errors
/// * `PrefsError::InvalidName` - If the name is empty or longer than `MAX_CLASS_NAME`
pub fn validate_class_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(PrefsError::InvalidName {
            name: String::new(),
            reason: "class name may not be empty",
        });
    }
    if name.len() > MAX_CLASS_NAME {
        return Err(PrefsError::InvalidName {
            name: name.to_string(),
            reason: "class name exceeds 64 bytes",
        });
    }
    Ok(())
}

pub(crate) struct ClassEntry<U> {
    pub(crate) name: String,
    pub(crate) handler: Rc<dyn ErasedClass<U>>,
}

pub(crate) struct ClassRegistry<U> {
    slots: SlotTable<ClassEntry<U>>,
    by_name: HashMap<String, SlotKey>,
}

impl<U> ClassRegistry<U> {
    pub(crate) fn new(batch: usize) -> Self {
        Self {
            slots: SlotTable::new(batch),
            by_name: HashMap::new(),
        }
    }

    pub(crate) fn register(&mut self, name: &str, handler: Rc<dyn ErasedClass<U>>) -> Result<SlotKey> {
        validate_class_name(name)?;
        if self.by_name.contains_key(name) {
            return Err(PrefsError::DuplicateClass(name.to_string()));
        }

        let key = self.slots.insert(ClassEntry {
            name: name.to_string(),
            handler,
        })?;
        self.by_name.insert(name.to_string(), key);
        Ok(key)
    }

    pub(crate) fn unregister(&mut self, name: &str) -> Option<(SlotKey, ClassEntry<U>)> {
        let key = self.by_name.remove(name)?;
        self.slots.remove(key).map(|entry| (key, entry))
    }

    pub(crate) fn find(&self, name: &str) -> Option<(SlotKey, &ClassEntry<U>)> {
        let key = *self.by_name.get(name)?;
        self.slots.get(key).map(|entry| (key, entry))
    }

    pub(crate) fn get(&self, key: SlotKey) -> Option<&ClassEntry<U>> {
        self.slots.get(key)
    }

    /// Registered names in slot order
    pub(crate) fn names(&self) -> Vec<String> {
        self.slots.iter().map(|(_, entry)| entry.name.clone()).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn drain(&mut self) -> Vec<(SlotKey, ClassEntry<U>)> {
        let keys: Vec<SlotKey> = self.slots.iter().map(|(key, _)| key).collect();
        self.by_name.clear();
        keys.into_iter()
            .filter_map(|key| self.slots.remove(key).map(|entry| (key, entry)))
            .collect()
    }
}
