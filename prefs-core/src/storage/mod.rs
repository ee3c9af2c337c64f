/*!
Storage adapters for encoded preference documents.

The engine hands finished documents (encoded and possibly compressed) to a
[`StorageAdapter`] and gets raw bytes back from it. `obj_to_file` and
`obj_from_file` use [`LocalFileStorage`]; any other backend can be plugged in
through `obj_to_storage` / `obj_from_storage`.
*/

pub mod local;

use std::cell::RefCell;
use std::collections::HashMap;

use crate::Result;

pub use local::LocalFileStorage;

/// Storage abstraction for saving and loading documents
pub trait StorageAdapter {
    /// Save a document to the specified location
    ///
    /// Implementations must not leave a partially written document behind
    /// when saving fails.
    fn save(&self, data: &[u8], path: &str) -> Result<()>;

    /// Load a document from the specified location
    fn load(&self, path: &str) -> Result<Vec<u8>>;

    /// Check if a document exists at the specified location
    fn exists(&self, path: &str) -> bool;

    /// Delete a document; deleting a missing document succeeds
    fn delete(&self, path: &str) -> Result<()>;
}

/// Memory-based storage adapter
///
/// Keeps documents in a map. Useful for tests and for passing documents
/// between contexts without touching the filesystem.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: RefCell<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.data.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.borrow().is_empty()
    }
}

impl StorageAdapter for MemoryStorage {
    fn save(&self, data: &[u8], path: &str) -> Result<()> {
        self.data.borrow_mut().insert(path.to_string(), data.to_vec());
        Ok(())
    }

    fn load(&self, path: &str) -> Result<Vec<u8>> {
        self.data
            .borrow()
            .get(path)
            .cloned()
            .ok_or_else(|| crate::PrefsError::storage(format!("Document not found: {path}")))
    }

    fn exists(&self, path: &str) -> bool {
        self.data.borrow().contains_key(path)
    }

    fn delete(&self, path: &str) -> Result<()> {
        self.data.borrow_mut().remove(path);
        Ok(())
    }
}
