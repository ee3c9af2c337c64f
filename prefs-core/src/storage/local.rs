/*!
Local filesystem storage adapter implementation.
*/

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use super::StorageAdapter;
use crate::{PrefsError, Result};

/// Local filesystem storage adapter
///
/// Documents are written to a temporary file in the target directory and
/// renamed into place, so a failed write never replaces or truncates an
/// existing document. Missing parent directories are created. Filesystem
/// failures are reported as [`PrefsError::Io`] naming the resolved path.
///
/// # Example
/// ```rust
/// use prefs_core::storage::{LocalFileStorage, StorageAdapter};
///
/// let dir = tempfile::TempDir::new()?;
/// let storage = LocalFileStorage::with_base_dir(dir.path());
/// storage.save(br#"{"tag": "person"}"#, "people/bob.json")?;
/// assert!(storage.exists("people/bob.json"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct LocalFileStorage {
    /// Optional base directory for relative paths
    base_dir: Option<PathBuf>,
}

impl LocalFileStorage {
    /// Create an adapter that uses paths as given
    pub fn new() -> Self {
        Self { base_dir: None }
    }

    /// Create an adapter resolving every path against `base_dir`
    pub fn with_base_dir<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: Some(base_dir.as_ref().to_path_buf()),
        }
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        match &self.base_dir {
            Some(base) => base.join(path),
            None => PathBuf::from(path),
        }
    }

    fn write_atomic(&self, full_path: &Path, data: &[u8]) -> io::Result<()> {
        let parent = match full_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        let mut file = NamedTempFile::new_in(&parent)?;
        file.write_all(data)?;
        file.as_file().sync_all()?;
        file.persist(full_path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Keep the error kind, prefix the message with what failed where
fn io_error(action: &str, path: &Path, e: io::Error) -> PrefsError {
    PrefsError::Io(io::Error::new(
        e.kind(),
        format!("Failed to {} {}: {}", action, path.display(), e),
    ))
}

impl StorageAdapter for LocalFileStorage {
    fn save(&self, data: &[u8], path: &str) -> Result<()> {
        if path.is_empty() {
            return Err(PrefsError::NullArgument("path"));
        }
        let full_path = self.resolve_path(path);

        self.write_atomic(&full_path, data)
            .map_err(|e| io_error("write document to", &full_path, e))?;

        debug!(path = %full_path.display(), size = data.len(), "Saved document");
        Ok(())
    }

    fn load(&self, path: &str) -> Result<Vec<u8>> {
        if path.is_empty() {
            return Err(PrefsError::NullArgument("path"));
        }
        let full_path = self.resolve_path(path);

        fs::read(&full_path).map_err(|e| io_error("read document from", &full_path, e))
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve_path(path).is_file()
    }

    fn delete(&self, path: &str) -> Result<()> {
        let full_path = self.resolve_path(path);

        if full_path.exists() {
            fs::remove_file(&full_path).map_err(|e| io_error("delete document", &full_path, e))?;
        }

        Ok(())
    }
}
