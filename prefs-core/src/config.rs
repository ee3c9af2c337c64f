//! Configuration of a preferences context
//!
//! [`PrefsConfig`] controls the registry growth policy, the nesting limit of
//! snapshot/restore calls and the on-disk shape of encoded documents. It is
//! serde-serializable so applications can keep it next to their own settings.

use serde::{Deserialize, Serialize};

/// Default number of slots a registry grows by when it runs out of space
pub const DEFAULT_SLOT_BATCH: usize = 64;

/// Default limit for nested `obj_to_node` / `obj_from_node` calls
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Compression applied to documents written to files and storage adapters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompressionKind {
    /// Plain text documents
    #[default]
    None,
    /// Gzip-wrapped documents
    Gzip,
}

/// Settings of one `Prefs` context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefsConfig {
    /// Maximum nesting of snapshot/restore calls
    pub max_depth: usize,
    /// Number of slots registries reserve at a time
    pub slot_batch: usize,
    /// Emit indented documents
    pub pretty: bool,
    /// Compression for files and storage adapters
    pub compression: CompressionKind,
    /// Gzip level 0-9 (library default when unset)
    pub compression_level: Option<u32>,
}

impl PrefsConfig {
    /// Set the maximum nesting depth
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the registry growth batch
    pub fn with_slot_batch(mut self, slot_batch: usize) -> Self {
        self.slot_batch = slot_batch;
        self
    }

    /// Choose indented or single-line documents
    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Choose the compression for files and storage adapters
    pub fn with_compression(mut self, compression: CompressionKind) -> Self {
        self.compression = compression;
        self
    }

    /// Set the gzip level
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = Some(level);
        self
    }

    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(text: &str) -> crate::Result<Self> {
        let config: PrefsConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_depth == 0 {
            return Err(crate::PrefsError::validation(
                "max_depth must allow at least one level",
            ));
        }
        if self.slot_batch == 0 {
            return Err(crate::PrefsError::validation("slot_batch must be positive"));
        }
        if let Some(level) = self.compression_level {
            if level > 9 {
                return Err(crate::PrefsError::validation(format!(
                    "compression_level {level} out of range 0-9"
                )));
            }
        }
        Ok(())
    }
}

impl Default for PrefsConfig {
    fn default() -> Self {
        PrefsConfig {
            max_depth: DEFAULT_MAX_DEPTH,
            slot_batch: DEFAULT_SLOT_BATCH,
            pretty: true,
            compression: CompressionKind::None,
            compression_level: None,
        }
    }
}
