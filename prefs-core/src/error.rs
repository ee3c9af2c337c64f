/*!
Error types for the Prefs core engine.
*/

use std::fmt;
use thiserror::Error;

/// Result type used throughout the Prefs core.
pub type Result<T> = std::result::Result<T, PrefsError>;

/// Conversion direction of a class callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// object -> node (`from_object`)
    Snapshot,
    /// node -> object (`to_object`)
    Restore,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Snapshot => f.write_str("snapshot"),
            Direction::Restore => f.write_str("restore"),
        }
    }
}

/// Errors that can occur while registering, snapshotting or restoring objects.
#[derive(Error, Debug)]
pub enum PrefsError {
    /// A required argument was empty
    #[error("Missing argument: {0}")]
    NullArgument(&'static str),

    /// Class name is empty or longer than `MAX_CLASS_NAME`
    #[error("Invalid class name \"{name}\": {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// Class name registered twice
    #[error("Class \"{0}\" already registered")]
    DuplicateClass(String),

    /// Class name not registered
    #[error("Unknown class \"{0}\"")]
    UnknownClass(String),

    /// Object already registered (under any class)
    #[error("Object already registered under class \"{class}\"")]
    DuplicateObject { class: String },

    /// Object not registered
    #[error("Object not registered")]
    UnknownObject,

    /// Registry could not grow
    #[error("Failed to allocate registry slot: {0}")]
    SlotExhausted(String),

    /// A class callback failed; no partial result was produced
    #[error("Callback of class \"{class}\" failed: {source}")]
    CallbackFailed {
        class: String,
        #[source]
        source: Box<PrefsError>,
    },

    /// The class does not implement the callback for this direction
    #[error("Class \"{class}\" has no {direction} callback")]
    MissingCallback { class: String, direction: Direction },

    /// The object handed in is not of the type the class works on
    #[error("Class \"{class}\" expects objects of type {expected}")]
    TypeMismatch { class: String, expected: &'static str },

    /// Nested snapshot/restore calls went deeper than the configured limit
    #[error("Recursion depth limit of {limit} exceeded")]
    DepthExceeded { limit: usize },

    /// Text could not be decoded into a node tree
    #[error("Parse error: {0}")]
    ParseFailed(String),

    /// I/O errors during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Storage adapter errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Compression/decompression errors
    #[error("Compression error: {0}")]
    Compression(String),

    /// Property exists but its text is not a valid value of the requested type
    #[error("Malformed value \"{value}\" for property \"{property}\" (expected {expected})")]
    MalformedValue {
        property: String,
        value: String,
        expected: &'static str,
    },

    /// Property is not set on the node
    #[error("Property \"{0}\" not found")]
    NotFound(String),

    /// Node tree manipulation would break the tree shape
    #[error("Invalid tree operation: {0}")]
    InvalidTree(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Error raised by caller code inside a callback
    #[error("{0}")]
    Custom(String),
}

impl PrefsError {
    /// Create a new compression error
    pub fn compression<S: Into<String>>(msg: S) -> Self {
        Self::Compression(msg.into())
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new parse error
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        Self::ParseFailed(msg.into())
    }

    /// Create an error from inside a class callback
    pub fn custom<S: Into<String>>(msg: S) -> Self {
        Self::Custom(msg.into())
    }

    /// Wrap an error returned by a callback of `class`.
    ///
    /// An error that already is a `CallbackFailed` (or a `DepthExceeded`) is
    /// returned unchanged so the class that failed first stays visible
    /// through nested calls. The unnamed `MissingCallback` produced by the
    /// default trait methods is labelled with `class`.
    pub(crate) fn callback_failed(class: &str, source: PrefsError) -> Self {
        match source {
            e @ (PrefsError::CallbackFailed { .. } | PrefsError::DepthExceeded { .. }) => e,
            PrefsError::MissingCallback {
                class: ref missing,
                direction,
            } if missing.is_empty() => PrefsError::MissingCallback {
                class: class.to_string(),
                direction,
            },
            other => PrefsError::CallbackFailed {
                class: class.to_string(),
                source: Box::new(other),
            },
        }
    }
}
