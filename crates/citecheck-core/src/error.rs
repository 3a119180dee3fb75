//! Error types for citecheck-core
//!
//! Only structurally fatal problems are errors here. Per-item failures
//! (a reference that cannot be looked up, a verdict that cannot be parsed)
//! are recorded as data on [`crate::MatchResult`] and [`crate::Verdict`].

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, CheckError>;

/// Main error type for pipeline operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CheckError {
    /// A bracket group looked like a citation but could not be parsed.
    /// Local to one marker: the parser skips it and keeps going.
    #[error("Malformed citation marker {marker:?}: {reason}")]
    MalformedMarker { marker: String, reason: String },

    /// Non-empty reference-list text yielded zero entries
    #[error("Could not split reference list into entries ({lines} non-empty lines)")]
    UnparsableReferenceList { lines: usize },

    /// Caller supplied configuration that cannot be used
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl CheckError {
    pub(crate) fn malformed(marker: &str, reason: impl Into<String>) -> Self {
        CheckError::MalformedMarker {
            marker: marker.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error aborts the whole run
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CheckError::MalformedMarker { .. })
    }
}

/// Configuration validation error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Value is out of valid range
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    /// File could not be read
    #[error("Could not read config file: {0}")]
    Io(String),

    /// TOML or JSON could not be decoded
    #[error("Could not parse config: {0}")]
    Parse(String),
}
