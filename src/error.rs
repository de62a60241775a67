// Error types for Exliar Compat
//
// Only configuration failures are fatal. Detection and probe failures are
// absorbed by their callers and surface as "unknown" states in the reports.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the compatibility and readiness core
#[derive(Debug, Error)]
pub enum CompatError {
    /// The compatibility table (or config file) is missing, unreadable or malformed
    #[error("Configuration error at {path}: {message}")]
    Configuration { path: PathBuf, message: String },

    /// An external enumeration command could not be run
    #[error("Detection unavailable: `{command}` could not run: {message}")]
    DetectionUnavailable { command: String, message: String },

    /// A probe produced output that matched none of the known patterns
    #[error("Probe '{check}' was indeterminate: {message}")]
    ProbeIndeterminate { check: String, message: String },

    /// A USB list number outside the detected device list
    #[error("Invalid selection {number}: expected a number between 1 and {available}")]
    InvalidSelection { number: usize, available: usize },

    /// A boot script that was not generated by AutoPilot or lacks the USB marker
    #[error("Invalid boot script {path}: {message}")]
    InvalidScript { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CompatError {
    /// Shorthand for a configuration error on the given path
    pub fn configuration(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        CompatError::Configuration {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this error must abort the operation that produced it
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            CompatError::DetectionUnavailable { .. } | CompatError::ProbeIndeterminate { .. }
        )
    }
}

/// Result type alias for Exliar Compat operations
pub type Result<T> = std::result::Result<T, CompatError>;
