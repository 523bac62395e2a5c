//! Error types for telemetry processing.
//!
//! All fallible operations in roadcast return [`TelemetryError`]. Errors carry
//! structured context (paths, offsets, sizes) and can be classified for
//! recovery through [`TelemetryError::is_retryable`].
//!
//! ## Error Categories
//!
//! - **Source Errors**: the shared memory file is missing or undersized
//! - **Decode Errors**: a read falls outside the mapped region
//! - **File Errors**: I/O failures on catalogs, settings and config files
//! - **Parse Errors**: malformed YAML or JSON input
//! - **Runtime Errors**: background work started outside a Tokio runtime
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use roadcast::TelemetryError;
//!
//! let error = TelemetryError::unavailable("/dev/shm/SCS/SCSTelemetry");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for roadcast operations.
pub type Result<T, E = TelemetryError> = std::result::Result<T, E>;

/// Main error type for roadcast operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TelemetryError {
    #[error("Telemetry source not found at {path}")]
    Unavailable { path: PathBuf },

    #[error("Telemetry region at {path} is {actual} bytes, at least {required} required")]
    TooSmall { path: PathBuf, required: usize, actual: usize },

    #[error("Telemetry decoder is not connected")]
    NotConnected,

    #[error("Read of {len} bytes at offset {offset:#x} is outside the telemetry region")]
    Memory { offset: usize, len: usize },

    #[error("File error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Runtime error: {reason}")]
    Runtime { reason: String },
}

impl TelemetryError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TelemetryError::Unavailable { .. } => true,
            TelemetryError::TooSmall { .. } => true,
            TelemetryError::NotConnected => true,
            TelemetryError::Memory { .. } => true,
            TelemetryError::File { .. } => false,
            TelemetryError::Parse { .. } => false,
            TelemetryError::Runtime { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TelemetryError::Unavailable { .. } => vec![
                "Ensure the game is running",
                "Install the SCS telemetry plugin into the game's plugins directory",
                "Check the configured telemetry path",
            ],
            TelemetryError::TooSmall { .. } => vec![
                "Update the SCS telemetry plugin to a compatible version",
                "Wait for the game to finish loading and reconnect",
            ],
            TelemetryError::NotConnected => {
                vec!["Connect the telemetry decoder before sampling", "Check the telemetry path"]
            }
            TelemetryError::Memory { .. } => vec![
                "Verify the shared memory region is still valid",
                "Reconnect to the telemetry source",
            ],
            TelemetryError::File { .. } => vec![
                "Check file exists and is readable",
                "Check file permissions",
                "Ensure sufficient disk space",
            ],
            TelemetryError::Parse { .. } => vec![
                "Check the file format against the documented schema",
                "Remove the file to fall back to built-in defaults",
            ],
            TelemetryError::Runtime { .. } => {
                vec!["Start background sampling from within a Tokio runtime"]
            }
        }
    }

    /// Helper constructor for a missing telemetry source.
    pub fn unavailable(path: impl Into<PathBuf>) -> Self {
        TelemetryError::Unavailable { path: path.into() }
    }

    /// Helper constructor for an undersized telemetry region.
    pub fn too_small(path: impl Into<PathBuf>, required: usize, actual: usize) -> Self {
        TelemetryError::TooSmall { path: path.into(), required, actual }
    }

    /// Helper constructor for out-of-bounds reads.
    pub fn memory_access_error(offset: usize, len: usize) -> Self {
        TelemetryError::Memory { offset, len }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        TelemetryError::File { path, source }
    }

    /// Helper constructor for parse errors.
    pub fn parse_error(context: impl Into<String>, details: impl ToString) -> Self {
        TelemetryError::Parse { context: context.into(), details: details.to_string() }
    }

    /// Helper constructor for runtime errors.
    pub fn runtime(reason: impl Into<String>) -> Self {
        TelemetryError::Runtime { reason: reason.into() }
    }
}

impl From<std::io::Error> for TelemetryError {
    fn from(err: std::io::Error) -> Self {
        TelemetryError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}
