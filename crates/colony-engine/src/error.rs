//! Error types for the colony engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and the snapshot loop.

/// Top-level error for the colony engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: colony_core::ConfigError,
    },

    /// The colony store failed to open, load, or save.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: colony_db::DbError,
    },

    /// Reading snapshots or writing commands failed.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A tick output could not be serialized.
    #[error("serialization error: {source}")]
    Serialization {
        /// The underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// The tracing subscriber could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the logging failure.
        message: String,
    },
}
