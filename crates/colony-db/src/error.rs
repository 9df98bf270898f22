//! Error types for the colony stores.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`fred`], [`serde_json`], and I/O errors.

/// Errors that can occur while loading or saving colony memory.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `Dragonfly`/Redis operation failed.
    #[error("Dragonfly error: {0}")]
    Dragonfly(#[from] fred::error::Error),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A file store operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data does not describe a valid colony.
    #[error("Corrupt record at {key}: {reason}")]
    Corrupt {
        /// The key or path that holds the bad data.
        key: String,
        /// What is wrong with it.
        reason: String,
    },

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
