//! Error types
//!
//! Each concern owns its error enum. The binary reports them through
//! `anyhow`.

use thiserror::Error;

/// Failure to turn stored bytes into a displayable bitmap
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload was empty, nothing to decode
    #[error("image payload is empty")]
    Empty,

    /// The bytes are not a supported image format, or are corrupted
    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    /// The blocking decode task panicked or was cancelled
    #[error("decode task failed: {0}")]
    Join(String),
}

/// Failures of the project catalog (SQLite)
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("could not create catalog directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not determine user data directory")]
    NoDataDir,

    #[error("catalog lock poisoned")]
    Poisoned,

    #[error("catalog task failed: {0}")]
    Join(String),
}

/// Failures surfaced through the repository streams
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("storage error: {0}")]
    Storage(#[from] LibraryError),

    #[error("generation failed: {0}")]
    Generation(String),
}

/// Failures loading or saving the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}
