//! Error types for the I/O edges (tuning files, saved profiles).
//!
//! The simulation itself never fails; these only surface from loaders.

use thiserror::Error;

/// Errors raised while reading or writing tuning and profile data.
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias for fallible loaders.
pub type Result<T> = std::result::Result<T, Error>;
