//! This module contains the error types for the persistence layer.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in the persistence layer.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Reading or writing the backing file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// An error occurred during serialization or deserialization.
    #[error("Failed to serialize or deserialize data: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}
