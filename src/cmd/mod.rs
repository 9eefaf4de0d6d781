//! One-shot CLI subcommands besides `run`.

pub mod check;
pub mod reset;

use thiserror::Error;

use crate::{
    http_client::HttpClientPoolError, persistence::error::PersistenceError,
    providers::SnapshotError,
};

/// Errors returned by the one-shot commands.
#[derive(Error, Debug)]
pub enum CommandError {
    /// The configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    /// The snapshot could not be fetched.
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// The known set could not be written.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// No HTTP client could be built.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] HttpClientPoolError),

    /// The report could not be serialized.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
