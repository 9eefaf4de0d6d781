//! This module defines the interface for fetching the live train snapshot.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

use crate::{http_client::HttpClientPoolError, models::Snapshot};

/// Custom error type for snapshot source operations.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// The request could not be completed.
    #[error("Snapshot request failed: {0}")]
    Request(#[from] reqwest_middleware::Error),

    /// The source answered with a non-success status.
    #[error("Snapshot source returned HTTP {0}")]
    Status(u16),

    /// The body was not the expected shape.
    #[error("Failed to decode snapshot: {0}")]
    Decode(String),

    /// No HTTP client could be built.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] HttpClientPoolError),
}

/// A source of current-state snapshots.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetches the current snapshot.
    async fn fetch(&self) -> Result<Snapshot, SnapshotError>;
}
