//! Storage interface for the known set.

use std::fmt;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use super::error::PersistenceError;
use crate::models::KnownSet;

/// Why the persisted set is being cleared. Logged with every reset so a
/// policy-driven clear is never mistaken for saving an empty set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    /// The daily reset window was reached.
    Scheduled,
    /// An operator ran `railwatch reset`.
    Manual,
}

impl fmt::Display for ResetReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResetReason::Scheduled => write!(f, "scheduled_reset"),
            ResetReason::Manual => write!(f, "manual_reset"),
        }
    }
}

/// Durable storage of the identifiers already notified about.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KnownSetStore: Send + Sync {
    /// Loads the persisted set.
    ///
    /// Never fails: missing or unreadable state yields an empty set, since a
    /// lost known set only costs duplicate notifications.
    async fn load(&self) -> KnownSet;

    /// Replaces the persisted set with `known`. Readers never observe a
    /// partially written set.
    async fn save(&self, known: &KnownSet) -> Result<(), PersistenceError>;

    /// Clears the persisted set.
    async fn reset(&self, reason: ResetReason) -> Result<(), PersistenceError>;
}
