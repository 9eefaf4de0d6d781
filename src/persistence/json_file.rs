//! Known-set storage as a flat JSON list on disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{
    error::PersistenceError,
    traits::{KnownSetStore, ResetReason},
};
use crate::models::{EntityId, KnownSet};

/// Stores the known set as a JSON array of identifiers, e.g.
/// `["12951", "22439"]`.
///
/// Writes go to a sibling temporary file that is then renamed over the
/// target, so a crash mid-write leaves the previous contents in place.
#[derive(Debug, Clone)]
pub struct JsonFileKnownSetStore {
    path: PathBuf,
}

impl JsonFileKnownSetStore {
    /// Creates a store backed by `path`. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn write_atomic(&self, known: &KnownSet) -> Result<(), PersistenceError> {
        let ids: Vec<&EntityId> = known.iter().collect();
        let bytes = serde_json::to_vec_pretty(&ids)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PersistenceError::io(parent, e))?;
        }

        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, bytes)
            .await
            .map_err(|e| PersistenceError::io(&temp_path, e))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| PersistenceError::io(&self.path, e))
    }
}

#[async_trait]
impl KnownSetStore for JsonFileKnownSetStore {
    async fn load(&self) -> KnownSet {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No known set on disk, starting empty.");
                return KnownSet::new();
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Could not read known set, starting empty.");
                return KnownSet::new();
            }
        };

        match serde_json::from_slice::<Vec<EntityId>>(&bytes) {
            Ok(ids) => {
                let known: KnownSet = ids.into_iter().collect();
                tracing::debug!(path = %self.path.display(), count = known.len(), "Loaded known set.");
                known
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Known set is corrupt, starting empty.");
                KnownSet::new()
            }
        }
    }

    async fn save(&self, known: &KnownSet) -> Result<(), PersistenceError> {
        self.write_atomic(known).await?;
        tracing::debug!(path = %self.path.display(), count = known.len(), "Saved known set.");
        Ok(())
    }

    async fn reset(&self, reason: ResetReason) -> Result<(), PersistenceError> {
        self.write_atomic(&KnownSet::new()).await?;
        tracing::info!(path = %self.path.display(), %reason, "Known set reset.");
        Ok(())
    }
}
