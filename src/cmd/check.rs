//! `railwatch check`: fetches one snapshot and reports what would be new.
//!
//! Nothing is sent and nothing is persisted.

use serde::Serialize;

use super::CommandError;
use crate::{
    config::AppConfig,
    engine::detect,
    http_client::HttpClientPool,
    models::EntityId,
    persistence::{JsonFileKnownSetStore, traits::KnownSetStore},
    providers::{HttpSnapshotSource, SnapshotSource},
};

/// Result of a check run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    /// Distinct trains in the snapshot.
    pub snapshot_size: usize,
    /// Trains in the persisted known set.
    pub known: usize,
    /// Trains that the next poll would announce.
    pub new_ids: Vec<EntityId>,
}

/// Compares one snapshot from `source` with the set held by `store`.
pub async fn check(
    source: &dyn SnapshotSource,
    store: &dyn KnownSetStore,
) -> Result<CheckReport, CommandError> {
    let snapshot = source.fetch().await?;
    let known = store.load().await;
    let current = snapshot.id_set();
    let new_ids = detect(&current, &known).into_iter().collect();

    Ok(CheckReport { snapshot_size: current.len(), known: known.len(), new_ids })
}

/// Runs the command with the configured source and store and prints the
/// report as JSON.
pub async fn execute(config: &AppConfig) -> Result<(), CommandError> {
    let pool = HttpClientPool::new(config.http_base_config.clone());
    let client = pool.get_or_create(&config.http_retry_config).await?;
    let source = HttpSnapshotSource::new(
        client,
        config.snapshot.url.clone(),
        config.snapshot.id_field.clone(),
        config.snapshot.timeout,
    );
    let store = JsonFileKnownSetStore::new(&config.known_set_path);

    let report = check(&source, &store).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{EntityAttributes, KnownSet, Snapshot},
        persistence::traits::MockKnownSetStore,
        providers::{SnapshotError, traits::MockSnapshotSource},
    };

    #[tokio::test]
    async fn test_check_lists_new_ids_without_saving() {
        let mut source = MockSnapshotSource::new();
        source.expect_fetch().returning(|| {
            let mut snapshot = Snapshot::default();
            for id in ["12727", "17239"] {
                snapshot.push(EntityId::new(id), EntityAttributes::default());
            }
            Ok(snapshot)
        });
        let mut store = MockKnownSetStore::new();
        store.expect_load().returning(|| KnownSet::from([EntityId::new("12727")]));
        store.expect_save().times(0);
        store.expect_reset().times(0);

        let report = check(&source, &store).await.unwrap();

        assert_eq!(report.snapshot_size, 2);
        assert_eq!(report.known, 1);
        assert_eq!(report.new_ids, vec![EntityId::new("17239")]);
    }

    #[tokio::test]
    async fn test_check_surfaces_fetch_errors() {
        let mut source = MockSnapshotSource::new();
        source.expect_fetch().returning(|| Err(SnapshotError::Status(502)));
        let store = MockKnownSetStore::new();

        let err = check(&source, &store).await.unwrap_err();
        assert!(matches!(err, CommandError::Snapshot(SnapshotError::Status(502))));
    }
}
