//! `railwatch reset`: clears the persisted known set on demand.

use super::CommandError;
use crate::{
    config::AppConfig,
    persistence::{
        JsonFileKnownSetStore,
        traits::{KnownSetStore, ResetReason},
    },
};

/// Clears `store`, returning how many identifiers it held.
pub async fn reset_known_set(store: &dyn KnownSetStore) -> Result<usize, CommandError> {
    let cleared = store.load().await.len();
    store.reset(ResetReason::Manual).await?;
    Ok(cleared)
}

/// Runs the command against the configured store.
pub async fn execute(config: &AppConfig) -> Result<(), CommandError> {
    let store = JsonFileKnownSetStore::new(&config.known_set_path);
    let cleared = reset_known_set(&store).await?;
    tracing::info!(cleared, path = %store.path().display(), "Known set cleared manually.");
    println!("Cleared {cleared} known trains from {}", store.path().display());
    Ok(())
}
