//! A set of helpers for testing

mod config;
mod fakes;
mod snapshot;

pub use config::create_test_app_config;
pub use fakes::{InMemoryKnownSetStore, RecordingProvider, SentMessage, StaticSnapshotSource};
pub use snapshot::SnapshotBuilder;
