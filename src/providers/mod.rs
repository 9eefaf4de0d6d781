//! Sources of live train snapshots.

pub mod http;
pub mod traits;

pub use http::HttpSnapshotSource;
pub use traits::{SnapshotError, SnapshotSource};
