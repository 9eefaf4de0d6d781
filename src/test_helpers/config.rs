use serde_json::json;

use crate::config::AppConfig;

/// Creates an `AppConfig` with every optional setting at its default and no
/// channels. Fields are public, so tests adjust what they need.
pub fn create_test_app_config(snapshot_url: &str) -> AppConfig {
    serde_json::from_value(json!({ "snapshot": { "url": snapshot_url } }))
        .expect("test config should deserialize")
}
