use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{deserialize_duration_from_ms, deserialize_duration_from_seconds};

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff() -> Duration {
    Duration::from_millis(250)
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(10)
}

fn default_base_for_backoff() -> u32 {
    2
}

/// Serializable setting for jitter in retry policies
#[derive(Default, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JitterSetting {
    /// No jitter applied to the backoff duration
    None,
    /// Full jitter applied, randomizing the backoff duration
    #[default]
    Full,
}

/// Transport-level retry policy shared by the snapshot source and the HTTP
/// channel providers.
///
/// Only transient failures (connect errors, 5xx, 429) are retried here. The
/// plain-text fallback of the dispatcher is a separate, content-level retry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct HttpRetryConfig {
    /// Maximum number of retries for transient errors
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base duration for exponential backoff calculations
    #[serde(default = "default_base_for_backoff")]
    pub base_for_backoff: u32,
    /// Initial backoff duration before the first retry
    #[serde(
        default = "default_initial_backoff",
        deserialize_with = "deserialize_duration_from_ms"
    )]
    pub initial_backoff_ms: Duration,
    /// Maximum backoff duration for retries
    #[serde(
        default = "default_max_backoff",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub max_backoff_secs: Duration,
    /// Jitter to apply to the backoff duration
    #[serde(default)]
    pub jitter: JitterSetting,
}

impl Default for HttpRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_for_backoff: default_base_for_backoff(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_secs: default_max_backoff(),
            jitter: JitterSetting::default(),
        }
    }
}

impl HttpRetryConfig {
    /// A policy that never retries. Used by tests against mock servers.
    pub fn no_retries() -> Self {
        Self { max_retries: 0, ..Self::default() }
    }
}
