//! Configuration module for railwatch.

mod app_config;
mod helpers;
mod http_base;
mod http_retry;

pub use app_config::{AppConfig, ResetWindowConfig, SnapshotSourceConfig};
pub use helpers::{
    deserialize_duration_from_minutes, deserialize_duration_from_ms,
    deserialize_duration_from_seconds, deserialize_time_of_day, serialize_duration_to_minutes,
    serialize_duration_to_ms, serialize_duration_to_seconds, serialize_time_of_day,
};
pub use http_base::BaseHttpClientConfig;
pub use http_retry::{HttpRetryConfig, JitterSetting};
