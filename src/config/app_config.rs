use std::{path::PathBuf, time::Duration};

use chrono::NaiveTime;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use url::Url;

use super::{
    BaseHttpClientConfig, HttpRetryConfig, deserialize_duration_from_minutes,
    deserialize_duration_from_seconds, deserialize_time_of_day,
};
use crate::models::{ChannelConfig, NotificationPreferences, TimeWindow};

fn default_known_set_path() -> PathBuf {
    PathBuf::from("data/known_trains.json")
}

fn default_id_field() -> String {
    "Train No.".to_string()
}

fn default_snapshot_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(300)
}

fn default_retry_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_reset_start() -> NaiveTime {
    NaiveTime::from_hms_opt(1, 0, 0).unwrap_or_default()
}

fn default_reset_duration() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_send_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_true() -> bool {
    true
}

/// Where and how the live snapshot is fetched.
#[derive(Debug, Deserialize, Clone)]
pub struct SnapshotSourceConfig {
    /// Endpoint returning the snapshot as a JSON array of row objects.
    pub url: Url,

    /// Column holding the train number.
    #[serde(default = "default_id_field")]
    pub id_field: String,

    /// Request timeout in seconds.
    #[serde(
        rename = "timeout_secs",
        default = "default_snapshot_timeout",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub timeout: Duration,
}

/// The daily window during which the known set is cleared.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ResetWindowConfig {
    /// Opening time, `HH:MM`.
    #[serde(default = "default_reset_start", deserialize_with = "deserialize_time_of_day")]
    pub start: NaiveTime,

    /// Window length in minutes.
    #[serde(
        rename = "duration_minutes",
        default = "default_reset_duration",
        deserialize_with = "deserialize_duration_from_minutes"
    )]
    pub duration: Duration,
}

impl Default for ResetWindowConfig {
    fn default() -> Self {
        Self { start: default_reset_start(), duration: default_reset_duration() }
    }
}

impl ResetWindowConfig {
    /// The window as a time-of-day range.
    pub fn window(&self) -> TimeWindow {
        let length = chrono::Duration::from_std(self.duration).unwrap_or(chrono::Duration::zero());
        TimeWindow::starting_at(self.start, length)
    }
}

/// Application configuration for railwatch.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// Path of the persisted known set.
    #[serde(default = "default_known_set_path")]
    pub known_set_path: PathBuf,

    /// Snapshot source settings.
    pub snapshot: SnapshotSourceConfig,

    /// Sleep between two successful poll iterations.
    #[serde(
        rename = "poll_interval_secs",
        default = "default_poll_interval",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub poll_interval: Duration,

    /// Sleep after a failed poll iteration.
    #[serde(
        rename = "retry_interval_secs",
        default = "default_retry_interval",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub retry_interval: Duration,

    /// Daily reset window.
    #[serde(default)]
    pub reset_window: ResetWindowConfig,

    /// Upper bound for a single send to one destination.
    #[serde(
        rename = "send_timeout_secs",
        default = "default_send_timeout",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub send_timeout: Duration,

    /// The maximum time in seconds to wait for graceful shutdown.
    #[serde(
        rename = "shutdown_timeout_secs",
        default = "default_shutdown_timeout",
        deserialize_with = "deserialize_duration_from_seconds"
    )]
    pub shutdown_timeout: Duration,

    /// Whether to announce startup on every channel.
    #[serde(default = "default_true")]
    pub startup_notice: bool,

    /// Configuration for HTTP client retry policies.
    #[serde(default)]
    pub http_retry_config: HttpRetryConfig,

    /// Configuration for the base HTTP client.
    #[serde(default)]
    pub http_base_config: BaseHttpClientConfig,

    /// Initial notification preferences.
    #[serde(default)]
    pub preferences: NotificationPreferences,

    /// Delivery channels.
    #[serde(default)]
    pub channels: Vec<ChannelConfig>,
}

impl AppConfig {
    /// Creates a new `AppConfig` by reading from the configuration directory.
    pub fn new(config_dir: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir_str = config_dir.unwrap_or("configs");
        let s = Config::builder()
            .add_source(File::with_name(&format!("{}/app.yaml", config_dir_str)))
            .add_source(
                Environment::with_prefix("RAILWATCH").prefix_separator("__").separator("__"),
            )
            .build()?;
        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChannelTypeConfig;

    const MINIMAL: &str = r#"
    snapshot:
      url: "http://localhost:8080/trains.json"
    "#;

    fn load(content: &str) -> AppConfig {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("app.yaml"), content).unwrap();
        AppConfig::new(Some(temp_dir.path().to_str().unwrap())).unwrap()
    }

    #[test]
    fn test_app_config_defaults() {
        let config = load(MINIMAL);
        assert_eq!(config.known_set_path, PathBuf::from("data/known_trains.json"));
        assert_eq!(config.snapshot.id_field, "Train No.");
        assert_eq!(config.snapshot.timeout, Duration::from_secs(30));
        assert_eq!(config.poll_interval, Duration::from_secs(300));
        assert_eq!(config.retry_interval, Duration::from_secs(60));
        assert_eq!(config.reset_window, ResetWindowConfig::default());
        assert_eq!(config.send_timeout, Duration::from_secs(15));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(30));
        assert!(config.startup_notice);
        assert_eq!(config.preferences, NotificationPreferences::default());
        assert!(config.channels.is_empty());
    }

    #[test]
    fn test_app_config_full_file() {
        let config = load(
            r#"
            known_set_path: "/var/lib/railwatch/known.json"
            snapshot:
              url: "http://localhost:8080/trains.json"
              timeout_secs: 5
            poll_interval_secs: 120
            reset_window:
              start: "02:30"
              duration_minutes: 10
            preferences:
              min_delay_minutes: 15
              quiet_hours:
                enabled: true
                start: "23:00"
                end: "05:00"
              entity_types:
                pass: false
            channels:
              - name: telegram-main
                telegram:
                  token: "123:abc"
                recipients: ["1001"]
                broadcast: "@railwatch"
            "#,
        );

        assert_eq!(config.poll_interval, Duration::from_secs(120));
        assert_eq!(config.snapshot.timeout, Duration::from_secs(5));
        let window = config.reset_window.window();
        assert!(window.contains(NaiveTime::from_hms_opt(2, 39, 0).unwrap()));
        assert!(!window.contains(NaiveTime::from_hms_opt(2, 40, 0).unwrap()));
        assert_eq!(config.preferences.min_delay_minutes, 15);
        assert!(config.preferences.quiet_hours.enabled);
        assert!(!config.preferences.allows_entity_type(crate::models::EntityType::Passenger));
        assert_eq!(config.channels.len(), 1);
        assert!(matches!(config.channels[0].config, ChannelTypeConfig::Telegram(_)));
        assert_eq!(config.channels[0].destinations().len(), 2);
    }

    #[test]
    fn test_app_config_missing_file_is_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(AppConfig::new(Some(temp_dir.path().to_str().unwrap())).is_err());
    }

    #[test]
    fn test_app_config_env_var_override() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("app.yaml"), MINIMAL).unwrap();

        unsafe {
            std::env::set_var("RAILWATCH__HTTP_BASE_CONFIG__MAX_IDLE_PER_HOST", "7");
        }
        let config = AppConfig::new(Some(temp_dir.path().to_str().unwrap())).unwrap();
        unsafe {
            std::env::remove_var("RAILWATCH__HTTP_BASE_CONFIG__MAX_IDLE_PER_HOST");
        }

        assert_eq!(config.http_base_config.max_idle_per_host, 7);
    }
}
