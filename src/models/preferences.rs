//! User-facing notification preferences.

use std::collections::HashMap;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::{
    event::{EntityType, EventCategory},
    time_window::TimeWindow,
};
use crate::config::{deserialize_time_of_day, serialize_time_of_day};

fn default_true() -> bool {
    true
}

fn default_min_delay_minutes() -> i64 {
    10
}

fn default_max_notifications_per_hour() -> u32 {
    20
}

fn default_quiet_start() -> NaiveTime {
    NaiveTime::from_hms_opt(22, 0, 0).unwrap_or_default()
}

fn default_quiet_end() -> NaiveTime {
    NaiveTime::from_hms_opt(6, 0, 0).unwrap_or_default()
}

/// Per-category on/off switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryToggles {
    /// Notify when a train first appears.
    #[serde(default = "default_true")]
    pub new_entity: bool,
    /// Notify when a train moves to another station.
    #[serde(default = "default_true")]
    pub status_change: bool,
    /// Notify when a train starts running late.
    #[serde(default = "default_true")]
    pub delay: bool,
    /// Notify when a train starts running early.
    #[serde(default = "default_true")]
    pub early_arrival: bool,
}

impl Default for CategoryToggles {
    fn default() -> Self {
        Self { new_entity: true, status_change: true, delay: true, early_arrival: true }
    }
}

impl CategoryToggles {
    /// Returns the switch for `category`.
    pub fn is_enabled(&self, category: EventCategory) -> bool {
        match category {
            EventCategory::NewEntity => self.new_entity,
            EventCategory::StatusChange => self.status_change,
            EventCategory::Delay => self.delay,
            EventCategory::EarlyArrival => self.early_arrival,
        }
    }
}

/// Daily period during which nothing is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHours {
    /// Whether quiet hours apply at all.
    #[serde(default)]
    pub enabled: bool,
    /// Start of the quiet period, `HH:MM`.
    #[serde(
        default = "default_quiet_start",
        deserialize_with = "deserialize_time_of_day",
        serialize_with = "serialize_time_of_day"
    )]
    pub start: NaiveTime,
    /// End of the quiet period, `HH:MM`, exclusive.
    #[serde(
        default = "default_quiet_end",
        deserialize_with = "deserialize_time_of_day",
        serialize_with = "serialize_time_of_day"
    )]
    pub end: NaiveTime,
}

impl Default for QuietHours {
    fn default() -> Self {
        Self { enabled: false, start: default_quiet_start(), end: default_quiet_end() }
    }
}

impl QuietHours {
    /// The configured window, regardless of `enabled`.
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start, self.end)
    }

    /// Returns `true` if quiet hours are on and `time` falls inside them.
    pub fn is_quiet_at(&self, time: NaiveTime) -> bool {
        self.enabled && self.window().contains(time)
    }
}

/// The full preferences record owned by the eligibility policy.
///
/// Replaced wholesale on update, never mutated in place while a poll
/// iteration is running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    /// Category switches.
    #[serde(default)]
    pub categories: CategoryToggles,
    /// Per-type switches. A type absent from the map is allowed.
    #[serde(default)]
    pub entity_types: HashMap<EntityType, bool>,
    /// Minimum delay, in minutes, for a `delay` event to be sent.
    #[serde(default = "default_min_delay_minutes")]
    pub min_delay_minutes: i64,
    /// Cap on notifications per rolling hour.
    #[serde(default = "default_max_notifications_per_hour")]
    pub max_notifications_per_hour: u32,
    /// Quiet hours.
    #[serde(default)]
    pub quiet_hours: QuietHours,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            categories: CategoryToggles::default(),
            entity_types: HashMap::new(),
            min_delay_minutes: default_min_delay_minutes(),
            max_notifications_per_hour: default_max_notifications_per_hour(),
            quiet_hours: QuietHours::default(),
        }
    }
}

impl NotificationPreferences {
    /// Returns `false` only when the type is listed and switched off.
    pub fn allows_entity_type(&self, entity_type: EntityType) -> bool {
        self.entity_types.get(&entity_type).copied().unwrap_or(true)
    }
}
