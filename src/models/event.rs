//! Notification events produced by the detection and status passes.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::entity::EntityId;

/// Delay, in minutes, above which a train counts as running late.
pub const LATE_THRESHOLD_MINUTES: i64 = 5;

/// Delay, in minutes, at or below which a train counts as running early.
pub const EARLY_THRESHOLD_MINUTES: i64 = -5;

/// Classification of a notification event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    /// First sighting of an entity since the last reset.
    NewEntity,
    /// The entity moved to another station.
    StatusChange,
    /// The entity started running late.
    Delay,
    /// The entity started running early.
    EarlyArrival,
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventCategory::NewEntity => "new_entity",
            EventCategory::StatusChange => "status_change",
            EventCategory::Delay => "delay",
            EventCategory::EarlyArrival => "early_arrival",
        };
        f.write_str(name)
    }
}

/// The fixed vocabulary of train type tags preferences can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    /// Superfast (`SUF`).
    #[serde(rename = "suf")]
    Superfast,
    /// Mail/express (`MEX`).
    #[serde(rename = "mex")]
    MailExpress,
    /// Vande Bharat (`VNDB`).
    #[serde(rename = "vndb")]
    VandeBharat,
    /// Passenger (`PASS`).
    #[serde(rename = "pass")]
    Passenger,
}

impl EntityType {
    /// Parses a tag as it appears in the source table.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "SUF" => Some(EntityType::Superfast),
            "MEX" => Some(EntityType::MailExpress),
            "VNDB" => Some(EntityType::VandeBharat),
            "PASS" => Some(EntityType::Passenger),
            _ => None,
        }
    }

    /// The tag as shown in messages.
    pub fn tag(&self) -> &'static str {
        match self {
            EntityType::Superfast => "SUF",
            EntityType::MailExpress => "MEX",
            EntityType::VandeBharat => "VNDB",
            EntityType::Passenger => "PASS",
        }
    }
}

/// Running status derived from a signed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunningStatus {
    /// Within the on-time band.
    OnTime,
    /// Later than [`LATE_THRESHOLD_MINUTES`].
    Late,
    /// At least as early as [`EARLY_THRESHOLD_MINUTES`].
    Early,
}

impl RunningStatus {
    /// Classifies a delay in minutes.
    pub fn from_delay(minutes: i64) -> Self {
        if minutes > LATE_THRESHOLD_MINUTES {
            RunningStatus::Late
        } else if minutes <= EARLY_THRESHOLD_MINUTES {
            RunningStatus::Early
        } else {
            RunningStatus::OnTime
        }
    }
}

/// A single notification candidate flowing through the policy and dispatch
/// pipeline. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    /// What happened.
    pub category: EventCategory,
    /// Which entity it happened to.
    pub entity_id: EntityId,
    /// Signed delay in minutes, when known.
    pub delay_minutes: Option<i64>,
    /// Type tag, when derivable from the attributes.
    pub entity_type: Option<EntityType>,
}

impl NotificationEvent {
    /// Creates an event with no delay or type information.
    pub fn new(category: EventCategory, entity_id: EntityId) -> Self {
        Self { category, entity_id, delay_minutes: None, entity_type: None }
    }

    /// Sets the delay.
    pub fn with_delay(mut self, delay_minutes: Option<i64>) -> Self {
        self.delay_minutes = delay_minutes;
        self
    }

    /// Sets the type tag.
    pub fn with_entity_type(mut self, entity_type: Option<EntityType>) -> Self {
        self.entity_type = entity_type;
        self
    }
}
