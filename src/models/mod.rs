//! This module contains the data models for the railwatch application.

pub mod channel;
pub mod entity;
pub mod event;
pub mod message;
pub mod preferences;
pub mod rate_window;
pub mod time_window;

pub use channel::{ChannelConfig, ChannelTypeConfig, Destination, DestinationKind};
pub use entity::{EntityAttributes, EntityId, KnownSet, Snapshot};
pub use event::{EntityType, EventCategory, NotificationEvent, RunningStatus};
pub use message::{MessageFormat, RenderedMessage};
pub use preferences::NotificationPreferences;
pub use rate_window::RateWindowState;
pub use time_window::TimeWindow;
