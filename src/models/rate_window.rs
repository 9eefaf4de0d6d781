//! Rolling one-hour notification accounting.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// State of the rolling rate window.
///
/// `count` never exceeds the configured maximum while the window is open.
/// The window restarts lazily at `(now, 0)` once more than
/// [`RateWindowState::LENGTH`] has passed since `window_start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateWindowState {
    /// Notifications counted in the current window.
    pub count: u32,
    /// When the current window opened.
    pub window_start: DateTime<Utc>,
}

impl RateWindowState {
    /// Length of one window.
    pub const LENGTH: Duration = Duration::hours(1);

    /// A fresh, empty window opening at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { count: 0, window_start: now }
    }

    /// Returns the state as seen at `now`, reopening the window if it has
    /// expired.
    pub fn refreshed(self, now: DateTime<Utc>) -> Self {
        if now - self.window_start > Self::LENGTH { Self::new(now) } else { self }
    }

    /// Counts one notification.
    pub fn consumed(self) -> Self {
        Self { count: self.count.saturating_add(1), ..self }
    }
}
