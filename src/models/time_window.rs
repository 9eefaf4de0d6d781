//! Daily time-of-day windows (quiet hours, the reset window).

use chrono::{Duration, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::config::{deserialize_time_of_day, serialize_time_of_day};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// A half-open `[start, end)` window on the 24h clock.
///
/// When `start > end` the window wraps past midnight, so `22:00-06:00`
/// covers the night. `start == end` is an empty window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// First minute inside the window.
    #[serde(
        deserialize_with = "deserialize_time_of_day",
        serialize_with = "serialize_time_of_day"
    )]
    pub start: NaiveTime,
    /// First minute after the window.
    #[serde(
        deserialize_with = "deserialize_time_of_day",
        serialize_with = "serialize_time_of_day"
    )]
    pub end: NaiveTime,
}

impl TimeWindow {
    /// Creates a window from its bounds.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Creates a window of `length` starting at `start`, wrapping at
    /// midnight. Lengths of a day or more are clamped to just under a day.
    pub fn starting_at(start: NaiveTime, length: Duration) -> Self {
        let minutes = length.num_minutes().clamp(0, i64::from(MINUTES_PER_DAY - 1));
        let (end, _) = start.overflowing_add_signed(Duration::minutes(minutes));
        Self { start, end }
    }

    /// Returns `true` if `time` falls inside the window.
    pub fn contains(&self, time: NaiveTime) -> bool {
        let at = minute_of_day(time);
        let start = minute_of_day(self.start);
        let end = minute_of_day(self.end);
        if start <= end {
            start <= at && at < end
        } else {
            at >= start || at < end
        }
    }
}

fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn test_window_within_one_day() {
        let window = TimeWindow::new(t(1, 0), t(1, 5));
        assert!(window.contains(t(1, 0)));
        assert!(window.contains(t(1, 4)));
        assert!(!window.contains(t(1, 5)));
        assert!(!window.contains(t(0, 59)));
    }

    #[test]
    fn test_window_wrapping_midnight() {
        let window = TimeWindow::new(t(22, 0), t(6, 0));
        assert!(window.contains(t(23, 30)));
        assert!(window.contains(t(0, 0)));
        assert!(window.contains(t(5, 59)));
        assert!(!window.contains(t(6, 0)));
        assert!(!window.contains(t(10, 0)));
        assert!(window.contains(t(22, 0)));
    }

    #[test]
    fn test_empty_window() {
        let window = TimeWindow::new(t(8, 0), t(8, 0));
        assert!(!window.contains(t(8, 0)));
        assert!(!window.contains(t(12, 0)));
    }

    #[test]
    fn test_starting_at_wraps() {
        let window = TimeWindow::starting_at(t(23, 58), Duration::minutes(5));
        assert_eq!(window.end, t(0, 3));
        assert!(window.contains(t(0, 1)));
        assert!(!window.contains(t(0, 3)));
    }

    #[test]
    fn test_deserialize_from_strings() {
        let window: TimeWindow =
            serde_json::from_str(r#"{"start": "22:00", "end": "06:00"}"#).unwrap();
        assert_eq!(window, TimeWindow::new(t(22, 0), t(6, 0)));
    }
}
