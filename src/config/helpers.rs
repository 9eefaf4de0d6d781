use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serializer, de};
use std::time::Duration;

const TIME_OF_DAY_FORMAT: &str = "%H:%M";

/// Custom deserializer for Duration from milliseconds
pub fn deserialize_duration_from_ms<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let ms = u64::deserialize(deserializer)?;
    Ok(Duration::from_millis(ms))
}

/// Custom deserializer for Duration from seconds
pub fn deserialize_duration_from_seconds<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(secs))
}

/// Custom deserializer for Duration from minutes
pub fn deserialize_duration_from_minutes<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let minutes = u64::deserialize(deserializer)?;
    Ok(Duration::from_secs(minutes * 60))
}

/// Custom serializer for Duration to milliseconds
pub fn serialize_duration_to_ms<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Custom serializer for Duration to seconds
pub fn serialize_duration_to_seconds<S>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(duration.as_secs())
}

/// Custom serializer for Duration to minutes
pub fn serialize_duration_to_minutes<S>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(duration.as_secs() / 60)
}

/// Custom deserializer for a time of day written as `HH:MM`.
pub fn deserialize_time_of_day<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    NaiveTime::parse_from_str(s.trim(), TIME_OF_DAY_FORMAT).map_err(de::Error::custom)
}

/// Custom serializer for a time of day as `HH:MM`.
pub fn serialize_time_of_day<S>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&time.format(TIME_OF_DAY_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use serde_json;

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct TestDurationSecs {
        #[serde(
            deserialize_with = "deserialize_duration_from_seconds",
            serialize_with = "serialize_duration_to_seconds"
        )]
        duration: Duration,
    }

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct TestDurationMinutes {
        #[serde(
            deserialize_with = "deserialize_duration_from_minutes",
            serialize_with = "serialize_duration_to_minutes"
        )]
        duration: Duration,
    }

    #[derive(Debug, Deserialize, Serialize, PartialEq)]
    struct TestTimeOfDay {
        #[serde(
            deserialize_with = "deserialize_time_of_day",
            serialize_with = "serialize_time_of_day"
        )]
        at: NaiveTime,
    }

    #[test]
    fn test_deserialize_duration_from_seconds() {
        let json = r#"{"duration": 5}"#;
        let expected = TestDurationSecs {
            duration: Duration::from_secs(5),
        };
        let actual: TestDurationSecs = serde_json::from_str(json).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_serialize_duration_to_seconds() {
        let data = TestDurationSecs {
            duration: Duration::from_secs(5),
        };
        let actual = serde_json::to_string(&data).unwrap();
        assert_eq!(actual, r#"{"duration":5}"#);
    }

    #[test]
    fn test_duration_minutes_round_trip() {
        let actual: TestDurationMinutes = serde_json::from_str(r#"{"duration": 5}"#).unwrap();
        assert_eq!(actual.duration, Duration::from_secs(300));
        assert_eq!(serde_json::to_string(&actual).unwrap(), r#"{"duration":5}"#);
    }

    #[test]
    fn test_deserialize_time_of_day() {
        let actual: TestTimeOfDay = serde_json::from_str(r#"{"at": "01:05"}"#).unwrap();
        assert_eq!(actual.at, NaiveTime::from_hms_opt(1, 5, 0).unwrap());
        assert_eq!(serde_json::to_string(&actual).unwrap(), r#"{"at":"01:05"}"#);
    }

    #[test]
    fn test_deserialize_invalid_time_of_day() {
        let result: Result<TestTimeOfDay, _> = serde_json::from_str(r#"{"at": "25:00"}"#);
        assert!(result.is_err());
        let result: Result<TestTimeOfDay, _> = serde_json::from_str(r#"{"at": "noon"}"#);
        assert!(result.is_err());
    }
}
