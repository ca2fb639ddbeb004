//! Wall-clock times of day (`HH:MM` or `HH:MM:SS`).

use chrono::NaiveTime;

/// Canonical rendering used in response bodies and stored documents.
pub const CLOCK_TIME_FORMAT: &str = "%H:%M:%S";

/// Parse a time of day written as `HH:MM` or `HH:MM:SS`.
///
/// # Examples
/// ```
/// use backend::domain::parse_clock_time;
///
/// assert!(parse_clock_time("09:00").is_some());
/// assert!(parse_clock_time("18:30:15").is_some());
/// assert!(parse_clock_time("25:00").is_none());
/// ```
pub fn parse_clock_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, CLOCK_TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

/// Render a time of day in [`CLOCK_TIME_FORMAT`].
pub fn format_clock_time(time: NaiveTime) -> String {
    time.format(CLOCK_TIME_FORMAT).to_string()
}

/// Serde adapter for optional clock times inside stored documents.
pub mod optional_clock_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as _};

    use super::{format_clock_time, parse_clock_time};

    pub fn serialize<S>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(time) => serializer.serialize_str(&format_clock_time(*time)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|text| {
            parse_clock_time(&text)
                .ok_or_else(|| D::Error::custom(format!("invalid time of day: {text}")))
        })
        .transpose()
    }
}
