//! Utility functions and helpers

use chrono::{Local, NaiveDateTime};

/// Date format used for ticket departure times
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time, formatted for block timestamps
pub fn current_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// Format a ticket date-time
pub fn format_date_time(value: &NaiveDateTime) -> String {
    value.format(DATE_TIME_FORMAT).to_string()
}

/// Parse a ticket date-time, `None` if it does not match the format
pub fn parse_date_time(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), DATE_TIME_FORMAT).ok()
}

/// Serde adapter storing ticket date-times as formatted strings
pub mod date_time_format {
    use super::{format_date_time, parse_date_time};
    use chrono::NaiveDateTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_date_time(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_date_time(&raw).ok_or_else(|| D::Error::custom(format!("invalid date `{}`", raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_time_round_trip() {
        let parsed = parse_date_time("2023-11-02 08:15:00").unwrap();
        assert_eq!(format_date_time(&parsed), "2023-11-02 08:15:00");
    }

    #[test]
    fn test_rejects_other_formats() {
        assert!(parse_date_time("02/11/2023 08:15").is_none());
        assert!(parse_date_time("").is_none());
    }
}
