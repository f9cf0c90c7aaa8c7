/// Utilities for date and time formatting
///
/// Timestamps are kept in UTC and shifted to the browser's zone only for display.
use chrono::{DateTime, Duration, Utc};

/// Browser zone offset east of UTC, in minutes.
pub fn local_offset_minutes() -> i64 {
    -(js_sys::Date::new_0().get_timezone_offset() as i64)
}

/// Format a UTC instant as HH:MM for a zone `offset_minutes` east of UTC
/// Example: 06:05Z with +480 -> "14:05"
pub fn format_clock(instant: DateTime<Utc>, offset_minutes: i64) -> String {
    (instant + Duration::minutes(offset_minutes))
        .format("%H:%M")
        .to_string()
}

/// Format a UTC instant as YYYY-MM-DD HH:MM in the given zone
pub fn format_datetime(instant: DateTime<Utc>, offset_minutes: i64) -> String {
    (instant + Duration::minutes(offset_minutes))
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// HH:MM in the browser's zone.
pub fn local_clock(instant: DateTime<Utc>) -> String {
    format_clock(instant, local_offset_minutes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_clock() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 15, 6, 5, 0).unwrap();
        assert_eq!(format_clock(instant, 480), "14:05");
        assert_eq!(format_clock(instant, 0), "06:05");
        assert_eq!(format_clock(instant, -420), "23:05");
    }

    #[test]
    fn test_format_datetime_crosses_midnight() {
        let instant = Utc.with_ymd_and_hms(2024, 12, 31, 20, 30, 0).unwrap();
        assert_eq!(format_datetime(instant, 480), "2025-01-01 04:30");
    }
}
