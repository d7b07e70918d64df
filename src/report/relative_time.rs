use chrono::{DateTime, Utc};

const SECOND: i64 = 1000;
const MINUTE: i64 = 60 * SECOND;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;
const MONTH: i64 = 365 * DAY / 12;
const YEAR: i64 = 365 * DAY;

/// Largest unit first; milliseconds per unit.
const UNITS: [(&str, i64); 7] = [
    ("year", YEAR),
    ("month", MONTH),
    ("week", WEEK),
    ("day", DAY),
    ("hour", HOUR),
    ("minute", MINUTE),
    ("second", SECOND),
];

/// Turns timestamps into phrases like "3 days ago" or "in 2 hours".
/// Months and years use fixed average lengths.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelativeTimeFormatter;

impl RelativeTimeFormatter {
    pub fn format(timestamp: DateTime<Utc>) -> String {
        Self::format_from(timestamp, Utc::now())
    }

    pub fn format_from(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
        let diff = (timestamp - now).num_milliseconds();

        let (unit, millis) = UNITS
            .iter()
            .copied()
            .find(|(_, millis)| diff.abs() >= *millis)
            .unwrap_or(("second", SECOND));

        // Halves round toward positive infinity, so 2.5 days ago is "2 days ago"
        let value = (diff as f64 / millis as f64 + 0.5).floor() as i64;
        let magnitude = value.abs();
        let plural = if magnitude == 1 { "" } else { "s" };

        if diff < 0 {
            format!("{} {}{} ago", magnitude, unit, plural)
        } else {
            format!("in {} {}{}", magnitude, unit, plural)
        }
    }
}
