//! Read-only encounter status for front ends

use bossfall_types::{Location, MobId};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Copy of an instance's state at one instant
#[derive(Debug, Clone, PartialEq)]
pub struct EncounterStatus {
    pub id: String,
    pub mob: String,
    pub zone: Tz,
    pub alive: bool,
    pub mob_identity: Option<MobId>,
    pub origin: Option<Location>,
    pub next_spawn: Option<DateTime<Utc>>,
    pub seconds_until_spawn: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub seconds_until_expiry: Option<i64>,
}

/// `H:MM:SS` when an hour or more, otherwise `M:SS`. Negative clamps to 0.
pub fn format_duration(secs: i64) -> String {
    let secs = secs.max(0);
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Wall-clock `HH:MM` of an instant in a zone
pub fn format_clock(instant: DateTime<Utc>, zone: Tz) -> String {
    instant.with_timezone(&zone).format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(65), "1:05");
        assert_eq!(format_duration(3600), "1:00:00");
        assert_eq!(format_duration(7384), "2:03:04");
        assert_eq!(format_duration(-5), "0:00");
    }

    #[test]
    fn test_format_clock() {
        let instant = DateTime::parse_from_rfc3339("2025-03-10T13:05:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(format_clock(instant, Tz::UTC), "13:05");
        assert_eq!(format_clock(instant, Tz::Asia__Ho_Chi_Minh), "20:05");
    }
}
