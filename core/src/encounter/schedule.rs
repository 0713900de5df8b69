//! Daily spawn schedules
//!
//! A schedule is a set of local times of day in one IANA zone. The next
//! spawn is the earliest of those times strictly after "now", evaluated in
//! the schedule's zone so DST shifts move with the local clock.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub times: Vec<NaiveTime>,
    pub zone: Tz,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            times: Vec::new(),
            zone: Tz::UTC,
        }
    }
}

impl Schedule {
    /// Parse raw settings. Bad times are skipped and a bad zone falls back
    /// to `default_zone`, each with a warning.
    pub fn parse(encounter: &str, times: &[String], zone: Option<&str>, default_zone: Tz) -> Self {
        let zone = match zone {
            None => default_zone,
            Some(name) => match name.parse::<Tz>() {
                Ok(tz) => tz,
                Err(_) => {
                    warn!(encounter, zone = name, fallback = default_zone.name(), "Invalid timezone");
                    default_zone
                }
            },
        };

        let mut parsed = Vec::with_capacity(times.len());
        for raw in times {
            match parse_time_of_day(raw) {
                Some(t) => parsed.push(t),
                None => warn!(encounter, time = %raw, "Skipping unparsable schedule time"),
            }
        }
        parsed.sort();
        parsed.dedup();

        Self {
            times: parsed,
            zone,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Earliest configured instant strictly after `now`. A time equal to now
    /// counts as passed.
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.times
            .iter()
            .filter_map(|t| next_occurrence(*t, self.zone, now))
            .min()
    }
}

/// `HH:MM` or `HH:MM:SS`
pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .ok()
}

fn next_occurrence(time: NaiveTime, zone: Tz, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let today = now.with_timezone(&zone).date_naive();
    // Today, tomorrow, and one more day in case tomorrow's time falls in a DST gap
    (0..3).find_map(|offset| {
        let date = today.checked_add_days(Days::new(offset))?;
        local_instant(zone, date, time).filter(|candidate| *candidate > now)
    })
}

/// Resolve a local wall-clock time. Ambiguous times (DST fall-back) take the
/// earlier instant; nonexistent ones (spring-forward gap) yield `None`.
fn local_instant(zone: Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    zone.from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}
