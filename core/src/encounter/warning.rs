//! Pre-spawn countdown
//!
//! A warning is bound to one scheduled spawn time. Each tick compares the
//! remaining seconds against the previous tick, so a minute mark is announced
//! once even when ticks are late or skipped.

use chrono::{DateTime, Utc};

use super::definition::BroadcastSettings;
use crate::world::{Announcement, Broadcaster, Channels};

/// Seconds before spawn at which the progress bar appears
pub const PROGRESS_BAR_SECS: i64 = 60;

#[derive(Debug, Clone)]
pub struct SpawnWarning {
    encounter: String,
    mob: String,
    target: DateTime<Utc>,
    /// Remaining seconds seen by the previous tick
    last_remaining: i64,
    bar_shown: bool,
    finished: bool,
}

impl SpawnWarning {
    pub fn start(encounter: &str, mob: &str, target: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            encounter: encounter.to_string(),
            mob: mob.to_string(),
            target,
            // One past the real value so a mark hit exactly on the first tick counts
            last_remaining: (target - now).num_seconds().saturating_add(1),
            bar_shown: false,
            finished: false,
        }
    }

    pub fn target(&self) -> DateTime<Utc> {
        self.target
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn tick<B>(&mut self, settings: &BroadcastSettings, now: DateTime<Utc>, out: &mut B)
    where
        B: Broadcaster + ?Sized,
    {
        if self.finished {
            return;
        }
        let remaining = (self.target - now).num_seconds();
        if remaining <= 0 {
            self.stop(out);
            return;
        }

        // Several marks crossed in one tick collapse to the nearest one
        let crossed = settings
            .warning_minutes
            .iter()
            .copied()
            .filter(|&minutes| {
                let mark = i64::from(minutes) * 60;
                self.last_remaining > mark && remaining <= mark
            })
            .min();
        let channels = Channels {
            chat: settings.warning_chat,
            title: settings.warning_title,
        };
        if let Some(minutes) = crossed
            && channels.any()
        {
            out.announce(Announcement::SpawnWarning {
                encounter: self.encounter.clone(),
                mob: self.mob.clone(),
                minutes,
                channels,
            });
        }

        if settings.warning_progress_bar && remaining <= PROGRESS_BAR_SECS {
            if !self.bar_shown {
                self.bar_shown = true;
                out.announce(Announcement::CountdownShown {
                    encounter: self.encounter.clone(),
                    mob: self.mob.clone(),
                });
            }
            out.announce(Announcement::CountdownProgress {
                encounter: self.encounter.clone(),
                progress: remaining as f64 / PROGRESS_BAR_SECS as f64,
                seconds_remaining: remaining,
            });
        }

        self.last_remaining = remaining;
    }

    /// End the countdown, hiding the bar if it was shown. Idempotent.
    pub fn stop<B>(&mut self, out: &mut B)
    where
        B: Broadcaster + ?Sized,
    {
        if self.bar_shown {
            self.bar_shown = false;
            out.announce(Announcement::CountdownHidden {
                encounter: self.encounter.clone(),
            });
        }
        self.finished = true;
    }
}
