//! Owned timer state for encounter instances
//!
//! Timers are plain values polled by the tick driver, never callbacks, so a
//! cancelled timer cannot fire late and cancelling twice is harmless.

use chrono::{DateTime, TimeDelta, Utc};

/// `now + secs`, saturating at the far future
pub fn after_secs(now: DateTime<Utc>, secs: u64) -> DateTime<Utc> {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerHandle {
    /// Never armed, or a one-shot that already fired
    #[default]
    NotStarted,
    Running {
        due: DateTime<Utc>,
        period: Option<TimeDelta>,
    },
    Cancelled,
}

impl TimerHandle {
    pub fn once(due: DateTime<Utc>) -> Self {
        Self::Running { due, period: None }
    }

    pub fn repeating(first_due: DateTime<Utc>, period: TimeDelta) -> Self {
        Self::Running {
            due: first_due,
            period: Some(period),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }

    pub fn due(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Running { due, .. } => Some(*due),
            _ => None,
        }
    }

    /// Stop a running timer. No-op otherwise.
    pub fn cancel(&mut self) {
        if self.is_running() {
            *self = Self::Cancelled;
        }
    }

    /// Returns true if the timer fired. Repeating timers fire at most once
    /// per poll and skip missed periods.
    pub fn poll(&mut self, now: DateTime<Utc>) -> bool {
        let Self::Running { due, period } = *self else {
            return false;
        };
        if now < due {
            return false;
        }
        *self = match period {
            Some(period) if period > TimeDelta::zero() => {
                let mut next = due + period;
                if next <= now {
                    next = now + period;
                }
                Self::Running {
                    due: next,
                    period: Some(period),
                }
            }
            _ => Self::NotStarted,
        };
        true
    }
}
