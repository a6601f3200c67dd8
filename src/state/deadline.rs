//! Deadline, duration and time-left decomposition

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CountdownError, Result};

/// A validated, strictly positive countdown length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct CountdownDuration(u64);

impl CountdownDuration {
    pub fn from_secs(seconds: u64) -> Result<Self> {
        if seconds == 0 {
            return Err(CountdownError::InvalidDuration(seconds));
        }
        Ok(Self(seconds))
    }

    pub fn as_secs(self) -> u64 {
        self.0
    }

    pub fn to_chrono(self) -> Duration {
        let seconds = i64::try_from(self.0).unwrap_or(i64::MAX).min(i64::MAX / 1000);
        Duration::seconds(seconds)
    }
}

impl TryFrom<u64> for CountdownDuration {
    type Error = CountdownError;

    fn try_from(seconds: u64) -> Result<Self> {
        Self::from_secs(seconds)
    }
}

impl From<CountdownDuration> for u64 {
    fn from(duration: CountdownDuration) -> Self {
        duration.0
    }
}

/// The absolute moment a countdown reaches zero
///
/// Fixed once created: reading it never moves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deadline {
    at: DateTime<Utc>,
}

impl Deadline {
    pub fn at(at: DateTime<Utc>) -> Self {
        Self { at }
    }

    /// Deadline `duration` after `now`
    pub fn starting_at(now: DateTime<Utc>, duration: CountdownDuration) -> Self {
        Self {
            at: now
                .checked_add_signed(duration.to_chrono())
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    pub fn deadline_at(&self) -> DateTime<Utc> {
        self.at
    }

    pub fn epoch_millis(&self) -> i64 {
        self.at.timestamp_millis()
    }

    /// A deadline at or before `now` is no longer usable
    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        self.at <= now
    }

    /// Whole seconds left, floored and clamped at zero
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u64 {
        let millis = (self.at - now).num_milliseconds().max(0);
        (millis / 1000) as u64
    }
}

/// Remaining time split for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLeft {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl TimeLeft {
    pub fn from_seconds(total: u64) -> Self {
        Self {
            hours: total / 3600,
            minutes: (total % 3600) / 60,
            seconds: total % 60,
        }
    }

    /// Two-digit, zero-padded display; hours may grow past two digits
    pub fn padded(&self) -> Digits {
        Digits {
            hours: format!("{:02}", self.hours),
            minutes: format!("{:02}", self.minutes),
            seconds: format!("{:02}", self.seconds),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digits {
    pub hours: String,
    pub minutes: String,
    pub seconds: String,
}

impl std::fmt::Display for Digits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.hours, self.minutes, self.seconds)
    }
}
