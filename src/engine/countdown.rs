//! Countdown state machine
//!
//! Pure and clock-free: the caller passes `now` into [`Countdown::tick`] once
//! per second and gets back the render snapshot plus the effects to run.
//!
//! ## Phases
//!
//! ```text
//! Running (>30s) -> Warning (30s) -> FinalCountdown (10s..0s) -> Expired (0s)
//! ```
//!
//! Remaining time is recomputed from the fixed deadline on every tick, so a
//! late tick never causes drift. Each one-shot effect (warning, final entry,
//! expiry) fires at most once per deadline, however often `tick` is called.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    audio::Cue,
    state::{CountdownSnapshot, Deadline, Modal},
};

/// Remaining seconds at which the warning modal opens
pub const WARNING_AT_SECS: u64 = 30;
/// Remaining seconds at which the final countdown begins
pub const FINAL_COUNTDOWN_AT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Running,
    Warning,
    FinalCountdown,
    Expired,
}

/// Side effect requested by a tick, in the order it should run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Open the warning modal
    ShowWarning,
    /// Overlay goes up for the last ten seconds
    EnterFinalCountdown,
    /// Red flash and glitch for one second, overlay shows `second`
    Flash { second: u64 },
    Play(Cue),
    /// Clear the stored deadline and notify the host
    Expire,
}

#[derive(Debug, Clone)]
pub struct Tick {
    pub snapshot: CountdownSnapshot,
    pub effects: Vec<Effect>,
}

/// One mounted countdown
#[derive(Debug, Clone)]
pub struct Countdown {
    key: String,
    deadline: Deadline,
    last_remaining: Option<u64>,
    warning_fired: bool,
    final_fired: bool,
    expired: bool,
    modal: Option<Modal>,
}

impl Countdown {
    pub fn new(key: impl Into<String>, deadline: Deadline) -> Self {
        Self {
            key: key.into(),
            deadline,
            last_remaining: None,
            warning_fired: false,
            final_fired: false,
            expired: false,
            modal: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    pub fn phase(&self) -> Phase {
        if self.expired {
            Phase::Expired
        } else if self.final_fired || self.in_final_window() {
            Phase::FinalCountdown
        } else if self.warning_fired {
            Phase::Warning
        } else {
            Phase::Running
        }
    }

    /// Advance to `now` and report what changed
    pub fn tick(&mut self, now: DateTime<Utc>) -> Tick {
        if self.expired {
            return Tick {
                snapshot: self.snapshot_at(0),
                effects: Vec::new(),
            };
        }

        let remaining = self.deadline.remaining_seconds(now);
        let mut effects = Vec::new();

        if !self.warning_fired && self.reached(WARNING_AT_SECS, remaining) {
            self.warning_fired = true;
            self.modal = Some(Modal::Warning);
            effects.push(Effect::ShowWarning);
            effects.push(Effect::Play(Cue::Alarm));
        }

        if !self.final_fired && self.reached(FINAL_COUNTDOWN_AT_SECS, remaining) {
            self.final_fired = true;
            effects.push(Effect::EnterFinalCountdown);
            effects.push(Effect::Play(Cue::Alarm));
        }

        // Per-second effects cover the whole window, even when mounted inside it
        if remaining <= FINAL_COUNTDOWN_AT_SECS {
            effects.push(Effect::Play(Cue::Tick));
            effects.push(Effect::Flash { second: remaining });
        }

        if remaining == 0 {
            self.expired = true;
            self.modal = Some(Modal::TimeUp);
            effects.push(Effect::Play(Cue::Alarm));
            effects.push(Effect::Expire);
        }

        self.last_remaining = Some(remaining);
        Tick {
            snapshot: self.snapshot_at(remaining),
            effects,
        }
    }

    /// Snapshot without advancing or firing anything
    pub fn peek(&self, now: DateTime<Utc>) -> CountdownSnapshot {
        let remaining = if self.expired {
            0
        } else {
            self.deadline.remaining_seconds(now)
        };
        self.snapshot_at(remaining)
    }

    /// Close whichever modal is open; the countdown keeps going
    pub fn dismiss(&mut self) -> Option<Modal> {
        self.modal.take()
    }

    /// A threshold is reached on the exact second, or when the previous
    /// tick was above it and this one is below it
    fn reached(&self, threshold: u64, remaining: u64) -> bool {
        remaining == threshold
            || self
                .last_remaining
                .is_some_and(|previous| previous > threshold && remaining < threshold)
    }

    fn in_final_window(&self) -> bool {
        self.last_remaining
            .is_some_and(|remaining| remaining <= FINAL_COUNTDOWN_AT_SECS)
    }

    fn snapshot_at(&self, remaining: u64) -> CountdownSnapshot {
        let mut snapshot = CountdownSnapshot::running(&self.key, self.deadline, remaining);
        let in_final = remaining <= FINAL_COUNTDOWN_AT_SECS;

        snapshot.is_warning_active = self.modal == Some(Modal::Warning);
        snapshot.is_final_countdown_active = in_final && !self.expired;
        snapshot.is_expired = self.expired;
        snapshot.is_glitching = in_final;
        snapshot.countdown_number = in_final.then_some(remaining);
        snapshot.modal = self.modal;
        snapshot
    }
}
