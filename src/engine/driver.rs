//! Binds a [`Countdown`] to its store, clock, audio sink and expiry callback

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::countdown::{Countdown, Effect, Phase};
use crate::{
    audio::{play_best_effort, AudioCue},
    clock::Clock,
    error::{validate_key, Result},
    state::{CountdownDuration, CountdownSnapshot},
    store::DeadlineStore,
};

/// Host hook invoked once when a countdown hits zero
pub type ExpireCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Collaborators shared by every mounted countdown
#[derive(Clone)]
pub struct EngineContext {
    pub store: Arc<dyn DeadlineStore>,
    pub clock: Arc<dyn Clock>,
    pub audio: Arc<dyn AudioCue>,
}

/// A mounted countdown that runs its own effects
pub struct CountdownDriver {
    countdown: Countdown,
    context: EngineContext,
    on_expire: Option<ExpireCallback>,
}

impl CountdownDriver {
    /// Resume the stored deadline for `key`, or start a new one of `duration`
    pub fn mount(
        key: &str,
        duration: CountdownDuration,
        context: EngineContext,
        on_expire: Option<ExpireCallback>,
    ) -> Result<Self> {
        validate_key(key)?;
        let now = context.clock.now();
        let deadline = context.store.get_or_create(key, duration, now);
        info!(
            "Mounted timer {} with {}s remaining",
            key,
            deadline.remaining_seconds(now)
        );

        Ok(Self {
            countdown: Countdown::new(key, deadline),
            context,
            on_expire,
        })
    }

    pub fn key(&self) -> &str {
        self.countdown.key()
    }

    pub fn phase(&self) -> Phase {
        self.countdown.phase()
    }

    pub fn is_expired(&self) -> bool {
        self.countdown.is_expired()
    }

    pub fn peek(&self) -> CountdownSnapshot {
        self.countdown.peek(self.context.clock.now())
    }

    /// Run one tick: recompute, fire effects, return the digits to show
    pub fn step(&mut self) -> CountdownSnapshot {
        let now = self.context.clock.now();
        let tick = self.countdown.tick(now);
        for effect in &tick.effects {
            self.apply(*effect);
        }
        tick.snapshot
    }

    pub fn dismiss(&mut self) -> CountdownSnapshot {
        if let Some(modal) = self.countdown.dismiss() {
            debug!("Timer {} dismissed {:?} modal", self.key(), modal);
        }
        self.peek()
    }

    fn apply(&self, effect: Effect) {
        let key = self.countdown.key();
        match effect {
            Effect::ShowWarning => {
                warn!("Timer {} reached the warning threshold, lockdown imminent", key);
            }
            Effect::EnterFinalCountdown => {
                info!("Timer {} entered final countdown", key);
            }
            Effect::Flash { second } => {
                debug!("Timer {} final countdown: {}", key, second);
            }
            Effect::Play(cue) => play_best_effort(self.context.audio.as_ref(), cue),
            Effect::Expire => {
                info!("Timer {} expired", key);
                self.context.store.clear(key);
                if let Some(callback) = &self.on_expire {
                    callback(key);
                }
            }
        }
    }
}
