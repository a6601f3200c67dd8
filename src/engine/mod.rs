//! Countdown engine
//!
//! `countdown` holds the pure state machine; `driver` wires it to storage,
//! the clock, audio and the host's expiry hook.

pub mod countdown;
pub mod driver;

pub use countdown::{Countdown, Effect, Phase, Tick, FINAL_COUNTDOWN_AT_SECS, WARNING_AT_SECS};
pub use driver::{CountdownDriver, EngineContext, ExpireCallback};
