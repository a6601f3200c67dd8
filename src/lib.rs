//! Bunker Countdown - persisted countdown deadlines with staged effects
//! 
//! This library keeps one absolute deadline per named timer, persisted
//! across restarts, and ticks each mounted timer once per second. Hosts get
//! hours/minutes/seconds plus warning, final-countdown and expiry flags, and
//! an optional callback when a deadline runs out.

pub mod api;
pub mod audio;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod state;
pub mod store;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use engine::{Countdown, CountdownDriver, EngineContext};
pub use error::{CountdownError, Result};
pub use state::{AppState, CountdownDuration, CountdownSnapshot, Deadline};
pub use store::{DeadlineStore, FileStore, MemoryStore};
pub use utils::signals::shutdown_signal;
