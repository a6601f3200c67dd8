//! State management module
//! 
//! Deadline values, the render snapshot handed to hosts, and the host-side
//! registry of mounted timers.

pub mod app_state;
pub mod deadline;
pub mod snapshot;

// Re-export main types
pub use app_state::AppState;
pub use deadline::{CountdownDuration, Deadline, Digits, TimeLeft};
pub use snapshot::{CountdownSnapshot, Modal};
