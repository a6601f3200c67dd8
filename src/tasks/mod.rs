//! Background tasks module
//! 
//! This module contains the per-timer ticker tasks spawned by the host.

pub mod countdown_ticker;

// Re-export main functions
pub use countdown_ticker::{countdown_ticker_task, TickerControl};
