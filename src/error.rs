//! Error types for the countdown engine and its host

use thiserror::Error;

/// Errors surfaced by the countdown engine, the deadline store and the host registry
#[derive(Error, Debug)]
pub enum CountdownError {
    #[error("Invalid countdown duration: {0} seconds (must be positive)")]
    InvalidDuration(u64),

    #[error("Invalid timer key: {0:?}")]
    InvalidKey(String),

    #[error("No timer mounted under key: {0}")]
    TimerNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to lock {0}")]
    LockPoisoned(&'static str),
}

pub type Result<T> = std::result::Result<T, CountdownError>;

/// Validate a timer key: non-empty and not only whitespace
pub fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(CountdownError::InvalidKey(key.to_string()));
    }
    Ok(())
}
