//! Configuration and CLI argument handling

use std::path::PathBuf;

use clap::Parser;

use crate::{
    error::Result,
    state::CountdownDuration,
};

/// Storage key of the bunker access countdown
pub const BUNKER_TIMER_KEY: &str = "timerState";
/// Storage key of the services page purge countdown
pub const SERVICES_TIMER_KEY: &str = "countdownEndTime";

/// A timer the host mounts at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerPreset {
    pub key: &'static str,
    pub duration: CountdownDuration,
}

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "bunker-countdown")]
#[command(about = "Persisted countdown deadlines with a local HTTP host")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Path of the JSON file holding deadlines
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Keep deadlines in memory only; they reset on restart
    #[arg(long, conflicts_with = "store")]
    pub ephemeral: bool,

    /// Bunker access window in seconds
    #[arg(long, default_value = "7200")]
    pub bunker_window: u64,

    /// Services purge window in seconds
    #[arg(long, default_value = "86400")]
    pub services_window: u64,

    /// Disable audible cues
    #[arg(long)]
    pub mute: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Timers to mount on startup; fails on a zero-length window
    pub fn presets(&self) -> Result<Vec<TimerPreset>> {
        Ok(vec![
            TimerPreset {
                key: BUNKER_TIMER_KEY,
                duration: CountdownDuration::from_secs(self.bunker_window)?,
            },
            TimerPreset {
                key: SERVICES_TIMER_KEY,
                duration: CountdownDuration::from_secs(self.services_window)?,
            },
        ])
    }

    /// Reject settings the engine cannot run with, before anything starts
    pub fn validate(&self) -> Result<()> {
        self.presets().map(|_| ())
    }

    /// Deadline file location: `--store`, else the platform data directory
    pub fn store_path(&self) -> PathBuf {
        if let Some(path) = &self.store {
            return path.clone();
        }
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bunker-countdown")
            .join("deadlines.json")
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CountdownError;

    fn parse(args: &[&str]) -> Config {
        Config::try_parse_from(std::iter::once("bunker-countdown").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults_match_site_timers() {
        let config = parse(&[]);
        let presets = config.presets().unwrap();

        assert_eq!(presets[0].key, "timerState");
        assert_eq!(presets[0].duration.as_secs(), 2 * 3600);
        assert_eq!(presets[1].key, "countdownEndTime");
        assert_eq!(presets[1].duration.as_secs(), 24 * 3600);
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn zero_window_fails_validation() {
        let config = parse(&["--bunker-window", "0"]);
        assert!(matches!(
            config.validate(),
            Err(CountdownError::InvalidDuration(0))
        ));
    }

    #[test]
    fn explicit_store_path_wins() {
        let config = parse(&["--store", "/tmp/deadlines.json", "-v"]);
        assert_eq!(config.store_path(), PathBuf::from("/tmp/deadlines.json"));
        assert_eq!(config.log_level(), "debug");
    }

    #[test]
    fn ephemeral_conflicts_with_store() {
        let result = Config::try_parse_from([
            "bunker-countdown",
            "--ephemeral",
            "--store",
            "/tmp/x.json",
        ]);
        assert!(result.is_err());
    }
}
