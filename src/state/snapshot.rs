//! Render data published to the host on every tick

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::deadline::{Deadline, Digits, TimeLeft};

/// Modal the host should currently display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modal {
    /// "Lockdown imminent" prompt shown at thirty seconds
    Warning,
    /// Terminal prompt offering restart or return
    TimeUp,
}

/// Everything a host needs to draw one countdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountdownSnapshot {
    pub key: String,
    pub deadline_at: DateTime<Utc>,
    pub remaining_seconds: u64,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub display: Digits,
    pub is_warning_active: bool,
    pub is_final_countdown_active: bool,
    pub is_expired: bool,
    /// Flash/glitch treatment, on for every tick at or under ten seconds
    pub is_glitching: bool,
    /// Large overlay numeral during the final countdown
    pub countdown_number: Option<u64>,
    pub modal: Option<Modal>,
}

impl CountdownSnapshot {
    /// Plain display-only snapshot, no effects active
    pub fn running(key: &str, deadline: Deadline, remaining_seconds: u64) -> Self {
        let left = TimeLeft::from_seconds(remaining_seconds);
        Self {
            key: key.to_string(),
            deadline_at: deadline.deadline_at(),
            remaining_seconds,
            hours: left.hours,
            minutes: left.minutes,
            seconds: left.seconds,
            display: left.padded(),
            is_warning_active: false,
            is_final_countdown_active: false,
            is_expired: false,
            is_glitching: false,
            countdown_number: None,
            modal: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn serializes_with_host_field_names() {
        let deadline = Deadline::at(Utc.with_ymd_and_hms(2024, 1, 1, 2, 0, 0).unwrap());
        let snapshot = CountdownSnapshot::running("timerState", deadline, 3661);
        let json = serde_json::to_value(&snapshot).unwrap();

        assert_eq!(json["isWarningActive"], false);
        assert_eq!(json["isFinalCountdownActive"], false);
        assert_eq!(json["isExpired"], false);
        assert_eq!(json["display"]["hours"], "01");
        assert_eq!(json["remainingSeconds"], 3661);
    }
}
