//! On-disk layout of a persisted deadline
//!
//! Two shapes are accepted when reading:
//!
//! ```text
//! {"endTime": "2024-06-01T14:00:00.000Z"}   // written by this crate
//! 1717250400000  or  "1717250400000"        // bare epoch milliseconds
//! ```
//!
//! Anything else is treated as if nothing were stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::Deadline;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineRecord {
    #[serde(rename = "endTime")]
    pub end_time: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRecord {
    Record(DeadlineRecord),
    Millis(i64),
    MillisText(String),
}

impl DeadlineRecord {
    pub fn from_deadline(deadline: Deadline) -> Self {
        Self {
            end_time: deadline.deadline_at(),
        }
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// Decode a stored value, `None` when it is not a deadline
pub fn parse_record(value: &Value) -> Option<Deadline> {
    let raw: RawRecord = serde_json::from_value(value.clone()).ok()?;
    let at = match raw {
        RawRecord::Record(record) => record.end_time,
        RawRecord::Millis(millis) => DateTime::from_timestamp_millis(millis)?,
        RawRecord::MillisText(text) => {
            let millis = text.trim().parse::<i64>().ok()?;
            DateTime::from_timestamp_millis(millis)?
        }
    };
    Some(Deadline::at(at))
}
