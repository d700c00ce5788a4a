//! Entity models stored in the smartpm data file.
//!
//! The four entity kinds are plain records linked by id:
//!
//! - [`Label`] - a colored tag referenced from tasks and subtasks
//! - [`Project`] - owns an ordered list of task ids
//! - [`Task`] - belongs to a project, owns an ordered list of subtask ids
//! - [`Subtask`] - belongs to a task
//!
//! The authoritative objects live in [`crate::store::DataStore`]; the id lists
//! on parents are references only.

pub mod label;
pub mod project;
pub mod task;

pub use label::Label;
pub use project::{Project, ProjectStatus};
pub use task::{Subtask, Task};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::SmartPmError;

/// Generate a fresh entity id.
#[must_use]
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current local wall-clock time, the timestamp format the data file uses.
#[must_use]
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Today's local date.
#[must_use]
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse a stored timestamp.
///
/// Accepts naive ISO-8601 (`2025-03-01T10:20:30.123456`), a space separated
/// variant, and RFC 3339 with an offset (converted to local time).
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(ts) = value.parse::<NaiveDateTime>() {
        return Some(ts);
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(ts);
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Local).naive_local())
}

/// Format a timestamp the way the data file stores it.
#[must_use]
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Parse a due date in `YYYY-MM-DD` form.
pub fn parse_due_date(value: &str) -> crate::Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| SmartPmError::invalid("due date", format!("'{value}' is not YYYY-MM-DD")))
}

/// Reject names and titles that are empty after trimming.
pub(crate) fn require_text(field: &str, value: &str) -> crate::Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SmartPmError::invalid(field, "is required"));
    }
    Ok(trimmed.to_string())
}

/// Empty descriptions are stored as absent.
pub(crate) fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ============================================================================
// Priority
// ============================================================================

/// Task and subtask priority. Stored as its number: 1 is the most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    High = 1,
    #[default]
    Medium = 2,
    Low = 3,
}

impl Priority {
    /// Human readable name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        priority as u8
    }
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Priority::High),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::Low),
            other => Err(format!("invalid priority {other}, expected 1, 2 or 3")),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Priority {
    type Err = SmartPmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "high" | "h" => Ok(Priority::High),
            "2" | "medium" | "m" => Ok(Priority::Medium),
            "3" | "low" | "l" => Ok(Priority::Low),
            _ => Err(SmartPmError::invalid(
                "priority",
                format!("'{s}'. Valid values: high, medium, low (or 1, 2, 3)"),
            )),
        }
    }
}

// ============================================================================
// Timestamp serialization
// ============================================================================

/// Serialize timestamps as naive ISO-8601, deserialize leniently via
/// [`parse_timestamp`]. A missing or unreadable value becomes "now".
pub(crate) mod timestamp_serde {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_timestamp(ts))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse_timestamp).unwrap_or_else(now))
    }
}

/// Optional variant of [`timestamp_serde`].
pub(crate) mod opt_timestamp_serde {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(ts: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match ts {
            Some(ts) => super::timestamp_serde::serialize(ts, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse_timestamp))
    }
}

/// Due dates are `YYYY-MM-DD`; empty strings and garbage read as no date.
pub(crate) mod due_date_serde {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(date) => serializer.serialize_str(&date.format("%Y-%m-%d").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.and_then(|s| {
            // Tolerate full timestamps by keeping the date part.
            let date_part = s.get(..10).unwrap_or(s.as_str());
            NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
        }))
    }
}
