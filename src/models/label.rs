//! Colored labels attached to tasks and subtasks.

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::error::SmartPmError;

/// Background color given to labels created without one.
pub const DEFAULT_LABEL_COLOR: &str = "#3498db";

/// Foreground color given to labels created without one.
pub const DEFAULT_TEXT_COLOR: &str = "#ffffff";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_text_color")]
    pub text_color: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "super::opt_timestamp_serde")]
    pub created_at: Option<NaiveDateTime>,
}

fn default_color() -> String {
    DEFAULT_LABEL_COLOR.to_string()
}

fn default_text_color() -> String {
    DEFAULT_TEXT_COLOR.to_string()
}

impl Label {
    /// Create a label with a fresh id and default colors.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: super::new_id(),
            name: name.into(),
            color: default_color(),
            text_color: default_text_color(),
            description: None,
            created_at: Some(super::now()),
        }
    }
}

fn hex_color_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid color regex"))
}

/// Validate a `#RRGGBB` color and normalize it to lowercase.
pub fn normalize_color(field: &str, value: &str) -> crate::Result<String> {
    let value = value.trim();
    if hex_color_regex().is_match(value) {
        Ok(value.to_lowercase())
    } else {
        Err(SmartPmError::invalid(
            field,
            format!("'{value}' is not a #RRGGBB hex color"),
        ))
    }
}
