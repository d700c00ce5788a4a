//! Projects and their derived status.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version assigned to projects created without one.
pub const DEFAULT_PROJECT_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default = "super::now", with = "super::timestamp_serde")]
    pub created_at: NaiveDateTime,
    #[serde(default = "super::now", with = "super::timestamp_serde")]
    pub updated_at: NaiveDateTime,
    /// Task ids in display order.
    #[serde(default)]
    pub tasks: Vec<String>,
}

fn default_version() -> String {
    DEFAULT_PROJECT_VERSION.to_string()
}

impl Project {
    /// Create a project with a fresh id and no tasks.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = super::now();
        Self {
            id: super::new_id(),
            name: name.into(),
            version: default_version(),
            description: None,
            github_url: None,
            created_at: now,
            updated_at: now,
            tasks: Vec::new(),
        }
    }

    /// Record that the project changed.
    pub fn touch(&mut self) {
        self.updated_at = super::now();
    }

    /// Append a task reference unless it is already listed.
    pub fn attach_task(&mut self, task_id: &str) {
        if !self.tasks.iter().any(|t| t == task_id) {
            self.tasks.push(task_id.to_string());
        }
    }

    /// Drop a task reference. Returns true if it was listed.
    pub fn detach_task(&mut self, task_id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t != task_id);
        self.tasks.len() != before
    }
}

/// Coarse project state derived from its progress percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    NotStarted,
    Started,
    Active,
    InProgress,
    Completed,
}

impl ProjectStatus {
    /// Classify a progress percentage in `0.0..=100.0`.
    #[must_use]
    pub fn from_progress(progress: f64) -> Self {
        if progress >= 100.0 {
            ProjectStatus::Completed
        } else if progress > 70.0 {
            ProjectStatus::InProgress
        } else if progress > 30.0 {
            ProjectStatus::Active
        } else if progress > 0.0 {
            ProjectStatus::Started
        } else {
            ProjectStatus::NotStarted
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectStatus::NotStarted => write!(f, "Not Started"),
            ProjectStatus::Started => write!(f, "Started"),
            ProjectStatus::Active => write!(f, "Active"),
            ProjectStatus::InProgress => write!(f, "In Progress"),
            ProjectStatus::Completed => write!(f, "Completed"),
        }
    }
}
