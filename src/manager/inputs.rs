//! Argument structs for create and update calls.
//!
//! `New*` structs carry everything needed to create an entity. `*Update`
//! structs are partial: a `None` field is left untouched. Fields that can be
//! cleared use `Option<Option<T>>`, where `Some(None)` clears the value.

use chrono::NaiveDate;

use crate::models::Priority;

#[derive(Debug, Clone, Default)]
pub struct NewLabel {
    pub name: String,
    pub color: Option<String>,
    pub text_color: Option<String>,
    pub description: Option<String>,
}

impl NewLabel {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LabelUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
    pub text_color: Option<String>,
    pub description: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub name: String,
    /// Defaults to `1.0.0` when empty.
    pub version: Option<String>,
    pub description: Option<String>,
    pub github_url: Option<String>,
}

impl NewProject {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<Option<String>>,
    pub github_url: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub completed: bool,
    /// Label ids; duplicates are dropped.
    pub labels: Vec<String>,
}

impl NewTask {
    #[must_use]
    pub fn new(project_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            title: title.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<NaiveDate>>,
    pub completed: Option<bool>,
    pub labels: Option<Vec<String>>,
}

impl TaskUpdate {
    /// An update that only sets the completion flag.
    #[must_use]
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewSubtask {
    pub task_id: String,
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub completed: bool,
    pub labels: Vec<String>,
}

impl NewSubtask {
    #[must_use]
    pub fn new(task_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            title: title.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubtaskUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<NaiveDate>>,
    pub completed: Option<bool>,
    pub labels: Option<Vec<String>>,
}

impl SubtaskUpdate {
    /// An update that only sets the completion flag.
    #[must_use]
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Default::default()
        }
    }
}
