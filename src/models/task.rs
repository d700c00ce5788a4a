//! Tasks and subtasks.
//!
//! Both carry the same work-item fields; a task additionally belongs to a
//! project and lists its subtasks, a subtask belongs to a task.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::Priority;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: String,
    pub project_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, with = "super::due_date_serde")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub completed: bool,
    /// Label ids.
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default = "super::now", with = "super::timestamp_serde")]
    pub created_at: NaiveDateTime,
    #[serde(default = "super::now", with = "super::timestamp_serde")]
    pub updated_at: NaiveDateTime,
    /// Subtask ids in display order.
    #[serde(default)]
    pub subtasks: Vec<String>,
}

impl Task {
    /// Create an open task with a fresh id.
    #[must_use]
    pub fn new(project_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = super::now();
        Self {
            id: super::new_id(),
            project_id: project_id.into(),
            title: title.into(),
            description: None,
            priority: Priority::default(),
            due_date: None,
            completed: false,
            labels: Vec::new(),
            created_at: now,
            updated_at: now,
            subtasks: Vec::new(),
        }
    }

    /// Record that the task changed.
    pub fn touch(&mut self) {
        self.updated_at = super::now();
    }

    /// Past its due date and still open.
    #[must_use]
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        is_overdue(self.due_date, self.completed, today)
    }

    /// Append a subtask reference unless it is already listed.
    pub fn attach_subtask(&mut self, subtask_id: &str) {
        if !self.subtasks.iter().any(|s| s == subtask_id) {
            self.subtasks.push(subtask_id.to_string());
        }
    }

    /// Drop a subtask reference. Returns true if it was listed.
    pub fn detach_subtask(&mut self, subtask_id: &str) -> bool {
        let before = self.subtasks.len();
        self.subtasks.retain(|s| s != subtask_id);
        self.subtasks.len() != before
    }

    /// Drop a label reference. Returns true if it was present.
    pub fn remove_label(&mut self, label_id: &str) -> bool {
        remove_id(&mut self.labels, label_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    #[serde(default)]
    pub id: String,
    pub task_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, with = "super::due_date_serde")]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default = "super::now", with = "super::timestamp_serde")]
    pub created_at: NaiveDateTime,
    #[serde(default = "super::now", with = "super::timestamp_serde")]
    pub updated_at: NaiveDateTime,
}

impl Subtask {
    /// Create an open subtask with a fresh id.
    #[must_use]
    pub fn new(task_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = super::now();
        Self {
            id: super::new_id(),
            task_id: task_id.into(),
            title: title.into(),
            description: None,
            priority: Priority::default(),
            due_date: None,
            completed: false,
            labels: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = super::now();
    }

    #[must_use]
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        is_overdue(self.due_date, self.completed, today)
    }

    pub fn remove_label(&mut self, label_id: &str) -> bool {
        remove_id(&mut self.labels, label_id)
    }
}

fn is_overdue(due_date: Option<NaiveDate>, completed: bool, today: NaiveDate) -> bool {
    !completed && due_date.is_some_and(|due| due < today)
}

fn remove_id(ids: &mut Vec<String>, id: &str) -> bool {
    let before = ids.len();
    ids.retain(|existing| existing != id);
    ids.len() != before
}
