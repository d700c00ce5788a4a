//! In-memory store of every entity, mirroring the data file layout.
//!
//! The data file is one JSON object with four sections, each a mapping from
//! entity id to the entity:
//!
//! ```json
//! {
//!     "labels":   { "<id>": { ... } },
//!     "projects": { "<id>": { ... } },
//!     "tasks":    { "<id>": { ... } },
//!     "subtasks": { "<id>": { ... } }
//! }
//! ```
//!
//! Sections are [`IndexMap`]s so entities keep their insertion order through
//! a save/load cycle.

pub mod persistence;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{Label, Project, Subtask, Task};

/// Names of the sections every data document must contain.
pub const REQUIRED_SECTIONS: [&str; 4] = ["labels", "projects", "tasks", "subtasks"];

/// All entities, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataStore {
    #[serde(default)]
    pub labels: IndexMap<String, Label>,
    #[serde(default)]
    pub projects: IndexMap<String, Project>,
    #[serde(default)]
    pub tasks: IndexMap<String, Task>,
    #[serde(default)]
    pub subtasks: IndexMap<String, Subtask>,
}

impl DataStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entities per section.
    #[must_use]
    pub fn counts(&self) -> ItemCounts {
        ItemCounts {
            labels: self.labels.len(),
            projects: self.projects.len(),
            tasks: self.tasks.len(),
            subtasks: self.subtasks.len(),
        }
    }

    /// True when no section holds anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts().total() == 0
    }

    /// Re-key every section by the id stored inside the entity.
    ///
    /// Hand-edited files sometimes disagree between map key and `id`; the
    /// entity's own id wins. Entities without an id take their map key.
    /// When two entries end up with the same id the first one is kept.
    pub(crate) fn rekey(&mut self) {
        fn rekey_section<T>(
            kind: &str,
            section: &mut IndexMap<String, T>,
            id_of: impl Fn(&mut T) -> &mut String,
        ) {
            let entries = std::mem::take(section);
            for (key, mut entity) in entries {
                let id = id_of(&mut entity);
                if id.is_empty() {
                    *id = key;
                }
                let id = id.clone();
                if section.contains_key(&id) {
                    warn!("Dropping duplicate {} with id {}", kind, id);
                    continue;
                }
                section.insert(id, entity);
            }
        }

        rekey_section("label", &mut self.labels, |l| &mut l.id);
        rekey_section("project", &mut self.projects, |p| &mut p.id);
        rekey_section("task", &mut self.tasks, |t| &mut t.id);
        rekey_section("subtask", &mut self.subtasks, |s| &mut s.id);
    }

    // ------------------------------------------------------------------------
    // Relations
    // ------------------------------------------------------------------------

    /// Tasks whose `project_id` is `project_id`, in insertion order.
    pub fn tasks_of<'a, 'b>(
        &'a self,
        project_id: &'b str,
    ) -> impl Iterator<Item = &'a Task> + use<'a, 'b> {
        self.tasks.values().filter(move |t| t.project_id == project_id)
    }

    /// Subtasks whose `task_id` is `task_id`, in insertion order.
    pub fn subtasks_of<'a, 'b>(
        &'a self,
        task_id: &'b str,
    ) -> impl Iterator<Item = &'a Subtask> + use<'a, 'b> {
        self.subtasks.values().filter(move |s| s.task_id == task_id)
    }

    /// Re-derive a task's `completed` flag from its subtasks.
    ///
    /// A task with subtasks is complete exactly when all of them are. A task
    /// without subtasks keeps whatever flag it has. Returns true if the flag
    /// changed.
    pub fn sync_task_completion(&mut self, task_id: &str) -> bool {
        let mut total = 0usize;
        let mut done = 0usize;
        for subtask in self.subtasks_of(task_id) {
            total += 1;
            if subtask.completed {
                done += 1;
            }
        }
        if total == 0 {
            return false;
        }

        let all_done = done == total;
        match self.tasks.get_mut(task_id) {
            Some(task) if task.completed != all_done => {
                task.completed = all_done;
                task.touch();
                debug!(
                    "Task {} marked {} ({}/{} subtasks done)",
                    task_id,
                    if all_done { "complete" } else { "incomplete" },
                    done,
                    total
                );
                true
            }
            _ => false,
        }
    }
}

/// Per-section entity counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCounts {
    pub labels: usize,
    pub projects: usize,
    pub tasks: usize,
    pub subtasks: usize,
}

impl ItemCounts {
    /// Sum over all sections.
    #[must_use]
    pub fn total(&self) -> usize {
        self.labels + self.projects + self.tasks + self.subtasks
    }
}

impl std::fmt::Display for ItemCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} labels, {} projects, {} tasks, {} subtasks",
            self.labels, self.projects, self.tasks, self.subtasks
        )
    }
}
