//! Pre-built managers and data for consistent testing.

use std::path::PathBuf;

use tempfile::TempDir;

use crate::config::AppConfig;
use crate::manager::{NewLabel, NewProject, NewSubtask, NewTask, ProjectManager};

/// Open a manager on `data.json` inside a fresh temporary directory.
///
/// # Panics
///
/// Panics if the directory or the empty data file cannot be created.
#[must_use]
pub fn temp_manager() -> (TempDir, ProjectManager) {
    let dir = TempDir::new().expect("Failed to create temp directory");
    let manager = ProjectManager::open(dir.path().join("data.json"), AppConfig::default())
        .expect("Failed to open manager");
    (dir, manager)
}

/// Path of a file inside the fixture directory.
#[must_use]
pub fn fixture_path(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}

/// One project with a label and two tasks.
///
/// The first task has three open subtasks, the first of which carries the
/// label; the second task has no subtasks. The label is also on the first
/// task.
pub struct SeededProject {
    pub project_id: String,
    pub label_id: String,
    pub task_ids: Vec<String>,
    pub subtask_ids: Vec<String>,
}

impl SeededProject {
    /// Create the seeded entities through the manager.
    ///
    /// # Panics
    ///
    /// Panics if any create call fails.
    pub fn create(manager: &mut ProjectManager) -> Self {
        let label = manager
            .create_label(NewLabel::named("backend"))
            .expect("Failed to create label");
        let project = manager
            .create_project(NewProject::named("Seeded"))
            .expect("Failed to create project");

        let mut first = NewTask::new(&project.id, "Build API");
        first.labels = vec![label.id.clone()];
        let first = manager.create_task(first).expect("Failed to create task");
        let second = manager
            .create_task(NewTask::new(&project.id, "Write README"))
            .expect("Failed to create task");

        let mut subtask_ids = Vec::new();
        for (i, title) in ["Schema", "Handlers", "Tests"].into_iter().enumerate() {
            let mut input = NewSubtask::new(&first.id, title);
            if i == 0 {
                input.labels = vec![label.id.clone()];
            }
            let subtask = manager
                .create_subtask(input)
                .expect("Failed to create subtask");
            subtask_ids.push(subtask.id);
        }

        Self {
            project_id: project.id,
            label_id: label.id,
            task_ids: vec![first.id, second.id],
            subtask_ids,
        }
    }
}
