//! CRUD over the entity store with save-on-mutation.
//!
//! The [`ProjectManager`] owns the in-memory [`DataStore`] and the path of the
//! data file it mirrors. Every mutating call validates its input, applies the
//! change together with its cascades, and rewrites the whole file before
//! returning. If validation or the write fails, the in-memory store is rolled
//! back so memory and disk never disagree.
//!
//! # Example
//!
//! ```rust,ignore
//! use smartpm::manager::{NewProject, NewTask, NewSubtask, ProjectManager};
//!
//! let mut manager = ProjectManager::open("data.json", AppConfig::default())?;
//! let project = manager.create_project(NewProject::named("Website"))?;
//! let task = manager.create_task(NewTask::new(&project.id, "Landing page"))?;
//! manager.create_subtask(NewSubtask::new(&task.id, "Hero image"))?;
//!
//! println!("{:.1}%", manager.get_project_progress(&project.id));
//! ```

pub mod inputs;
pub mod progress;

pub use inputs::{
    LabelUpdate, NewLabel, NewProject, NewSubtask, NewTask, ProjectUpdate, SubtaskUpdate,
    TaskUpdate,
};
pub use progress::{ProjectSummary, Statistics};

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::backup::{BackupInventory, BackupManager, CleanupReport, ClearReport};
use crate::config::AppConfig;
use crate::error::{Result, SmartPmError};
use crate::models::label::normalize_color;
use crate::models::{optional_text, require_text, Label, Project, Subtask, Task};
use crate::store::DataStore;
use crate::transfer::{self, ExportReport, ImportReport, ImportStrategy};

/// Owns the entity collections and keeps the data file in sync with them.
pub struct ProjectManager {
    /// Path of the JSON data file.
    data_file: PathBuf,

    /// Settings for export metadata and backups.
    config: AppConfig,

    /// Authoritative entity collections.
    store: DataStore,
}

impl ProjectManager {
    /// Open the store at `data_file`, creating an empty file if none exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed, or if the
    /// initial empty file cannot be written.
    pub fn open(data_file: impl AsRef<Path>, config: AppConfig) -> Result<Self> {
        let data_file = data_file.as_ref().to_path_buf();
        let store = DataStore::load(&data_file)?;

        let manager = Self {
            data_file,
            config,
            store,
        };

        if !manager.data_file.exists() {
            manager.store.save(&manager.data_file)?;
            info!("Created data file: {}", manager.data_file.display());
        }

        Ok(manager)
    }

    /// Re-read the data file, discarding the in-memory state.
    pub fn load_data(&mut self) -> Result<()> {
        self.store = DataStore::load(&self.data_file)?;
        debug!("Reloaded {}", self.store.counts());
        Ok(())
    }

    /// Path of the data file.
    #[must_use]
    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Read-only view of the whole store.
    #[must_use]
    pub fn store(&self) -> &DataStore {
        &self.store
    }

    // ------------------------------------------------------------------------
    // Labels
    // ------------------------------------------------------------------------

    /// Create a label.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty name, a malformed color, or a failed save.
    pub fn create_label(&mut self, input: NewLabel) -> Result<Label> {
        let mut label = Label::new(require_text("label name", &input.name)?);
        if let Some(color) = input.color {
            label.color = normalize_color("color", &color)?;
        }
        if let Some(text_color) = input.text_color {
            label.text_color = normalize_color("text color", &text_color)?;
        }
        label.description = optional_text(input.description);

        let created = label.clone();
        self.commit(|store| {
            store.labels.insert(label.id.clone(), label);
            Ok(())
        })?;
        info!("Created label '{}' ({})", created.name, created.id);
        Ok(created)
    }

    /// Look up a label by id.
    #[must_use]
    pub fn get_label(&self, id: &str) -> Option<&Label> {
        self.store.labels.get(id)
    }

    /// All labels in creation order.
    #[must_use]
    pub fn get_all_labels(&self) -> Vec<&Label> {
        self.store.labels.values().collect()
    }

    /// Apply a partial update to a label.
    pub fn update_label(&mut self, id: &str, update: LabelUpdate) -> Result<Label> {
        let name = update
            .name
            .as_deref()
            .map(|n| require_text("label name", n))
            .transpose()?;
        let color = update
            .color
            .as_deref()
            .map(|c| normalize_color("color", c))
            .transpose()?;
        let text_color = update
            .text_color
            .as_deref()
            .map(|c| normalize_color("text color", c))
            .transpose()?;

        self.commit(|store| {
            let label = store
                .labels
                .get_mut(id)
                .ok_or_else(|| SmartPmError::not_found("Label", id))?;
            if let Some(name) = name {
                label.name = name;
            }
            if let Some(color) = color {
                label.color = color;
            }
            if let Some(text_color) = text_color {
                label.text_color = text_color;
            }
            if let Some(description) = update.description {
                label.description = optional_text(description);
            }
            Ok(label.clone())
        })
    }

    /// Delete a label and strip its id from every task and subtask.
    ///
    /// Returns `false` if no label has this id.
    pub fn delete_label(&mut self, id: &str) -> Result<bool> {
        if !self.store.labels.contains_key(id) {
            return Ok(false);
        }

        let pruned = self.commit(|store| {
            store.labels.shift_remove(id);
            let mut pruned = 0usize;
            for task in store.tasks.values_mut() {
                if task.remove_label(id) {
                    task.touch();
                    pruned += 1;
                }
            }
            for subtask in store.subtasks.values_mut() {
                if subtask.remove_label(id) {
                    subtask.touch();
                    pruned += 1;
                }
            }
            Ok(pruned)
        })?;

        info!("Deleted label {} (removed from {} items)", id, pruned);
        Ok(true)
    }

    // ------------------------------------------------------------------------
    // Projects
    // ------------------------------------------------------------------------

    /// Create a project.
    pub fn create_project(&mut self, input: NewProject) -> Result<Project> {
        let mut project = Project::new(require_text("project name", &input.name)?);
        if let Some(version) = optional_text(input.version) {
            project.version = version;
        }
        project.description = optional_text(input.description);
        project.github_url = optional_text(input.github_url);

        let created = project.clone();
        self.commit(|store| {
            store.projects.insert(project.id.clone(), project);
            Ok(())
        })?;
        info!("Created project '{}' ({})", created.name, created.id);
        Ok(created)
    }

    #[must_use]
    pub fn get_project(&self, id: &str) -> Option<&Project> {
        self.store.projects.get(id)
    }

    /// All projects in creation order.
    #[must_use]
    pub fn get_all_projects(&self) -> Vec<&Project> {
        self.store.projects.values().collect()
    }

    /// Apply a partial update to a project and bump `updated_at`.
    pub fn update_project(&mut self, id: &str, update: ProjectUpdate) -> Result<Project> {
        let name = update
            .name
            .as_deref()
            .map(|n| require_text("project name", n))
            .transpose()?;
        let version = update
            .version
            .as_deref()
            .map(|v| require_text("version", v))
            .transpose()?;

        self.commit(|store| {
            let project = store
                .projects
                .get_mut(id)
                .ok_or_else(|| SmartPmError::not_found("Project", id))?;
            if let Some(name) = name {
                project.name = name;
            }
            if let Some(version) = version {
                project.version = version;
            }
            if let Some(description) = update.description {
                project.description = optional_text(description);
            }
            if let Some(github_url) = update.github_url {
                project.github_url = optional_text(github_url);
            }
            project.touch();
            Ok(project.clone())
        })
    }

    /// Delete a project together with its tasks and their subtasks.
    ///
    /// Returns `false` if no project has this id.
    pub fn delete_project(&mut self, id: &str) -> Result<bool> {
        if !self.store.projects.contains_key(id) {
            return Ok(false);
        }

        let (tasks, subtasks) = self.commit(|store| {
            let task_ids: Vec<String> = store.tasks_of(id).map(|t| t.id.clone()).collect();
            let subtasks_before = store.subtasks.len();
            store
                .subtasks
                .retain(|_, s| !task_ids.iter().any(|t| *t == s.task_id));
            store.tasks.retain(|_, t| t.project_id != id);
            store.projects.shift_remove(id);
            Ok((task_ids.len(), subtasks_before - store.subtasks.len()))
        })?;

        info!(
            "Deleted project {} with {} tasks and {} subtasks",
            id, tasks, subtasks
        );
        Ok(true)
    }

    // ------------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------------

    /// Create a task inside an existing project.
    ///
    /// # Errors
    ///
    /// Returns [`SmartPmError::NotFound`] if the project does not exist and
    /// [`SmartPmError::InvalidInput`] for an empty title or unknown label ids.
    pub fn create_task(&mut self, input: NewTask) -> Result<Task> {
        let title = require_text("task title", &input.title)?;
        if !self.store.projects.contains_key(&input.project_id) {
            return Err(SmartPmError::not_found("Project", &input.project_id));
        }
        let labels = self.checked_labels(input.labels)?;

        let mut task = Task::new(&input.project_id, title);
        task.description = optional_text(input.description);
        task.priority = input.priority;
        task.due_date = input.due_date;
        task.completed = input.completed;
        task.labels = labels;

        let created = task.clone();
        self.commit(|store| {
            if let Some(project) = store.projects.get_mut(&task.project_id) {
                project.attach_task(&task.id);
                project.touch();
            }
            store.tasks.insert(task.id.clone(), task);
            Ok(())
        })?;
        info!("Created task '{}' ({})", created.title, created.id);
        Ok(created)
    }

    #[must_use]
    pub fn get_task(&self, id: &str) -> Option<&Task> {
        self.store.tasks.get(id)
    }

    /// Tasks belonging to a project, in insertion order.
    #[must_use]
    pub fn get_tasks_by_project(&self, project_id: &str) -> Vec<&Task> {
        self.store.tasks_of(project_id).collect()
    }

    /// Apply a partial update to a task and bump `updated_at`.
    ///
    /// Setting `completed` on a task that has subtasks applies the same flag
    /// to all of them, so the task stays consistent with its subtasks.
    pub fn update_task(&mut self, id: &str, update: TaskUpdate) -> Result<Task> {
        let title = update
            .title
            .as_deref()
            .map(|t| require_text("task title", t))
            .transpose()?;
        let labels = update.labels.map(|l| self.checked_labels(l)).transpose()?;

        self.commit(|store| {
            let task = store
                .tasks
                .get_mut(id)
                .ok_or_else(|| SmartPmError::not_found("Task", id))?;
            if let Some(title) = title {
                task.title = title;
            }
            if let Some(description) = update.description {
                task.description = optional_text(description);
            }
            if let Some(priority) = update.priority {
                task.priority = priority;
            }
            if let Some(due_date) = update.due_date {
                task.due_date = due_date;
            }
            if let Some(labels) = labels {
                task.labels = labels;
            }
            if let Some(completed) = update.completed {
                task.completed = completed;
            }
            task.touch();

            if let Some(completed) = update.completed {
                for subtask in store.subtasks.values_mut().filter(|s| s.task_id == id) {
                    if subtask.completed != completed {
                        subtask.completed = completed;
                        subtask.touch();
                    }
                }
            }

            store
                .tasks
                .get(id)
                .cloned()
                .ok_or_else(|| SmartPmError::not_found("Task", id))
        })
    }

    /// Delete a task and its subtasks.
    ///
    /// Returns `false` if no task has this id.
    pub fn delete_task(&mut self, id: &str) -> Result<bool> {
        let Some(project_id) = self.store.tasks.get(id).map(|t| t.project_id.clone()) else {
            return Ok(false);
        };

        let subtasks = self.commit(|store| {
            let before = store.subtasks.len();
            store.subtasks.retain(|_, s| s.task_id != id);
            store.tasks.shift_remove(id);
            if let Some(project) = store.projects.get_mut(&project_id) {
                project.detach_task(id);
                project.touch();
            }
            Ok(before - store.subtasks.len())
        })?;

        info!("Deleted task {} with {} subtasks", id, subtasks);
        Ok(true)
    }

    // ------------------------------------------------------------------------
    // Subtasks
    // ------------------------------------------------------------------------

    /// Create a subtask under an existing task.
    ///
    /// Adding an open subtask to a completed task reopens the task.
    pub fn create_subtask(&mut self, input: NewSubtask) -> Result<Subtask> {
        let title = require_text("subtask title", &input.title)?;
        if !self.store.tasks.contains_key(&input.task_id) {
            return Err(SmartPmError::not_found("Task", &input.task_id));
        }
        let labels = self.checked_labels(input.labels)?;

        let mut subtask = Subtask::new(&input.task_id, title);
        subtask.description = optional_text(input.description);
        subtask.priority = input.priority;
        subtask.due_date = input.due_date;
        subtask.completed = input.completed;
        subtask.labels = labels;

        let created = subtask.clone();
        self.commit(|store| {
            let task_id = subtask.task_id.clone();
            if let Some(task) = store.tasks.get_mut(&task_id) {
                task.attach_subtask(&subtask.id);
                task.touch();
            }
            store.subtasks.insert(subtask.id.clone(), subtask);
            store.sync_task_completion(&task_id);
            Ok(())
        })?;
        info!("Created subtask '{}' ({})", created.title, created.id);
        Ok(created)
    }

    #[must_use]
    pub fn get_subtask(&self, id: &str) -> Option<&Subtask> {
        self.store.subtasks.get(id)
    }

    /// Subtasks belonging to a task, in insertion order.
    #[must_use]
    pub fn get_subtasks_by_task(&self, task_id: &str) -> Vec<&Subtask> {
        self.store.subtasks_of(task_id).collect()
    }

    /// Apply a partial update to a subtask, then re-derive the parent task's
    /// completion flag.
    pub fn update_subtask(&mut self, id: &str, update: SubtaskUpdate) -> Result<Subtask> {
        let title = update
            .title
            .as_deref()
            .map(|t| require_text("subtask title", t))
            .transpose()?;
        let labels = update.labels.map(|l| self.checked_labels(l)).transpose()?;

        self.commit(|store| {
            let subtask = store
                .subtasks
                .get_mut(id)
                .ok_or_else(|| SmartPmError::not_found("Subtask", id))?;
            if let Some(title) = title {
                subtask.title = title;
            }
            if let Some(description) = update.description {
                subtask.description = optional_text(description);
            }
            if let Some(priority) = update.priority {
                subtask.priority = priority;
            }
            if let Some(due_date) = update.due_date {
                subtask.due_date = due_date;
            }
            if let Some(labels) = labels {
                subtask.labels = labels;
            }
            if let Some(completed) = update.completed {
                subtask.completed = completed;
            }
            subtask.touch();

            let updated = subtask.clone();
            store.sync_task_completion(&updated.task_id);
            Ok(updated)
        })
    }

    /// Delete a subtask and re-derive the parent task's completion flag.
    ///
    /// Returns `false` if no subtask has this id.
    pub fn delete_subtask(&mut self, id: &str) -> Result<bool> {
        let Some(task_id) = self.store.subtasks.get(id).map(|s| s.task_id.clone()) else {
            return Ok(false);
        };

        self.commit(|store| {
            store.subtasks.shift_remove(id);
            if let Some(task) = store.tasks.get_mut(&task_id) {
                task.detach_subtask(id);
                task.touch();
            }
            store.sync_task_completion(&task_id);
            Ok(())
        })?;

        info!("Deleted subtask {}", id);
        Ok(true)
    }

    // ------------------------------------------------------------------------
    // Import, export and backups
    // ------------------------------------------------------------------------

    /// Export the data file to `export_path`.
    pub fn export_data(&self, export_path: &Path) -> Result<ExportReport> {
        transfer::export_data(&self.data_file, export_path, &self.config.export)
    }

    /// Import `import_path` and reload the store from the result.
    pub fn import_data(
        &mut self,
        import_path: &Path,
        strategy: ImportStrategy,
    ) -> Result<ImportReport> {
        let report = transfer::import_file(&self.data_file, import_path, strategy)?;
        self.load_data()?;
        Ok(report)
    }

    /// Backup manager for the directory next to the data file.
    pub fn backups(&self) -> Result<BackupManager> {
        BackupManager::new(
            AppConfig::backup_dir(&self.data_file),
            self.config.backup.clone(),
        )
    }

    pub fn create_backup(&self) -> Result<PathBuf> {
        self.backups()?.create_backup(&self.data_file)
    }

    pub fn cleanup_old_backups(&self, days_to_keep: u32) -> Result<CleanupReport> {
        self.backups()?.cleanup_old_backups(days_to_keep)
    }

    pub fn get_backup_info(&self) -> Result<BackupInventory> {
        self.backups()?.get_backup_info()
    }

    pub fn clear_all_backups(&self) -> Result<ClearReport> {
        self.backups()?.clear_all_backups()
    }

    // ------------------------------------------------------------------------
    // Internal helpers
    // ------------------------------------------------------------------------

    /// Apply `change` to the store and persist it.
    ///
    /// On any error the store is restored to its state before the call.
    fn commit<T>(&mut self, change: impl FnOnce(&mut DataStore) -> Result<T>) -> Result<T> {
        let snapshot = self.store.clone();

        let outcome = change(&mut self.store).and_then(|value| {
            self.store.save(&self.data_file)?;
            Ok(value)
        });

        if outcome.is_err() {
            self.store = snapshot;
        }
        outcome
    }

    /// Deduplicate label ids and make sure each one exists.
    fn checked_labels(&self, labels: Vec<String>) -> Result<Vec<String>> {
        let mut checked: Vec<String> = Vec::with_capacity(labels.len());
        for label_id in labels {
            if !self.store.labels.contains_key(&label_id) {
                return Err(SmartPmError::invalid(
                    "label",
                    format!("no label with id {label_id}"),
                ));
            }
            if !checked.contains(&label_id) {
                checked.push(label_id);
            }
        }
        Ok(checked)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use crate::testing::{temp_manager, SeededProject};
    use chrono::NaiveDate;

    #[test]
    fn test_open_creates_data_file() {
        let (dir, manager) = temp_manager();
        assert!(manager.data_file().exists());
        assert!(manager.store().is_empty());
        assert!(dir.path().join("data.json").exists());
    }

    #[test]
    fn test_open_corrupted_file_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(&path, "{ broken").unwrap();

        assert!(ProjectManager::open(&path, AppConfig::default()).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ broken");
    }

    #[test]
    fn test_get_missing_returns_none() {
        let (_dir, manager) = temp_manager();
        assert!(manager.get_label("nope").is_none());
        assert!(manager.get_project("nope").is_none());
        assert!(manager.get_task("nope").is_none());
        assert!(manager.get_subtask("nope").is_none());
    }

    #[test]
    fn test_every_mutation_persists() {
        let (_dir, mut manager) = temp_manager();
        let project = manager.create_project(NewProject::named("Website")).unwrap();
        let task = manager
            .create_task(NewTask::new(&project.id, "Landing page"))
            .unwrap();

        let reopened = ProjectManager::open(manager.data_file(), AppConfig::default()).unwrap();
        assert_eq!(reopened.get_project(&project.id).unwrap().name, "Website");
        assert_eq!(reopened.get_task(&task.id).unwrap().title, "Landing page");
        assert_eq!(
            reopened.get_project(&project.id).unwrap().tasks,
            vec![task.id.clone()]
        );
    }

    #[test]
    fn test_create_project_validates_name() {
        let (_dir, mut manager) = temp_manager();
        let err = manager.create_project(NewProject::named("   ")).unwrap_err();
        assert!(matches!(err, SmartPmError::InvalidInput { .. }));
        assert!(manager.get_all_projects().is_empty());
    }

    #[test]
    fn test_update_project_bumps_updated_at() {
        let (_dir, mut manager) = temp_manager();
        let project = manager.create_project(NewProject::named("Old")).unwrap();

        let updated = manager
            .update_project(
                &project.id,
                ProjectUpdate {
                    name: Some("New".into()),
                    version: Some("2.0.0".into()),
                    github_url: Some(Some("https://github.com/me/new".into())),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.name, "New");
        assert_eq!(updated.version, "2.0.0");
        assert_eq!(updated.github_url.as_deref(), Some("https://github.com/me/new"));
        assert!(updated.updated_at >= project.updated_at);
        assert_eq!(updated.created_at, project.created_at);
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let (_dir, mut manager) = temp_manager();
        let err = manager
            .update_task("ghost", TaskUpdate::default())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_create_task_requires_project() {
        let (_dir, mut manager) = temp_manager();
        let err = manager.create_task(NewTask::new("ghost", "Orphan")).unwrap_err();
        assert!(matches!(err, SmartPmError::NotFound { kind: "Project", .. }));
        assert!(manager.store().tasks.is_empty());
    }

    #[test]
    fn test_create_task_rejects_unknown_label() {
        let (_dir, mut manager) = temp_manager();
        let project = manager.create_project(NewProject::named("P")).unwrap();
        let mut input = NewTask::new(&project.id, "T");
        input.labels = vec!["missing".into()];
        assert!(manager.create_task(input).is_err());
        assert!(manager.get_project(&project.id).unwrap().tasks.is_empty());
    }

    #[test]
    fn test_task_fields_roundtrip() {
        let (_dir, mut manager) = temp_manager();
        let project = manager.create_project(NewProject::named("P")).unwrap();
        let label = manager.create_label(NewLabel::named("bug")).unwrap();

        let mut input = NewTask::new(&project.id, "  Fix login  ");
        input.priority = Priority::High;
        input.due_date = NaiveDate::from_ymd_opt(2030, 1, 1);
        input.labels = vec![label.id.clone(), label.id.clone()];
        input.description = Some("".into());
        let task = manager.create_task(input).unwrap();

        assert_eq!(task.title, "Fix login");
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.labels, vec![label.id]);
        assert!(task.description.is_none());
    }

    #[test]
    fn test_tasks_by_project_in_insertion_order() {
        let (_dir, mut manager) = temp_manager();
        let a = manager.create_project(NewProject::named("A")).unwrap();
        let b = manager.create_project(NewProject::named("B")).unwrap();
        for title in ["first", "second", "third"] {
            manager.create_task(NewTask::new(&a.id, title)).unwrap();
            manager.create_task(NewTask::new(&b.id, "other")).unwrap();
        }

        let titles: Vec<_> = manager
            .get_tasks_by_project(&a.id)
            .iter()
            .map(|t| t.title.as_str())
            .collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_all_subtasks_complete_completes_task() {
        let (_dir, mut manager) = temp_manager();
        let seeded = SeededProject::create(&mut manager);
        let task_id = &seeded.task_ids[0];

        for subtask_id in &seeded.subtask_ids {
            assert!(!manager.get_task(task_id).unwrap().completed);
            manager
                .update_subtask(subtask_id, SubtaskUpdate::completed(true))
                .unwrap();
        }
        assert!(manager.get_task(task_id).unwrap().completed);

        manager
            .update_subtask(&seeded.subtask_ids[1], SubtaskUpdate::completed(false))
            .unwrap();
        assert!(!manager.get_task(task_id).unwrap().completed);
    }

    #[test]
    fn test_new_open_subtask_reopens_task() {
        let (_dir, mut manager) = temp_manager();
        let seeded = SeededProject::create(&mut manager);
        let task_id = seeded.task_ids[0].clone();
        for subtask_id in &seeded.subtask_ids {
            manager
                .update_subtask(subtask_id, SubtaskUpdate::completed(true))
                .unwrap();
        }
        assert!(manager.get_task(&task_id).unwrap().completed);

        manager
            .create_subtask(NewSubtask::new(&task_id, "One more thing"))
            .unwrap();
        assert!(!manager.get_task(&task_id).unwrap().completed);
    }

    #[test]
    fn test_task_without_subtasks_keeps_manual_flag() {
        let (_dir, mut manager) = temp_manager();
        let seeded = SeededProject::create(&mut manager);
        let lonely = &seeded.task_ids[1];

        manager.update_task(lonely, TaskUpdate::completed(true)).unwrap();
        assert!(manager.get_task(lonely).unwrap().completed);
        manager.update_task(lonely, TaskUpdate::completed(false)).unwrap();
        assert!(!manager.get_task(lonely).unwrap().completed);
    }

    #[test]
    fn test_completing_task_completes_subtasks() {
        let (_dir, mut manager) = temp_manager();
        let seeded = SeededProject::create(&mut manager);
        let task_id = &seeded.task_ids[0];

        manager.update_task(task_id, TaskUpdate::completed(true)).unwrap();
        assert!(manager
            .get_subtasks_by_task(task_id)
            .iter()
            .all(|s| s.completed));
        assert!(manager.get_task(task_id).unwrap().completed);
    }

    #[test]
    fn test_deleting_last_open_subtask_completes_task() {
        let (_dir, mut manager) = temp_manager();
        let seeded = SeededProject::create(&mut manager);
        let task_id = &seeded.task_ids[0];

        manager
            .update_subtask(&seeded.subtask_ids[0], SubtaskUpdate::completed(true))
            .unwrap();
        manager
            .update_subtask(&seeded.subtask_ids[1], SubtaskUpdate::completed(true))
            .unwrap();
        assert!(!manager.get_task(task_id).unwrap().completed);

        assert!(manager.delete_subtask(&seeded.subtask_ids[2]).unwrap());
        assert!(manager.get_task(task_id).unwrap().completed);
        assert_eq!(manager.get_task(task_id).unwrap().subtasks.len(), 2);
    }

    #[test]
    fn test_delete_project_cascades() {
        let (_dir, mut manager) = temp_manager();
        let seeded = SeededProject::create(&mut manager);
        let other = manager.create_project(NewProject::named("Other")).unwrap();
        let survivor = manager.create_task(NewTask::new(&other.id, "Survivor")).unwrap();

        assert!(manager.delete_project(&seeded.project_id).unwrap());

        assert!(manager.get_project(&seeded.project_id).is_none());
        assert!(manager.get_tasks_by_project(&seeded.project_id).is_empty());
        for task_id in &seeded.task_ids {
            assert!(manager.get_task(task_id).is_none());
            assert!(manager.get_subtasks_by_task(task_id).is_empty());
        }
        assert!(manager.store().subtasks.is_empty());
        assert!(manager.get_task(&survivor.id).is_some());

        let reopened = ProjectManager::open(manager.data_file(), AppConfig::default()).unwrap();
        assert_eq!(reopened.store().counts().tasks, 1);
    }

    #[test]
    fn test_delete_task_cascades_and_detaches() {
        let (_dir, mut manager) = temp_manager();
        let seeded = SeededProject::create(&mut manager);
        let task_id = &seeded.task_ids[0];

        assert!(manager.delete_task(task_id).unwrap());
        assert!(manager.get_subtasks_by_task(task_id).is_empty());
        assert!(!manager
            .get_project(&seeded.project_id)
            .unwrap()
            .tasks
            .contains(task_id));
        assert!(!manager.delete_task(task_id).unwrap());
    }

    #[test]
    fn test_delete_label_prunes_references() {
        let (_dir, mut manager) = temp_manager();
        let seeded = SeededProject::create(&mut manager);

        assert!(manager.delete_label(&seeded.label_id).unwrap());
        assert!(manager.get_label(&seeded.label_id).is_none());
        assert!(manager
            .store()
            .tasks
            .values()
            .all(|t| !t.labels.contains(&seeded.label_id)));
        assert!(manager
            .store()
            .subtasks
            .values()
            .all(|s| !s.labels.contains(&seeded.label_id)));
        // Tasks themselves survive.
        assert_eq!(manager.store().counts().tasks, seeded.task_ids.len());
        assert!(!manager.delete_label(&seeded.label_id).unwrap());
    }

    #[test]
    fn test_label_color_validation() {
        let (_dir, mut manager) = temp_manager();
        let mut input = NewLabel::named("ui");
        input.color = Some("blue".into());
        assert!(manager.create_label(input).is_err());

        let mut input = NewLabel::named("ui");
        input.color = Some("#00AAFF".into());
        let label = manager.create_label(input).unwrap();
        assert_eq!(label.color, "#00aaff");

        let updated = manager
            .update_label(
                &label.id,
                LabelUpdate {
                    text_color: Some("#000000".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.text_color, "#000000");
        assert_eq!(updated.color, "#00aaff");
    }

    #[test]
    fn test_failed_save_rolls_back_memory() {
        let (dir, mut manager) = temp_manager();
        let project = manager.create_project(NewProject::named("Keep")).unwrap();

        // Make the data file's directory disappear so the write fails.
        let data_dir = dir.path().to_path_buf();
        std::fs::remove_dir_all(&data_dir).unwrap();
        std::fs::write(&data_dir, "not a directory").unwrap();

        let result = manager.create_project(NewProject::named("Lost"));
        assert!(result.is_err());
        assert_eq!(manager.get_all_projects().len(), 1);
        assert_eq!(manager.get_all_projects()[0].id, project.id);

        std::fs::remove_file(&data_dir).unwrap();
        std::fs::create_dir_all(&data_dir).unwrap();
    }

    #[test]
    fn test_import_reloads_store() {
        let (dir, mut manager) = temp_manager();
        SeededProject::create(&mut manager);
        let export = dir.path().join("export.json");
        manager.export_data(&export).unwrap();

        let report = manager.import_data(&export, ImportStrategy::Merge).unwrap();
        assert_eq!(report.imported.projects, 1);
        assert_eq!(manager.get_all_projects().len(), 2);
    }

    #[test]
    fn test_backup_wrappers_use_sibling_directory() {
        let (dir, manager) = temp_manager();
        let path = manager.create_backup().unwrap();
        assert_eq!(path.parent().unwrap(), dir.path().join("backups"));

        let info = manager.get_backup_info().unwrap();
        assert_eq!(info.total, 1);
        let cleared = manager.clear_all_backups().unwrap();
        assert_eq!(cleared.deleted, 1);
        assert_eq!(manager.cleanup_old_backups(30).unwrap().deleted, 0);
    }

    #[test]
    fn test_load_data_picks_up_external_changes() {
        let (_dir, mut manager) = temp_manager();
        let mut other = ProjectManager::open(manager.data_file(), AppConfig::default()).unwrap();
        other.create_project(NewProject::named("From elsewhere")).unwrap();

        assert!(manager.get_all_projects().is_empty());
        manager.load_data().unwrap();
        assert_eq!(manager.get_all_projects().len(), 1);
    }
}
