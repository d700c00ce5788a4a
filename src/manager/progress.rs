//! Progress and statistics aggregation.
//!
//! All functions here are read-only and never fail: missing entities and
//! empty collections report 0%.

use chrono::NaiveDate;
use serde::Serialize;

use super::ProjectManager;
use crate::models::{self, ProjectStatus, Task};
use crate::store::DataStore;

/// Percentage of `done` out of `total`, 0 when `total` is 0.
#[must_use]
pub fn percentage(done: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        done as f64 / total as f64 * 100.0
    }
}

/// Progress of one task in `0.0..=100.0`.
///
/// With subtasks this is the share of completed subtasks, otherwise the
/// task's own flag decides between 0 and 100.
fn task_progress(store: &DataStore, task: &Task) -> f64 {
    let (done, total) = store
        .subtasks_of(&task.id)
        .fold((0, 0), |(done, total), s| (done + usize::from(s.completed), total + 1));

    if total == 0 {
        if task.completed {
            100.0
        } else {
            0.0
        }
    } else {
        percentage(done, total)
    }
}

/// Per-project rollup shown by `project show`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectSummary {
    pub project_id: String,
    pub name: String,
    pub version: String,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub total_subtasks: usize,
    pub completed_subtasks: usize,
    pub progress: f64,
    pub status: ProjectStatus,
}

/// Store-wide counts and completion rates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub projects: usize,
    pub tasks: usize,
    pub subtasks: usize,
    pub labels: usize,
    pub completed_tasks: usize,
    pub completed_subtasks: usize,
    /// Percentage of completed tasks.
    pub task_completion_rate: f64,
    /// Percentage of completed subtasks.
    pub subtask_completion_rate: f64,
    /// Open tasks whose due date has passed.
    pub overdue_tasks: usize,
}

impl ProjectManager {
    /// Progress of a task, 0 if it does not exist.
    #[must_use]
    pub fn get_task_progress(&self, task_id: &str) -> f64 {
        self.store()
            .tasks
            .get(task_id)
            .map_or(0.0, |task| task_progress(self.store(), task))
    }

    /// Mean progress over the project's tasks.
    ///
    /// A project with no tasks, or one that does not exist, is at 0.
    #[must_use]
    pub fn get_project_progress(&self, project_id: &str) -> f64 {
        let store = self.store();
        let (sum, count) = store
            .tasks_of(project_id)
            .fold((0.0, 0usize), |(sum, count), task| {
                (sum + task_progress(store, task), count + 1)
            });

        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }

    /// Counts and progress for one project, `None` if it does not exist.
    #[must_use]
    pub fn get_project_summary(&self, project_id: &str) -> Option<ProjectSummary> {
        let store = self.store();
        let project = store.projects.get(project_id)?;

        let mut summary = ProjectSummary {
            project_id: project.id.clone(),
            name: project.name.clone(),
            version: project.version.clone(),
            total_tasks: 0,
            completed_tasks: 0,
            total_subtasks: 0,
            completed_subtasks: 0,
            progress: self.get_project_progress(project_id),
            status: ProjectStatus::NotStarted,
        };

        for task in store.tasks_of(project_id) {
            summary.total_tasks += 1;
            summary.completed_tasks += usize::from(task.completed);
            for subtask in store.subtasks_of(&task.id) {
                summary.total_subtasks += 1;
                summary.completed_subtasks += usize::from(subtask.completed);
            }
        }
        summary.status = ProjectStatus::from_progress(summary.progress);

        Some(summary)
    }

    /// Statistics with overdue tasks counted against today's date.
    #[must_use]
    pub fn get_statistics(&self) -> Statistics {
        self.get_statistics_on(models::today())
    }

    /// Statistics with overdue tasks counted against `today`.
    #[must_use]
    pub fn get_statistics_on(&self, today: NaiveDate) -> Statistics {
        let store = self.store();
        let completed_tasks = store.tasks.values().filter(|t| t.completed).count();
        let completed_subtasks = store.subtasks.values().filter(|s| s.completed).count();

        Statistics {
            projects: store.projects.len(),
            tasks: store.tasks.len(),
            subtasks: store.subtasks.len(),
            labels: store.labels.len(),
            completed_tasks,
            completed_subtasks,
            task_completion_rate: percentage(completed_tasks, store.tasks.len()),
            subtask_completion_rate: percentage(completed_subtasks, store.subtasks.len()),
            overdue_tasks: store.tasks.values().filter(|t| t.is_overdue(today)).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::{NewProject, NewTask, SubtaskUpdate, TaskUpdate};
    use crate::testing::{temp_manager, SeededProject};

    #[test]
    fn test_percentage_zero_total() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 4), 25.0);
        assert_eq!(percentage(3, 3), 100.0);
    }

    #[test]
    fn test_empty_project_progress_is_zero() {
        let (_dir, mut manager) = temp_manager();
        let project = manager.create_project(NewProject::named("Empty")).unwrap();
        assert_eq!(manager.get_project_progress(&project.id), 0.0);
        assert_eq!(manager.get_project_progress("missing"), 0.0);
    }

    #[test]
    fn test_task_progress_without_subtasks_follows_flag() {
        let (_dir, mut manager) = temp_manager();
        let seeded = SeededProject::create(&mut manager);
        let lonely = &seeded.task_ids[1];

        assert_eq!(manager.get_task_progress(lonely), 0.0);
        manager.update_task(lonely, TaskUpdate::completed(true)).unwrap();
        assert_eq!(manager.get_task_progress(lonely), 100.0);
        assert_eq!(manager.get_task_progress("missing"), 0.0);
    }

    #[test]
    fn test_task_progress_from_subtasks() {
        let (_dir, mut manager) = temp_manager();
        let seeded = SeededProject::create(&mut manager);
        let task_id = &seeded.task_ids[0];

        manager
            .update_subtask(&seeded.subtask_ids[0], SubtaskUpdate::completed(true))
            .unwrap();
        let progress = manager.get_task_progress(task_id);
        assert!((progress - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_project_progress_is_mean_of_tasks() {
        let (_dir, mut manager) = temp_manager();
        let seeded = SeededProject::create(&mut manager);

        // Task 0: 1 of 3 subtasks done. Task 1: no subtasks, completed.
        manager
            .update_subtask(&seeded.subtask_ids[0], SubtaskUpdate::completed(true))
            .unwrap();
        manager
            .update_task(&seeded.task_ids[1], TaskUpdate::completed(true))
            .unwrap();

        let expected = (100.0 / 3.0 + 100.0) / 2.0;
        let progress = manager.get_project_progress(&seeded.project_id);
        assert!((progress - expected).abs() < 1e-9);
    }

    #[test]
    fn test_project_summary() {
        let (_dir, mut manager) = temp_manager();
        let seeded = SeededProject::create(&mut manager);
        manager
            .update_task(&seeded.task_ids[0], TaskUpdate::completed(true))
            .unwrap();

        let summary = manager.get_project_summary(&seeded.project_id).unwrap();
        assert_eq!(summary.total_tasks, 2);
        assert_eq!(summary.completed_tasks, 1);
        assert_eq!(summary.total_subtasks, 3);
        assert_eq!(summary.completed_subtasks, 3);
        assert_eq!(summary.progress, 50.0);
        assert_eq!(summary.status, ProjectStatus::Active);

        assert!(manager.get_project_summary("missing").is_none());
    }

    #[test]
    fn test_statistics() {
        let (_dir, mut manager) = temp_manager();
        let seeded = SeededProject::create(&mut manager);
        manager
            .update_subtask(&seeded.subtask_ids[0], SubtaskUpdate::completed(true))
            .unwrap();

        let mut overdue = NewTask::new(&seeded.project_id, "Late");
        overdue.due_date = NaiveDate::from_ymd_opt(2020, 1, 1);
        manager.create_task(overdue).unwrap();

        let stats = manager.get_statistics_on(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(stats.projects, 1);
        assert_eq!(stats.tasks, 3);
        assert_eq!(stats.subtasks, 3);
        assert_eq!(stats.labels, 1);
        assert_eq!(stats.completed_tasks, 0);
        assert_eq!(stats.completed_subtasks, 1);
        assert_eq!(stats.task_completion_rate, 0.0);
        assert!((stats.subtask_completion_rate - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats.overdue_tasks, 1);
    }

    #[test]
    fn test_statistics_on_empty_store() {
        let (_dir, manager) = temp_manager();
        assert_eq!(manager.get_statistics(), Statistics::default());
    }
}
