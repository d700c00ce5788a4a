//! smartpm - Smart Project Manager
//!
//! A single-user tracker for projects, tasks, subtasks and labels, kept in
//! one JSON file that is rewritten after every change.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`models`] - Entity records, priorities and timestamp formats
//! - [`store`] - In-memory entity collections and the data file layout
//! - [`manager`] - CRUD, cascades, completion rules, progress and statistics
//! - [`transfer`] - Export and import (replace or merge)
//! - [`backup`] - Timestamped backups with retention cleanup
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Custom error types and handling
//!
//! # Example
//!
//! ```rust,ignore
//! use smartpm::{AppConfig, ProjectManager};
//! use smartpm::manager::{NewProject, NewTask};
//!
//! let mut manager = ProjectManager::open("data.json", AppConfig::default())?;
//! let project = manager.create_project(NewProject::named("Website"))?;
//! manager.create_task(NewTask::new(&project.id, "Landing page"))?;
//!
//! let stats = manager.get_statistics();
//! println!("{} tasks, {:.0}% done", stats.tasks, stats.task_completion_rate);
//! ```

pub mod backup;
pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod store;
pub mod transfer;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use error::{IntoSmartPmError, Result, SmartPmError};

pub use config::{AppConfig, BackupConfig, ExportConfig};

pub use manager::{ProjectManager, ProjectSummary, Statistics};

pub use models::{Label, Priority, Project, ProjectStatus, Subtask, Task};

pub use store::{DataStore, ItemCounts};

pub use transfer::{ExportReport, ImportReport, ImportStrategy};

pub use backup::{BackupEntry, BackupInventory, BackupManager, CleanupReport, ClearReport};
