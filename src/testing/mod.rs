//! Shared fixtures for unit tests.
//!
//! Every fixture works inside its own temporary directory, which is removed
//! when the returned [`TempDir`](tempfile::TempDir) is dropped.
//!
//! # Example
//!
//! ```rust,ignore
//! let (_dir, mut manager) = temp_manager();
//! let seeded = SeededProject::create(&mut manager);
//! assert_eq!(manager.get_tasks_by_project(&seeded.project_id).len(), 2);
//! ```

pub mod fixtures;

pub use fixtures::*;
