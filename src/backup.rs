//! Timestamped backups of the data file.
//!
//! Backups live in a `backups/` directory next to the data file and are named
//! `backup_YYYYMMDD_HHMMSS.json`. Each one is a copy of the data file with a
//! `_backup_info` block recording when it was taken and from where. Only files
//! matching `backup_*.json` are ever listed or deleted.
//!
//! # Example
//!
//! ```rust,ignore
//! use smartpm::backup::BackupManager;
//! use smartpm::config::BackupConfig;
//!
//! let backups = BackupManager::new("/home/me/.smart_project_manager/backups", BackupConfig::default())?;
//! let path = backups.create_backup(Path::new("/home/me/.smart_project_manager/data.json"))?;
//!
//! // Drop everything older than a week
//! let report = backups.cleanup_old_backups(7)?;
//! println!("deleted {}, kept {}", report.deleted, report.kept);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDateTime};
use globset::{Glob, GlobMatcher};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::config::BackupConfig;
use crate::error::{IntoSmartPmError, Result, SmartPmError};
use crate::models;
use crate::store::persistence::{read_json_value, write_json_atomic};
use crate::transfer::BACKUP_INFO_KEY;

/// File name pattern of backup files.
pub const BACKUP_PATTERN: &str = "backup_*.json";

const BACKUP_PREFIX: &str = "backup_";
const FILENAME_TIMESTAMP: &str = "%Y%m%d_%H%M%S";

/// Convert a byte count to mebibytes for display.
#[must_use]
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

// ============================================================================
// Reports
// ============================================================================

/// Outcome of a retention cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub deleted: usize,
    pub kept: usize,
    /// Backups taken before this moment were eligible for deletion.
    pub cutoff_date: NaiveDateTime,
}

/// One backup file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupEntry {
    pub path: PathBuf,
    pub filename: String,
    /// From `_backup_info`, else from the file name. `None` if neither parses.
    pub date: Option<NaiveDateTime>,
    pub size_bytes: u64,
}

impl BackupEntry {
    #[must_use]
    pub fn size_mb(&self) -> f64 {
        bytes_to_mb(self.size_bytes)
    }
}

/// Summary of the backup directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackupInventory {
    /// Number of backup files on disk.
    pub total: usize,
    pub total_size_bytes: u64,
    /// Newest first, at most `max_listed` entries.
    pub backups: Vec<BackupEntry>,
}

impl BackupInventory {
    #[must_use]
    pub fn total_size_mb(&self) -> f64 {
        bytes_to_mb(self.total_size_bytes)
    }
}

/// Outcome of deleting every backup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClearReport {
    pub deleted: usize,
    pub total_files: usize,
    pub freed_bytes: u64,
}

impl ClearReport {
    #[must_use]
    pub fn freed_mb(&self) -> f64 {
        bytes_to_mb(self.freed_bytes)
    }
}

// ============================================================================
// Backup Manager
// ============================================================================

/// Creates, lists and prunes backups in one directory.
pub struct BackupManager {
    /// Directory holding the backup files.
    backup_dir: PathBuf,

    /// Retention and listing settings.
    config: BackupConfig,

    /// Matches [`BACKUP_PATTERN`] against file names.
    matcher: GlobMatcher,
}

impl BackupManager {
    /// Create a manager for `backup_dir`.
    ///
    /// The directory itself is only created when the first backup is written.
    pub fn new(backup_dir: impl AsRef<Path>, config: BackupConfig) -> Result<Self> {
        let matcher = Glob::new(BACKUP_PATTERN)
            .into_backup_error()?
            .compile_matcher();

        Ok(Self {
            backup_dir: backup_dir.as_ref().to_path_buf(),
            config,
            matcher,
        })
    }

    #[must_use]
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Copy `data_file` into the backup directory.
    ///
    /// Runs retention cleanup afterwards when `auto_cleanup` is set; a failed
    /// cleanup is logged and does not fail the backup.
    ///
    /// # Errors
    ///
    /// Returns [`SmartPmError::MissingFile`] if `data_file` does not exist.
    pub fn create_backup(&self, data_file: &Path) -> Result<PathBuf> {
        let mut document = read_json_value(data_file)?;
        let Some(object) = document.as_object_mut() else {
            return Err(SmartPmError::backup(format!(
                "{} does not contain a JSON object",
                data_file.display()
            )));
        };

        let taken_at = models::now();
        object.insert(
            BACKUP_INFO_KEY.to_string(),
            json!({
                "backup_date": models::format_timestamp(&taken_at),
                "original_file": data_file.display().to_string(),
            }),
        );

        let path = self.unique_backup_path(taken_at);
        write_json_atomic(&path, &document).into_backup_error()?;
        info!("Created backup: {}", path.display());

        if self.config.auto_cleanup {
            if let Err(e) = self.cleanup_old_backups(self.config.retention_days) {
                warn!("Backup cleanup failed: {}", e);
            }
        }

        Ok(path)
    }

    /// Delete backups taken more than `days_to_keep` days ago.
    ///
    /// Files that cannot be read, or whose date cannot be determined, are
    /// kept. A file that cannot be deleted counts as kept too.
    pub fn cleanup_old_backups(&self, days_to_keep: u32) -> Result<CleanupReport> {
        // A retention window reaching before the calendar keeps everything.
        let cutoff_date = Duration::try_days(i64::from(days_to_keep))
            .and_then(|window| models::now().checked_sub_signed(window))
            .unwrap_or(NaiveDateTime::MIN);
        let mut report = CleanupReport {
            deleted: 0,
            kept: 0,
            cutoff_date,
        };

        for path in self.list_backup_files()? {
            let Some(date) = self.readable_backup_date(&path) else {
                report.kept += 1;
                continue;
            };

            if date > cutoff_date {
                report.kept += 1;
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Deleted old backup: {}", path.display());
                    report.deleted += 1;
                }
                Err(e) => {
                    warn!("Could not delete {}: {}", path.display(), e);
                    report.kept += 1;
                }
            }
        }

        if report.deleted > 0 {
            info!(
                "Removed {} backups older than {}, {} kept",
                report.deleted,
                cutoff_date.format("%Y-%m-%d"),
                report.kept
            );
        }
        Ok(report)
    }

    /// All backup files, sorted by file name.
    pub fn list_backup_files(&self) -> Result<Vec<PathBuf>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&self.backup_dir)? {
            let path = entry?.path();
            let matches = path
                .file_name()
                .is_some_and(|name| self.matcher.is_match(Path::new(name)));
            if matches && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// The newest backups and the directory totals.
    pub fn get_backup_info(&self) -> Result<BackupInventory> {
        let files = self.list_backup_files()?;
        let mut inventory = BackupInventory {
            total: files.len(),
            ..Default::default()
        };

        for path in files.into_iter().rev() {
            let size_bytes = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            inventory.total_size_bytes += size_bytes;

            if inventory.backups.len() < self.config.max_listed {
                inventory.backups.push(BackupEntry {
                    filename: file_name_of(&path),
                    date: self.readable_backup_date(&path),
                    size_bytes,
                    path,
                });
            }
        }

        Ok(inventory)
    }

    /// Delete every backup file.
    pub fn clear_all_backups(&self) -> Result<ClearReport> {
        let files = self.list_backup_files()?;
        let mut report = ClearReport {
            total_files: files.len(),
            ..Default::default()
        };

        for path in files {
            let size_bytes = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            match fs::remove_file(&path) {
                Ok(()) => {
                    report.deleted += 1;
                    report.freed_bytes += size_bytes;
                }
                Err(e) => warn!("Could not delete {}: {}", path.display(), e),
            }
        }

        info!(
            "Deleted {} of {} backups ({} bytes)",
            report.deleted, report.total_files, report.freed_bytes
        );
        Ok(report)
    }

    // ------------------------------------------------------------------------
    // Internal helpers
    // ------------------------------------------------------------------------

    /// Pick a file name for a backup taken at `taken_at`, adding a counter
    /// when another backup already has that second.
    fn unique_backup_path(&self, taken_at: NaiveDateTime) -> PathBuf {
        let stem = format!("{BACKUP_PREFIX}{}", taken_at.format(FILENAME_TIMESTAMP));
        let mut path = self.backup_dir.join(format!("{stem}.json"));
        let mut n = 1;
        while path.exists() {
            path = self.backup_dir.join(format!("{stem}_{n}.json"));
            n += 1;
        }
        path
    }

    /// Date of a backup: `_backup_info.backup_date`, else the file name.
    ///
    /// Returns `None` when the file is not readable JSON.
    fn readable_backup_date(&self, path: &Path) -> Option<NaiveDateTime> {
        let document = match read_json_value(path) {
            Ok(document) => document,
            Err(e) => {
                warn!("Unreadable backup {}: {}", path.display(), e);
                return None;
            }
        };

        document
            .get(BACKUP_INFO_KEY)
            .and_then(|info| info.get("backup_date"))
            .and_then(|date| date.as_str())
            .and_then(models::parse_timestamp)
            .or_else(|| date_from_filename(&file_name_of(path)))
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Parse the timestamp out of `backup_YYYYMMDD_HHMMSS[_N].json`.
fn date_from_filename(filename: &str) -> Option<NaiveDateTime> {
    let stamp = filename.strip_prefix(BACKUP_PREFIX)?.get(..15)?;
    NaiveDateTime::parse_from_str(stamp, FILENAME_TIMESTAMP).ok()
}
