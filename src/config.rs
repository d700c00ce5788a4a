//! Configuration management for smartpm.
//!
//! Settings live in `config.toml` inside the data directory
//! (`~/.smart_project_manager/` by default). Every field has a default, so a
//! missing or partial file is fine:
//!
//! ```toml
//! data_file = "/home/me/Dropbox/smartpm.json"
//!
//! [backup]
//! retention_days = 14
//! max_listed = 5
//! auto_cleanup = true
//!
//! [export]
//! app_name = "Smart Project Manager"
//! format_version = "1.0"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SmartPmError};

/// Name of the per-user data directory under `$HOME`.
pub const DATA_DIR_NAME: &str = ".smart_project_manager";

/// File name of the store inside the data directory.
pub const DATA_FILE_NAME: &str = "data.json";

/// File name of the settings file inside the data directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Name of the backup directory, created next to the data file.
pub const BACKUP_DIR_NAME: &str = "backups";

/// Application configuration loaded from `config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Overrides the default store location.
    #[serde(default)]
    pub data_file: Option<PathBuf>,

    #[serde(default)]
    pub backup: BackupConfig,

    #[serde(default)]
    pub export: ExportConfig,
}

/// Backup retention and listing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Backups older than this many days are removed by cleanup.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// How many backups `backup list` shows.
    #[serde(default = "default_max_listed")]
    pub max_listed: usize,

    /// Run retention cleanup right after each new backup.
    #[serde(default = "default_true")]
    pub auto_cleanup: bool,
}

fn default_retention_days() -> u32 {
    30
}

fn default_max_listed() -> usize {
    10
}

fn default_true() -> bool {
    true
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            max_listed: default_max_listed(),
            auto_cleanup: true,
        }
    }
}

impl BackupConfig {
    #[must_use]
    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    #[must_use]
    pub fn with_max_listed(mut self, max: usize) -> Self {
        self.max_listed = max;
        self
    }

    #[must_use]
    pub fn with_auto_cleanup(mut self, enabled: bool) -> Self {
        self.auto_cleanup = enabled;
        self
    }
}

/// Metadata stamped into exported files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,

    #[serde(default = "default_format_version")]
    pub format_version: String,
}

fn default_app_name() -> String {
    "Smart Project Manager".to_string()
}

fn default_format_version() -> String {
    "1.0".to_string()
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            format_version: default_format_version(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a data directory.
    ///
    /// Returns the defaults when `config.toml` does not exist.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = Self::config_path(data_dir);

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: AppConfig = toml::from_str(&content).map_err(|e| {
            SmartPmError::config_with_path(e.to_string(), path.clone())
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the tool misbehave.
    pub fn validate(&self) -> Result<()> {
        if self.backup.max_listed == 0 {
            return Err(SmartPmError::config("backup.max_listed must be at least 1"));
        }
        if self.export.app_name.trim().is_empty() {
            return Err(SmartPmError::config("export.app_name must not be empty"));
        }
        Ok(())
    }

    /// Default data directory, `~/.smart_project_manager`.
    ///
    /// Falls back to the current directory when no home directory is known.
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DATA_DIR_NAME)
    }

    /// Get the config.toml path for a data directory
    pub fn config_path(data_dir: &Path) -> PathBuf {
        data_dir.join(CONFIG_FILE_NAME)
    }

    /// Resolve the store path: explicit override, then config, then default.
    pub fn data_file_path(&self, data_dir: &Path, cli_override: Option<&Path>) -> PathBuf {
        cli_override
            .map(Path::to_path_buf)
            .or_else(|| self.data_file.clone())
            .unwrap_or_else(|| data_dir.join(DATA_FILE_NAME))
    }

    /// Backup directory for a given data file.
    pub fn backup_dir(data_file: &Path) -> PathBuf {
        data_file
            .parent()
            .map(|p| p.join(BACKUP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from(BACKUP_DIR_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert!(config.data_file.is_none());
        assert_eq!(config.backup.retention_days, 30);
        assert_eq!(config.backup.max_listed, 10);
        assert!(config.backup.auto_cleanup);
        assert_eq!(config.export.app_name, "Smart Project Manager");
        assert_eq!(config.export.format_version, "1.0");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file_returns_default() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load(dir.path()).unwrap();
        assert_eq!(config.backup, BackupConfig::default());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[backup]\nretention_days = 7\n",
        )
        .unwrap();

        let config = AppConfig::load(dir.path()).unwrap();
        assert_eq!(config.backup.retention_days, 7);
        assert_eq!(config.backup.max_listed, 10);
        assert_eq!(config.export, ExportConfig::default());
    }

    #[test]
    fn test_load_invalid_toml_is_config_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "backup = [not toml").unwrap();

        let err = AppConfig::load(dir.path()).unwrap_err();
        assert!(matches!(err, SmartPmError::Config { path: Some(_), .. }));
        assert_eq!(err.exit_code(), 7);
    }

    #[test]
    fn test_validate_rejects_zero_listing() {
        let mut config = AppConfig::default();
        config.backup = config.backup.with_max_listed(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_data_file_resolution_order() {
        let data_dir = Path::new("/home/me/.smart_project_manager");
        let mut config = AppConfig::default();

        assert_eq!(
            config.data_file_path(data_dir, None),
            data_dir.join(DATA_FILE_NAME)
        );

        config.data_file = Some(PathBuf::from("/srv/pm.json"));
        assert_eq!(
            config.data_file_path(data_dir, None),
            PathBuf::from("/srv/pm.json")
        );

        assert_eq!(
            config.data_file_path(data_dir, Some(Path::new("/tmp/x.json"))),
            PathBuf::from("/tmp/x.json")
        );
    }

    #[test]
    fn test_backup_dir_is_sibling_of_data_file() {
        assert_eq!(
            AppConfig::backup_dir(Path::new("/data/pm/data.json")),
            PathBuf::from("/data/pm/backups")
        );
    }

    #[test]
    fn test_backup_config_builder() {
        let config = BackupConfig::default()
            .with_retention_days(3)
            .with_max_listed(2)
            .with_auto_cleanup(false);
        assert_eq!(config.retention_days, 3);
        assert_eq!(config.max_listed, 2);
        assert!(!config.auto_cleanup);
    }
}
