//! Reading and writing the data file.
//!
//! Documents are written with four-space indentation through a temporary
//! sibling file that is renamed over the target, so a crash mid-write never
//! leaves a truncated data file behind.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::debug;

use super::DataStore;
use crate::error::{Result, SmartPmError};

/// Temporary file suffix for atomic writes.
const TMP_SUFFIX: &str = ".tmp";

/// Serialize `value` as indented JSON.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Write `value` as JSON to `path` via a temporary file and rename.
///
/// Creates parent directories if they don't exist.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            debug!("Created directory: {}", parent.display());
        }
    }

    let bytes = to_pretty_json(value)?;
    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, bytes)?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(e.into());
    }
    Ok(())
}

/// Read a file and parse it as an arbitrary JSON value.
pub fn read_json_value(path: &Path) -> Result<serde_json::Value> {
    if !path.exists() {
        return Err(SmartPmError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "data.json".into());
    name.push(TMP_SUFFIX);
    path.with_file_name(name)
}

impl DataStore {
    /// Load the store from `path`.
    ///
    /// Returns an empty store if the file doesn't exist. A file that exists
    /// but cannot be parsed is an error; it is never silently replaced.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No data file at {}, starting empty", path.display());
            return Ok(Self::new());
        }

        let content = fs::read_to_string(path)?;
        let mut store: Self = serde_json::from_str(&content)?;
        store.rekey();

        debug!("Loaded {} from {}", store.counts(), path.display());
        Ok(store)
    }

    /// Save the whole store to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        write_json_atomic(path, self)?;
        debug!("Saved {} to {}", self.counts(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Label, Project, Subtask, Task};
    use tempfile::TempDir;

    fn sample_store() -> DataStore {
        let mut store = DataStore::new();
        let label = Label::new("bug");
        let mut project = Project::new("Website");
        let mut task = Task::new(&project.id, "Landing page");
        let subtask = Subtask::new(&task.id, "Hero image");
        task.labels.push(label.id.clone());
        task.attach_subtask(&subtask.id);
        project.attach_task(&task.id);

        store.labels.insert(label.id.clone(), label);
        store.projects.insert(project.id.clone(), project);
        store.tasks.insert(task.id.clone(), task);
        store.subtasks.insert(subtask.id.clone(), subtask);
        store
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.json");

        let original = sample_store();
        original.save(&path).unwrap();
        assert!(path.exists());

        let loaded = DataStore::load(&path).unwrap();
        assert_eq!(loaded.counts(), original.counts());
        let task = loaded.tasks.values().next().unwrap();
        assert_eq!(task.title, "Landing page");
        assert_eq!(task.subtasks.len(), 1);
    }

    #[test]
    fn test_save_creates_directories() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("dirs").join("data.json");

        DataStore::new().save(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_save_leaves_no_tmp_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.json");

        sample_store().save(&path).unwrap();
        assert!(!temp_dir.path().join("data.json.tmp").exists());
    }

    #[test]
    fn test_saved_file_uses_four_space_indent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.json");

        DataStore::new().save(&path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\n    \"labels\": {}"));
        for section in crate::store::REQUIRED_SECTIONS {
            assert!(content.contains(&format!("\"{section}\"")));
        }
    }

    #[test]
    fn test_load_nonexistent_returns_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = DataStore::load(&temp_dir.path().join("missing.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_corrupted_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("corrupted.json");
        fs::write(&path, "not valid json {{{").unwrap();

        let result = DataStore::load(&path);
        assert!(matches!(result, Err(SmartPmError::Json(_))));
        // The broken file is left for the user to inspect.
        assert!(path.exists());
    }

    #[test]
    fn test_read_json_value_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = read_json_value(&temp_dir.path().join("nope.json"));
        assert!(matches!(result, Err(SmartPmError::MissingFile { .. })));
    }

    #[test]
    fn test_tmp_path_for() {
        let path = Path::new("/home/user/.smart_project_manager/data.json");
        assert_eq!(
            tmp_path_for(path),
            PathBuf::from("/home/user/.smart_project_manager/data.json.tmp")
        );
    }
}
