//! Export to and import from standalone JSON documents.
//!
//! An export is the data file plus an `_export_info` block. An import accepts
//! any document with the four store sections as objects; `_export_info` and
//! `_backup_info` are ignored, so exports and backups can both be imported.
//!
//! Import validates the incoming document completely before the data file is
//! touched. The data file is then rewritten atomically and read back; if that
//! fails, the copy taken just before the write is put back.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::ExportConfig;
use crate::error::{IntoSmartPmError, Result, SmartPmError};
use crate::models::{self, Label};
use crate::store::persistence::{read_json_value, write_json_atomic};
use crate::store::{DataStore, ItemCounts, REQUIRED_SECTIONS};

/// Metadata key stamped into exported files.
pub const EXPORT_INFO_KEY: &str = "_export_info";

/// Metadata key stamped into backup files.
pub const BACKUP_INFO_KEY: &str = "_backup_info";

/// Suffix of the safety copy taken while an import is written.
const IMPORT_SNAPSHOT_SUFFIX: &str = ".import-bak";

// ============================================================================
// Strategy and reports
// ============================================================================

/// How imported entities combine with the existing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStrategy {
    /// Discard the current store and use the imported one as is.
    Replace,
    /// Add every imported entity under a new id.
    #[default]
    Merge,
}

impl fmt::Display for ImportStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportStrategy::Replace => write!(f, "replace"),
            ImportStrategy::Merge => write!(f, "merge"),
        }
    }
}

impl FromStr for ImportStrategy {
    type Err = SmartPmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "replace" => Ok(ImportStrategy::Replace),
            "merge" => Ok(ImportStrategy::Merge),
            _ => Err(SmartPmError::invalid(
                "import strategy",
                format!("'{s}'. Valid values: merge, replace"),
            )),
        }
    }
}

/// Result of a successful export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Result of a successful import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub strategy: ImportStrategy,
    /// Entities now in the store that came from the imported file.
    pub imported: ItemCounts,
    /// Tasks and subtasks dropped because their parent could not be found.
    pub skipped: ItemCounts,
}

// ============================================================================
// Export
// ============================================================================

/// Copy the data file to `export_path` with an `_export_info` block added.
///
/// # Errors
///
/// Returns [`SmartPmError::MissingFile`] if `data_file` does not exist and
/// [`SmartPmError::Export`] if the export cannot be written.
pub fn export_data(
    data_file: &Path,
    export_path: &Path,
    config: &ExportConfig,
) -> Result<ExportReport> {
    let mut document = read_json_value(data_file)?;
    let Some(object) = document.as_object_mut() else {
        return Err(SmartPmError::export(format!(
            "{} does not contain a JSON object",
            data_file.display()
        )));
    };

    object.insert(
        EXPORT_INFO_KEY.to_string(),
        json!({
            "export_date": models::format_timestamp(&models::now()),
            "export_app": config.app_name,
            "version": config.format_version,
        }),
    );

    write_json_atomic(export_path, &document).into_export_error()?;
    let size_bytes = fs::metadata(export_path).into_export_error()?.len();

    info!(
        "Exported {} to {} ({} bytes)",
        data_file.display(),
        export_path.display(),
        size_bytes
    );
    Ok(ExportReport {
        path: export_path.to_path_buf(),
        size_bytes,
    })
}

// ============================================================================
// Import
// ============================================================================

/// Validate an import document and turn it into a store.
///
/// Metadata blocks are dropped. Each of the four sections must be present
/// and must be an object.
pub fn parse_import_document(document: Value) -> Result<DataStore> {
    let Value::Object(mut object) = document else {
        return Err(SmartPmError::invalid_import("document is not a JSON object"));
    };

    object.remove(EXPORT_INFO_KEY);
    object.remove(BACKUP_INFO_KEY);

    for section in REQUIRED_SECTIONS {
        match object.get(section) {
            Some(Value::Object(_)) => {}
            Some(_) => {
                return Err(SmartPmError::invalid_import(format!(
                    "section '{section}' is not an object"
                )))
            }
            None => {
                return Err(SmartPmError::invalid_import(format!(
                    "missing section '{section}'"
                )))
            }
        }
    }

    let mut store: DataStore = serde_json::from_value(Value::Object(object))
        .map_err(|e| SmartPmError::invalid_import(e.to_string()))?;
    store.rekey();
    Ok(store)
}

/// Import `import_path` into the data file.
///
/// # Errors
///
/// Returns [`SmartPmError::InvalidImport`] for a malformed document, in which
/// case the data file is not touched. If the write fails after validation the
/// previous data file is restored; [`SmartPmError::RestoreFailed`] means that
/// restore failed as well.
pub fn import_file(
    data_file: &Path,
    import_path: &Path,
    strategy: ImportStrategy,
) -> Result<ImportReport> {
    let incoming = parse_import_document(read_json_value(import_path)?)?;
    debug!("Import document holds {}", incoming.counts());

    let (result, imported, skipped) = match strategy {
        ImportStrategy::Replace => {
            let counts = incoming.counts();
            (incoming, counts, ItemCounts::default())
        }
        ImportStrategy::Merge => {
            let mut store = DataStore::load(data_file)?;
            let (imported, skipped) = merge_into(&mut store, incoming);
            (store, imported, skipped)
        }
    };

    let snapshot = take_snapshot(data_file)?;
    let written = result.save(data_file).and_then(|()| {
        let reloaded = DataStore::load(data_file)?;
        if reloaded.counts() == result.counts() {
            Ok(())
        } else {
            Err(SmartPmError::invalid_import(
                "data file does not match the imported data after writing",
            ))
        }
    });

    if let Err(e) = written {
        warn!("Import failed, restoring {}: {}", data_file.display(), e);
        restore_snapshot(data_file, snapshot.as_deref())?;
        return Err(e);
    }

    if let Some(snapshot) = snapshot {
        if let Err(e) = fs::remove_file(&snapshot) {
            warn!("Could not remove {}: {}", snapshot.display(), e);
        }
    }

    info!(
        "Imported {} ({}) from {}",
        imported,
        strategy,
        import_path.display()
    );
    Ok(ImportReport {
        strategy,
        imported,
        skipped,
    })
}

fn snapshot_path(data_file: &Path) -> PathBuf {
    let mut name = data_file
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "data.json".into());
    name.push(IMPORT_SNAPSHOT_SUFFIX);
    data_file.with_file_name(name)
}

fn take_snapshot(data_file: &Path) -> Result<Option<PathBuf>> {
    if !data_file.exists() {
        return Ok(None);
    }
    let path = snapshot_path(data_file);
    fs::copy(data_file, &path)?;
    debug!("Saved pre-import copy to {}", path.display());
    Ok(Some(path))
}

fn restore_snapshot(data_file: &Path, snapshot: Option<&Path>) -> Result<()> {
    let restored = match snapshot {
        Some(snapshot) => fs::copy(snapshot, data_file)
            .and_then(|_| fs::remove_file(snapshot))
            .is_ok(),
        // Nothing existed before the import.
        None => !data_file.exists() || fs::remove_file(data_file).is_ok(),
    };

    if restored {
        Ok(())
    } else {
        Err(SmartPmError::RestoreFailed {
            path: data_file.to_path_buf(),
        })
    }
}

// ============================================================================
// Merge
// ============================================================================

/// Resolve a reference from the imported file.
///
/// Ids remapped during this merge win; otherwise an id that already exists in
/// the store is kept as is.
fn resolve<T>(
    remapped: &HashMap<String, String>,
    existing: &IndexMap<String, T>,
    id: &str,
) -> Option<String> {
    remapped
        .get(id)
        .cloned()
        .or_else(|| existing.contains_key(id).then(|| id.to_string()))
}

fn remap_labels(
    remapped: &HashMap<String, String>,
    existing: &IndexMap<String, Label>,
    ids: &[String],
) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(new_id) = resolve(remapped, existing, id) {
            if !out.contains(&new_id) {
                out.push(new_id);
            }
        }
    }
    out
}

/// Re-list children in the order the imported parent listed them, then
/// append children the parent did not list.
fn ordered_children(
    listed: &[String],
    remapped: &HashMap<String, String>,
    members: &[String],
) -> Vec<String> {
    let mut out: Vec<String> = listed
        .iter()
        .filter_map(|old| remapped.get(old))
        .filter(|new| members.contains(new))
        .cloned()
        .collect();
    for member in members {
        if !out.contains(member) {
            out.push(member.clone());
        }
    }
    out
}

/// Add every entity of `incoming` to `store` under a fresh id.
///
/// All references inside the imported data are rewritten to the new ids.
/// Returns the imported and skipped counts.
pub fn merge_into(store: &mut DataStore, incoming: DataStore) -> (ItemCounts, ItemCounts) {
    let mut imported = ItemCounts::default();
    let mut skipped = ItemCounts::default();

    let mut label_ids = HashMap::new();
    for (old_id, mut label) in incoming.labels {
        let new_id = models::new_id();
        label.id = new_id.clone();
        label_ids.insert(old_id, new_id.clone());
        store.labels.insert(new_id, label);
        imported.labels += 1;
    }

    let mut project_ids = HashMap::new();
    let mut listed_tasks = Vec::new();
    for (old_id, mut project) in incoming.projects {
        let new_id = models::new_id();
        project.id = new_id.clone();
        listed_tasks.push((new_id.clone(), std::mem::take(&mut project.tasks)));
        project_ids.insert(old_id, new_id.clone());
        store.projects.insert(new_id, project);
        imported.projects += 1;
    }

    let mut task_ids = HashMap::new();
    let mut listed_subtasks = Vec::new();
    for (old_id, mut task) in incoming.tasks {
        let Some(project_id) = resolve(&project_ids, &store.projects, &task.project_id) else {
            warn!(
                "Skipping imported task '{}': project {} not found",
                task.title, task.project_id
            );
            skipped.tasks += 1;
            continue;
        };

        let new_id = models::new_id();
        task.id = new_id.clone();
        task.project_id = project_id;
        task.labels = remap_labels(&label_ids, &store.labels, &task.labels);
        listed_subtasks.push((new_id.clone(), std::mem::take(&mut task.subtasks)));
        task_ids.insert(old_id, new_id.clone());
        store.tasks.insert(new_id, task);
        imported.tasks += 1;
    }

    let mut subtask_ids = HashMap::new();
    for (old_id, mut subtask) in incoming.subtasks {
        let Some(task_id) = resolve(&task_ids, &store.tasks, &subtask.task_id) else {
            warn!(
                "Skipping imported subtask '{}': task {} not found",
                subtask.title, subtask.task_id
            );
            skipped.subtasks += 1;
            continue;
        };

        let new_id = models::new_id();
        subtask.id = new_id.clone();
        subtask.task_id = task_id;
        subtask.labels = remap_labels(&label_ids, &store.labels, &subtask.labels);
        subtask_ids.insert(old_id, new_id.clone());
        store.subtasks.insert(new_id, subtask);
        imported.subtasks += 1;
    }

    // Child lists of imported parents follow the imported order.
    for (project_id, listed) in listed_tasks {
        let members: Vec<String> = store.tasks_of(&project_id).map(|t| t.id.clone()).collect();
        let ordered = ordered_children(&listed, &task_ids, &members);
        if let Some(project) = store.projects.get_mut(&project_id) {
            project.tasks = ordered;
        }
    }
    for (task_id, listed) in listed_subtasks {
        let members: Vec<String> = store.subtasks_of(&task_id).map(|s| s.id.clone()).collect();
        let ordered = ordered_children(&listed, &subtask_ids, &members);
        if let Some(task) = store.tasks.get_mut(&task_id) {
            task.subtasks = ordered;
        }
    }

    // Imported tasks under existing projects, and imported subtasks under
    // existing tasks, are appended to those parents.
    let new_task_ids: Vec<String> = task_ids.values().cloned().collect();
    for task_id in &new_task_ids {
        let Some(project_id) = store.tasks.get(task_id).map(|t| t.project_id.clone()) else {
            continue;
        };
        if let Some(project) = store.projects.get_mut(&project_id) {
            project.attach_task(task_id);
        }
    }
    let new_subtask_ids: Vec<String> = subtask_ids.values().cloned().collect();
    let mut touched_tasks: Vec<String> = Vec::new();
    for subtask_id in &new_subtask_ids {
        let task_id = store.subtasks.get(subtask_id).map(|s| s.task_id.clone());
        if let Some(task_id) = task_id {
            if let Some(task) = store.tasks.get_mut(&task_id) {
                task.attach_subtask(subtask_id);
            }
            if !touched_tasks.contains(&task_id) {
                touched_tasks.push(task_id);
            }
        }
    }
    for task_id in &touched_tasks {
        store.sync_task_completion(task_id);
    }

    debug!("Merged {} ({} skipped)", imported, skipped.total());
    (imported, skipped)
}
