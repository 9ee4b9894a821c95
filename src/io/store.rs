use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::io::recovery::{self, RecoveryCategory, RecoveryEntry};
use crate::model::item::{Folder, ItemKind, Subtask, Task, Tree};
use crate::ops::ids::trailing_number;

/// Path prefix under which records are addressed
pub const API_PREFIX: &str = "/api/v1";

const STORE_FILE: &str = "store.json";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRecord {
    pub id: u64,
    pub name: String,
    pub expanded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub id: u64,
    pub folder_id: u64,
    pub name: String,
    pub checked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskRecord {
    pub id: u64,
    pub task_id: u64,
    pub name: String,
    pub checked: bool,
}

/// The three record collections, as kept in `twig/store.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDoc {
    /// Next id to hand out; shared by all three collections
    #[serde(default)]
    pub next_id: u64,
    #[serde(default)]
    pub folders: Vec<FolderRecord>,
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
    #[serde(default)]
    pub subtasks: Vec<SubtaskRecord>,
}

/// One of the record collections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Folders,
    Tasks,
    Subtasks,
}

impl Resource {
    pub fn name(self) -> &'static str {
        match self {
            Resource::Folders => "folders",
            Resource::Tasks => "tasks",
            Resource::Subtasks => "subtasks",
        }
    }

    /// `/api/v1/<name>/<id>`
    pub fn location(self, id: u64) -> String {
        format!("{}/{}/{}", API_PREFIX, self.name(), id)
    }

    fn kind(self) -> ItemKind {
        match self {
            Resource::Folders => ItemKind::Folder,
            Resource::Tasks => ItemKind::Task,
            Resource::Subtasks => ItemKind::Subtask,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{resource} {id} not found")]
    NotFound { resource: Resource, id: u64 },
    #[error("could not read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not encode store: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("no ids left: the sequence has reached {}", u64::MAX)]
    IdsExhausted,
}

fn not_found(resource: Resource, id: u64) -> StoreError {
    StoreError::NotFound { resource, id }
}

// ---------------------------------------------------------------------------
// Create/update inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct FolderPatch {
    pub name: Option<String>,
    pub expanded: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub folder_id: Option<u64>,
    pub name: Option<String>,
    pub checked: Option<bool>,
    /// `Some(None)` clears the due date
    pub due: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, Default)]
pub struct SubtaskPatch {
    pub task_id: Option<u64>,
    pub name: Option<String>,
    pub checked: Option<bool>,
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

impl StoreDoc {
    fn max_id(&self) -> u64 {
        let folders = self.folders.iter().map(|r| r.id);
        let tasks = self.tasks.iter().map(|r| r.id);
        let subtasks = self.subtasks.iter().map(|r| r.id);
        folders.chain(tasks).chain(subtasks).max().unwrap_or(0)
    }

    /// Take the next id from the shared sequence.
    ///
    /// `next_id` stays at `u64::MAX` once that id is taken; a record holding
    /// it means nothing is left.
    pub fn allocate_id(&mut self) -> Result<u64, StoreError> {
        let above_max = self
            .max_id()
            .checked_add(1)
            .ok_or(StoreError::IdsExhausted)?;
        let id = self.next_id.max(above_max).max(1);
        self.next_id = id.saturating_add(1);
        Ok(id)
    }

    pub fn folder(&self, id: u64) -> Result<&FolderRecord, StoreError> {
        self.folders
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found(Resource::Folders, id))
    }

    pub fn task(&self, id: u64) -> Result<&TaskRecord, StoreError> {
        self.tasks
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found(Resource::Tasks, id))
    }

    pub fn subtask(&self, id: u64) -> Result<&SubtaskRecord, StoreError> {
        self.subtasks
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found(Resource::Subtasks, id))
    }

    pub fn create_folder(&mut self, name: &str, expanded: bool) -> Result<FolderRecord, StoreError> {
        let record = FolderRecord {
            id: self.allocate_id()?,
            name: name.to_string(),
            expanded,
        };
        self.folders.push(record.clone());
        Ok(record)
    }

    /// Fails when `folder_id` does not exist.
    pub fn create_task(
        &mut self,
        folder_id: u64,
        name: &str,
        checked: bool,
        due: Option<DateTime<Utc>>,
    ) -> Result<TaskRecord, StoreError> {
        self.folder(folder_id)?;
        let record = TaskRecord {
            id: self.allocate_id()?,
            folder_id,
            name: name.to_string(),
            checked,
            due,
        };
        self.tasks.push(record.clone());
        Ok(record)
    }

    /// Fails when `task_id` does not exist.
    pub fn create_subtask(
        &mut self,
        task_id: u64,
        name: &str,
        checked: bool,
    ) -> Result<SubtaskRecord, StoreError> {
        self.task(task_id)?;
        let record = SubtaskRecord {
            id: self.allocate_id()?,
            task_id,
            name: name.to_string(),
            checked,
        };
        self.subtasks.push(record.clone());
        Ok(record)
    }

    pub fn update_folder(&mut self, id: u64, patch: FolderPatch) -> Result<FolderRecord, StoreError> {
        let record = self
            .folders
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found(Resource::Folders, id))?;
        if let Some(name) = patch.name {
            record.name = name;
        }
        if let Some(expanded) = patch.expanded {
            record.expanded = expanded;
        }
        Ok(record.clone())
    }

    /// Moving a task to another folder requires that folder to exist.
    pub fn update_task(&mut self, id: u64, patch: TaskPatch) -> Result<TaskRecord, StoreError> {
        if let Some(folder_id) = patch.folder_id {
            self.folder(folder_id)?;
        }
        let record = self
            .tasks
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found(Resource::Tasks, id))?;
        if let Some(folder_id) = patch.folder_id {
            record.folder_id = folder_id;
        }
        if let Some(name) = patch.name {
            record.name = name;
        }
        if let Some(checked) = patch.checked {
            record.checked = checked;
        }
        if let Some(due) = patch.due {
            record.due = due;
        }
        Ok(record.clone())
    }

    pub fn update_subtask(
        &mut self,
        id: u64,
        patch: SubtaskPatch,
    ) -> Result<SubtaskRecord, StoreError> {
        if let Some(task_id) = patch.task_id {
            self.task(task_id)?;
        }
        let record = self
            .subtasks
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found(Resource::Subtasks, id))?;
        if let Some(task_id) = patch.task_id {
            record.task_id = task_id;
        }
        if let Some(name) = patch.name {
            record.name = name;
        }
        if let Some(checked) = patch.checked {
            record.checked = checked;
        }
        Ok(record.clone())
    }

    /// Remove a folder with its tasks and their subtasks.
    pub fn delete_folder(&mut self, id: u64) -> Result<FolderRecord, StoreError> {
        let index = self
            .folders
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| not_found(Resource::Folders, id))?;
        let removed = self.folders.remove(index);
        let task_ids: Vec<u64> = self
            .tasks
            .iter()
            .filter(|t| t.folder_id == id)
            .map(|t| t.id)
            .collect();
        self.tasks.retain(|t| t.folder_id != id);
        self.subtasks.retain(|s| !task_ids.contains(&s.task_id));
        Ok(removed)
    }

    /// Remove a task with its subtasks.
    pub fn delete_task(&mut self, id: u64) -> Result<TaskRecord, StoreError> {
        let index = self
            .tasks
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| not_found(Resource::Tasks, id))?;
        let removed = self.tasks.remove(index);
        self.subtasks.retain(|s| s.task_id != id);
        Ok(removed)
    }

    pub fn delete_subtask(&mut self, id: u64) -> Result<SubtaskRecord, StoreError> {
        let index = self
            .subtasks
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| not_found(Resource::Subtasks, id))?;
        Ok(self.subtasks.remove(index))
    }
}

// ---------------------------------------------------------------------------
// Tree conversion
// ---------------------------------------------------------------------------

/// The tree id of a record: `folder_3`, `task_7`, ...
pub fn tree_id(resource: Resource, record_id: u64) -> String {
    format!("{}_{}", resource.kind(), record_id)
}

impl StoreDoc {
    /// Assemble the tree. Records whose parent is missing are left out.
    pub fn to_tree(&self) -> Tree {
        let mut folders: Vec<Folder> = self
            .folders
            .iter()
            .map(|r| {
                let mut folder = Folder::new(tree_id(Resource::Folders, r.id), &r.name);
                folder.is_expanded = r.expanded;
                folder
            })
            .collect();

        let folder_index: HashMap<u64, usize> = self
            .folders
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id, i))
            .collect();
        let mut task_slot: HashMap<u64, (usize, usize)> = HashMap::new();

        for record in &self.tasks {
            let Some(&fi) = folder_index.get(&record.folder_id) else {
                continue;
            };
            let mut task = Task::new(tree_id(Resource::Tasks, record.id), &record.name);
            task.is_completed = record.checked;
            task.due_date = record.due;
            task_slot.insert(record.id, (fi, folders[fi].tasks.len()));
            folders[fi].tasks.push(task);
        }

        for record in &self.subtasks {
            let Some(&(fi, ti)) = task_slot.get(&record.task_id) else {
                continue;
            };
            let mut sub = Subtask::new(tree_id(Resource::Subtasks, record.id), &record.name);
            sub.is_completed = record.checked;
            folders[fi].tasks[ti].subtasks.push(sub);
        }

        Tree::new(folders)
    }

    /// Build the record collections for `tree`. Tree ids keep their numbers;
    /// an id without a trailing number gets a fresh one, which fails once the
    /// tree already holds `u64::MAX`.
    pub fn from_tree(tree: &Tree, next_id: u64) -> Result<StoreDoc, StoreError> {
        let mut doc = StoreDoc {
            next_id,
            ..StoreDoc::default()
        };
        let mut exhausted = false;
        tree.for_each_id(&mut |id| {
            if let Some(n) = trailing_number(id) {
                match n.checked_add(1) {
                    Some(above) => doc.next_id = doc.next_id.max(above),
                    None => {
                        doc.next_id = u64::MAX;
                        exhausted = true;
                    }
                }
            }
        });

        let record_id = |doc: &mut StoreDoc, id: &str| match trailing_number(id) {
            Some(n) => Ok(n),
            None if exhausted => Err(StoreError::IdsExhausted),
            None => doc.allocate_id(),
        };

        for folder in &tree.folders {
            let folder_id = record_id(&mut doc, &folder.id)?;
            doc.folders.push(FolderRecord {
                id: folder_id,
                name: folder.title.clone(),
                expanded: folder.is_expanded,
            });
            for task in &folder.tasks {
                let task_id = record_id(&mut doc, &task.id)?;
                doc.tasks.push(TaskRecord {
                    id: task_id,
                    folder_id,
                    name: task.title.clone(),
                    checked: task.is_completed,
                    due: task.due_date,
                });
                for sub in &task.subtasks {
                    let sub_id = record_id(&mut doc, &sub.id)?;
                    doc.subtasks.push(SubtaskRecord {
                        id: sub_id,
                        task_id,
                        name: sub.title.clone(),
                        checked: sub.is_completed,
                    });
                }
            }
        }

        Ok(doc)
    }
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

pub fn store_path(twig_dir: &Path) -> PathBuf {
    twig_dir.join(STORE_FILE)
}

/// Read `twig/store.json`. A missing file is an empty store; an unreadable
/// one is copied into the recovery log before the error is returned.
pub fn load_store(twig_dir: &Path) -> Result<StoreDoc, StoreError> {
    let path = store_path(twig_dir);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(StoreDoc::default()),
        Err(source) => return Err(StoreError::Read { path, source }),
    };

    serde_json::from_str(&content).map_err(|source| {
        recovery::log_recovery(
            twig_dir,
            RecoveryEntry::new(RecoveryCategory::Parser, "store unreadable")
                .field("Source", STORE_FILE)
                .field("Error", source.to_string())
                .body(content.as_str()),
        );
        StoreError::Parse { path, source }
    })
}

/// Write `twig/store.json` atomically. On failure the unsaved JSON goes to
/// the recovery log.
pub fn save_store(twig_dir: &Path, doc: &StoreDoc) -> Result<(), StoreError> {
    let path = store_path(twig_dir);
    let mut content = serde_json::to_string_pretty(doc)?;
    content.push('\n');

    recovery::atomic_write(&path, content.as_bytes()).map_err(|source| {
        recovery::log_recovery(
            twig_dir,
            RecoveryEntry::new(RecoveryCategory::Write, "store write failed")
                .field("Target", STORE_FILE)
                .field("Error", source.to_string())
                .body(content.as_str()),
        );
        StoreError::Write { path, source }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::recovery::read_recovery_entries;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    /// Home(1): Clean(2) [Phone(3)], Report(5); Work(4)
    fn sample_doc() -> StoreDoc {
        let mut doc = StoreDoc::default();
        let home = doc.create_folder("Home", true).unwrap();
        let clean = doc.create_task(home.id, "Clean", false, None).unwrap();
        doc.create_subtask(clean.id, "Phone", true).unwrap();
        doc.create_folder("Work", false).unwrap();
        doc.create_task(home.id, "Report", false, None).unwrap();
        doc
    }

    #[test]
    fn ids_come_from_one_sequence() {
        let doc = sample_doc();
        let mut ids: Vec<u64> = doc.folders.iter().map(|r| r.id).collect();
        ids.extend(doc.tasks.iter().map(|r| r.id));
        ids.extend(doc.subtasks.iter().map(|r| r.id));
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        assert_eq!(doc.next_id, 6);
    }

    #[test]
    fn create_under_missing_parent_is_not_found() {
        let mut doc = sample_doc();
        let err = doc.create_task(99, "x", false, None).unwrap_err();
        assert!(matches!(
            err,
            StoreError::NotFound {
                resource: Resource::Folders,
                id: 99
            }
        ));
        assert!(doc.create_subtask(1, "x", false).is_err());
        assert_eq!(err.to_string(), "folder 99 not found");
    }

    #[test]
    fn update_patches_only_given_fields() {
        let mut doc = sample_doc();
        let updated = doc
            .update_task(
                2,
                TaskPatch {
                    checked: Some(true),
                    ..TaskPatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Clean");
        assert!(updated.checked);
        assert!(doc.update_folder(42, FolderPatch::default()).is_err());
        assert!(
            doc.update_task(
                2,
                TaskPatch {
                    folder_id: Some(42),
                    ..TaskPatch::default()
                }
            )
            .is_err()
        );
    }

    #[test]
    fn delete_folder_cascades() {
        let mut doc = sample_doc();
        doc.delete_folder(1).unwrap();
        assert_eq!(doc.folders.len(), 1);
        assert!(doc.tasks.is_empty());
        assert!(doc.subtasks.is_empty());
        assert!(doc.delete_folder(1).is_err());
    }

    #[test]
    fn delete_task_cascades_subtasks() {
        let mut doc = sample_doc();
        doc.delete_task(2).unwrap();
        assert!(doc.subtasks.is_empty());
        assert_eq!(doc.tasks.len(), 1);
        assert!(doc.delete_subtask(3).is_err());
    }

    #[test]
    fn deleted_ids_are_not_reused() {
        let mut doc = sample_doc();
        doc.delete_task(5).unwrap();
        let record = doc.create_folder("Errands", false).unwrap();
        assert_eq!(record.id, 6);
    }

    #[test]
    fn largest_id_is_the_last_one_handed_out() {
        let mut doc = StoreDoc {
            next_id: u64::MAX,
            ..StoreDoc::default()
        };
        let folder = doc.create_folder("Last", true).unwrap();
        assert_eq!(folder.id, u64::MAX);
        assert!(matches!(
            doc.create_task(folder.id, "x", false, None),
            Err(StoreError::IdsExhausted)
        ));
        assert!(matches!(
            doc.create_folder("More", false),
            Err(StoreError::IdsExhausted)
        ));
        assert_eq!(doc.folders.len(), 1);
        assert!(doc.tasks.is_empty());
    }

    #[test]
    fn record_holding_largest_id_blocks_creates() {
        let mut doc = sample_doc();
        doc.folders.push(FolderRecord {
            id: u64::MAX,
            name: "imported".into(),
            expanded: false,
        });
        assert!(matches!(doc.allocate_id(), Err(StoreError::IdsExhausted)));
    }

    #[test]
    fn tree_with_largest_id_converts_without_overflow() {
        let mut tree = sample_doc().to_tree();
        tree.folders[0]
            .tasks
            .push(Task::new(format!("task_{}", u64::MAX), "last"));
        let doc = StoreDoc::from_tree(&tree, 6).unwrap();
        assert_eq!(doc.next_id, u64::MAX);
        assert!(doc.tasks.iter().any(|r| r.id == u64::MAX));

        tree.folders[1].tasks.push(Task::new("unnumbered", "x"));
        assert!(matches!(
            StoreDoc::from_tree(&tree, 6),
            Err(StoreError::IdsExhausted)
        ));
    }

    #[test]
    fn tree_groups_records_under_parents() {
        let tree = sample_doc().to_tree();
        let ids: Vec<&str> = tree.folders.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["folder_1", "folder_4"]);
        let home = &tree.folders[0];
        assert!(home.is_expanded);
        assert_eq!(home.tasks[0].id, "task_2");
        assert_eq!(home.tasks[1].title, "Report");
        assert_eq!(home.tasks[0].subtasks[0].id, "subtask_3");
        assert!(home.tasks[0].subtasks[0].is_completed);
        assert!(!tree.folders[1].is_expanded);
    }

    #[test]
    fn orphans_are_left_out_of_the_tree() {
        let mut doc = sample_doc();
        doc.tasks.push(TaskRecord {
            id: 77,
            folder_id: 1234,
            name: "lost".into(),
            checked: false,
            due: None,
        });
        let tree = doc.to_tree();
        assert!(tree.task("task_77").is_none());
    }

    #[test]
    fn tree_converts_back_to_same_records() {
        let doc = sample_doc();
        assert_eq!(StoreDoc::from_tree(&doc.to_tree(), doc.next_id).unwrap(), doc);
    }

    #[test]
    fn record_json_shape() {
        let mut doc = StoreDoc::default();
        let folder = doc.create_folder("Home", true).unwrap();
        let task = doc.create_task(folder.id, "Milk", false, None).unwrap();
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"id": 2, "folderId": 1, "name": "Milk", "checked": false})
        );
        assert_eq!(Resource::Tasks.location(task.id), "/api/v1/tasks/2");
    }

    #[test]
    fn load_missing_store_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(load_store(tmp.path()).unwrap(), StoreDoc::default());
    }

    #[test]
    fn save_then_load() {
        let tmp = TempDir::new().unwrap();
        let doc = sample_doc();
        save_store(tmp.path(), &doc).unwrap();
        assert_eq!(load_store(tmp.path()).unwrap(), doc);
    }

    #[test]
    fn malformed_store_is_logged() {
        let tmp = TempDir::new().unwrap();
        fs::write(store_path(tmp.path()), "{ not json").unwrap();
        assert!(matches!(
            load_store(tmp.path()),
            Err(StoreError::Parse { .. })
        ));
        let entries = read_recovery_entries(tmp.path(), None, None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, RecoveryCategory::Parser);
        assert_eq!(entries[0].body, "{ not json");
    }
}
