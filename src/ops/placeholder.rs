use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;

use crate::model::item::{Folder, Item, Subtask, Task, Tree};
use crate::model::row::{DisplayRow, RowKind};

const NEW_FOLDER: &str = "new_folder";
const NEW_TASK_PREFIX: &str = "new_task_";
const NEW_SUBTASK_PREFIX: &str = "new_subtask_";

/// Identity of a pending "new item" row.
///
/// This is the only place the string keys are derived; both the registry
/// and the flattening engine look placeholders up through it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlaceholderKey {
    /// `new_folder`
    Folder,
    /// `new_task_<folder_id>`
    Task { folder_id: String },
    /// `new_subtask_<task_id>`
    Subtask { task_id: String },
}

impl PlaceholderKey {
    pub fn task(folder_id: &str) -> Self {
        PlaceholderKey::Task {
            folder_id: folder_id.to_string(),
        }
    }

    pub fn subtask(task_id: &str) -> Self {
        PlaceholderKey::Subtask {
            task_id: task_id.to_string(),
        }
    }

    pub fn as_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PlaceholderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaceholderKey::Folder => write!(f, "{}", NEW_FOLDER),
            PlaceholderKey::Task { folder_id } => write!(f, "{}{}", NEW_TASK_PREFIX, folder_id),
            PlaceholderKey::Subtask { task_id } => write!(f, "{}{}", NEW_SUBTASK_PREFIX, task_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a placeholder key: {0}")]
pub struct KeyParseError(pub String);

impl FromStr for PlaceholderKey {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == NEW_FOLDER {
            return Ok(PlaceholderKey::Folder);
        }
        if let Some(task_id) = s.strip_prefix(NEW_SUBTASK_PREFIX)
            && !task_id.is_empty()
        {
            return Ok(PlaceholderKey::subtask(task_id));
        }
        if let Some(folder_id) = s.strip_prefix(NEW_TASK_PREFIX)
            && !folder_id.is_empty()
        {
            return Ok(PlaceholderKey::task(folder_id));
        }
        Err(KeyParseError(s.to_string()))
    }
}

/// Result of [`PlaceholderRegistry::put`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Inserted,
    AlreadyExists,
}

/// Pending "new item" rows that are not yet part of the tree.
///
/// Holds at most one entry per key. Entries keep insertion order so that
/// snapshots are deterministic.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderRegistry {
    entries: IndexMap<String, DisplayRow>,
}

impl PlaceholderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a row under `key` unless one is already pending.
    pub fn put(&mut self, key: &PlaceholderKey, row: DisplayRow) -> PutOutcome {
        let key = key.as_key();
        if self.entries.contains_key(&key) {
            return PutOutcome::AlreadyExists;
        }
        self.entries.insert(key, row);
        PutOutcome::Inserted
    }

    /// Drop the entry for `key`, if any.
    pub fn remove(&mut self, key: &PlaceholderKey) -> Option<DisplayRow> {
        self.entries.shift_remove(&key.as_key())
    }

    pub fn contains(&self, key: &PlaceholderKey) -> bool {
        self.entries.contains_key(&key.as_key())
    }

    pub fn get(&self, key: &PlaceholderKey) -> Option<&DisplayRow> {
        self.entries.get(&key.as_key())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// An owned copy of every entry for the flattening engine
    pub fn snapshot(&self) -> PlaceholderSnapshot {
        PlaceholderSnapshot {
            entries: self.entries.clone(),
        }
    }

    /// Drop entries whose parent folder or task is no longer in `tree`.
    pub fn retain_parents(&mut self, tree: &Tree) {
        self.entries.retain(|_, row| match row.kind {
            RowKind::NewTask => row
                .parent_folder_id
                .as_deref()
                .is_some_and(|id| tree.folder(id).is_some()),
            RowKind::NewSubtask => row
                .parent_task_id
                .as_deref()
                .is_some_and(|id| tree.task(id).is_some()),
            _ => true,
        });
    }
}

/// Immutable view of the registry taken before flattening
#[derive(Debug, Clone, Default)]
pub struct PlaceholderSnapshot {
    entries: IndexMap<String, DisplayRow>,
}

impl PlaceholderSnapshot {
    pub fn get(&self, key: &PlaceholderKey) -> Option<&DisplayRow> {
        self.entries.get(&key.as_key())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Row builders
// ---------------------------------------------------------------------------

/// The pending row for a new folder
pub fn new_folder_row(title: &str) -> DisplayRow {
    DisplayRow {
        item: Item::Folder(Folder::new(PlaceholderKey::Folder.as_key(), title)),
        kind: RowKind::NewFolder,
        parent_folder_id: None,
        parent_task_id: None,
    }
}

/// The pending row for a new task in `folder_id`
pub fn new_task_row(folder_id: &str, title: &str) -> DisplayRow {
    let key = PlaceholderKey::task(folder_id).as_key();
    DisplayRow {
        item: Item::Task(Task::new(key, title)),
        kind: RowKind::NewTask,
        parent_folder_id: Some(folder_id.to_string()),
        parent_task_id: None,
    }
}

/// The pending row for a new subtask of `task_id` in `folder_id`
pub fn new_subtask_row(folder_id: &str, task_id: &str, title: &str) -> DisplayRow {
    let key = PlaceholderKey::subtask(task_id).as_key();
    DisplayRow {
        item: Item::Subtask(Subtask::new(key, title)),
        kind: RowKind::NewSubtask,
        parent_folder_id: Some(folder_id.to_string()),
        parent_task_id: Some(task_id.to_string()),
    }
}
