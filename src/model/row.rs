use serde::Serialize;

use super::item::{Folder, Item, ItemKind, Subtask, Task};

/// What a display row stands for.
///
/// Placeholder kinds mark rows that are still being titled and not yet in
/// the tree; they sit at the same depth as their committed counterparts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Folder,
    Task,
    Subtask,
    NewFolder,
    NewTask,
    NewSubtask,
}

impl RowKind {
    /// Nesting depth: 0 folder, 1 task, 2 subtask
    pub fn level(self) -> u8 {
        match self {
            RowKind::Folder | RowKind::NewFolder => 0,
            RowKind::Task | RowKind::NewTask => 1,
            RowKind::Subtask | RowKind::NewSubtask => 2,
        }
    }

    pub fn is_placeholder(self) -> bool {
        matches!(
            self,
            RowKind::NewFolder | RowKind::NewTask | RowKind::NewSubtask
        )
    }

    /// True for folder rows, committed or not
    pub fn is_folder_level(self) -> bool {
        self.level() == 0
    }

    /// True for task rows, committed or not
    pub fn is_task_level(self) -> bool {
        self.level() == 1
    }
}

/// One renderable line of the flattened tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRow {
    pub item: Item,
    pub kind: RowKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_folder_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<String>,
}

impl DisplayRow {
    pub fn folder(folder: &Folder) -> Self {
        DisplayRow {
            item: Item::Folder(folder.clone()),
            kind: RowKind::Folder,
            parent_folder_id: None,
            parent_task_id: None,
        }
    }

    pub fn task(task: &Task, folder_id: &str) -> Self {
        DisplayRow {
            item: Item::Task(task.clone()),
            kind: RowKind::Task,
            parent_folder_id: Some(folder_id.to_string()),
            parent_task_id: None,
        }
    }

    pub fn subtask(subtask: &Subtask, folder_id: &str, task_id: &str) -> Self {
        DisplayRow {
            item: Item::Subtask(subtask.clone()),
            kind: RowKind::Subtask,
            parent_folder_id: Some(folder_id.to_string()),
            parent_task_id: Some(task_id.to_string()),
        }
    }

    pub fn level(&self) -> u8 {
        self.kind.level()
    }

    pub fn id(&self) -> &str {
        self.item.id()
    }

    pub fn is_placeholder(&self) -> bool {
        self.kind.is_placeholder()
    }

    /// The committed folder this row is, if it is one
    pub fn as_folder(&self) -> Option<&Folder> {
        match (&self.item, self.kind) {
            (Item::Folder(f), RowKind::Folder) => Some(f),
            _ => None,
        }
    }

    pub fn item_kind(&self) -> ItemKind {
        self.item.kind()
    }
}
