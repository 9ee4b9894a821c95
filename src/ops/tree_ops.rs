use chrono::{DateTime, Utc};

use crate::model::item::{Folder, ItemKind, Subtask, Task, Tree};
use crate::ops::ids::IdGenerator;

/// A delete address whose parent ids do not describe any level of the tree
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("parent task {task_id} given without a parent folder")]
    TaskWithoutFolder { task_id: String },
}

/// Where an item sits in the tree, as told by its parent ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemAddress<'a> {
    /// A root-level folder
    Folder,
    /// A task inside `folder_id`
    Task { folder_id: &'a str },
    /// A subtask inside `task_id` inside `folder_id`
    Subtask { folder_id: &'a str, task_id: &'a str },
}

impl<'a> ItemAddress<'a> {
    /// Resolve the parent-id combination used by delete requests
    pub fn from_parents(
        parent_folder_id: Option<&'a str>,
        parent_task_id: Option<&'a str>,
    ) -> Result<Self, AddressError> {
        match (parent_folder_id, parent_task_id) {
            (None, None) => Ok(ItemAddress::Folder),
            (Some(folder_id), None) => Ok(ItemAddress::Task { folder_id }),
            (Some(folder_id), Some(task_id)) => Ok(ItemAddress::Subtask { folder_id, task_id }),
            (None, Some(task_id)) => Err(AddressError::TaskWithoutFolder {
                task_id: task_id.to_string(),
            }),
        }
    }

    pub fn kind(&self) -> ItemKind {
        match self {
            ItemAddress::Folder => ItemKind::Folder,
            ItemAddress::Task { .. } => ItemKind::Task,
            ItemAddress::Subtask { .. } => ItemKind::Subtask,
        }
    }
}

// ---------------------------------------------------------------------------
// Toggles
// ---------------------------------------------------------------------------

/// Flip completion on the task or subtask with `target_id`.
pub fn toggle_completion(mut tree: Tree, target_id: &str) -> Tree {
    edit::toggle_completion(&mut tree, target_id);
    tree
}

/// Flip `is_expanded` on the folder with `folder_id`.
pub fn toggle_folder_expansion(mut tree: Tree, folder_id: &str) -> Tree {
    edit::toggle_folder_expansion(&mut tree, folder_id);
    tree
}

/// Set `is_expanded` explicitly. Used by the CLI's `expand`/`collapse`.
pub fn set_folder_expanded(mut tree: Tree, folder_id: &str, expanded: bool) -> Tree {
    edit::set_folder_expanded(&mut tree, folder_id, expanded);
    tree
}

// ---------------------------------------------------------------------------
// Adds
// ---------------------------------------------------------------------------

/// Append a task to a folder. Returns the new tree and the id of the new
/// task, or `None` when the title is blank, the folder does not exist, or
/// no id is left to hand out.
pub fn add_task(
    mut tree: Tree,
    folder_id: &str,
    title: &str,
    ids: &mut IdGenerator,
) -> (Tree, Option<String>) {
    let title = title.trim();
    if title.is_empty() || tree.folder(folder_id).is_none() {
        return (tree, None);
    }
    let Some(id) = fresh_id(&tree, ids, ItemKind::Task) else {
        return (tree, None);
    };
    if let Some(folder) = folder_mut(&mut tree, folder_id) {
        folder.tasks.push(Task::new(id.clone(), title));
    }
    (tree, Some(id))
}

/// Append a subtask to `task_id` inside `folder_id`.
pub fn add_subtask(
    mut tree: Tree,
    folder_id: &str,
    task_id: &str,
    title: &str,
    ids: &mut IdGenerator,
) -> (Tree, Option<String>) {
    let title = title.trim();
    let parent_exists = tree
        .folder(folder_id)
        .is_some_and(|f| f.tasks.iter().any(|t| t.id == task_id));
    if title.is_empty() || !parent_exists {
        return (tree, None);
    }
    let Some(id) = fresh_id(&tree, ids, ItemKind::Subtask) else {
        return (tree, None);
    };
    if let Some(task) = task_in_folder_mut(&mut tree, folder_id, task_id) {
        task.subtasks.push(Subtask::new(id.clone(), title));
    }
    (tree, Some(id))
}

/// Append a collapsed, empty folder to the root sequence.
pub fn add_folder(mut tree: Tree, title: &str, ids: &mut IdGenerator) -> (Tree, Option<String>) {
    let title = title.trim();
    if title.is_empty() {
        return (tree, None);
    }
    let Some(id) = fresh_id(&tree, ids, ItemKind::Folder) else {
        return (tree, None);
    };
    let mut folder = Folder::new(id.clone(), title);
    folder.is_expanded = false;
    tree.folders.push(folder);
    (tree, Some(id))
}

// ---------------------------------------------------------------------------
// Edits
// ---------------------------------------------------------------------------

/// Retitle the task (or, failing that, the subtask) with `target_id`.
pub fn rename_item(mut tree: Tree, target_id: &str, new_title: &str) -> Tree {
    edit::rename_item(&mut tree, target_id, new_title);
    tree
}

/// Retitle the folder with `folder_id`.
pub fn rename_folder(mut tree: Tree, folder_id: &str, new_title: &str) -> Tree {
    edit::rename_folder(&mut tree, folder_id, new_title);
    tree
}

/// Set or clear a task's due date.
pub fn set_due_date(mut tree: Tree, task_id: &str, due: Option<DateTime<Utc>>) -> Tree {
    edit::set_due_date(&mut tree, task_id, due);
    tree
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// Remove an item addressed by its parent ids. Children go with it.
///
/// A parent task without a parent folder is not an address; the tree is
/// returned unchanged.
pub fn delete_item(
    tree: Tree,
    item_id: &str,
    parent_folder_id: Option<&str>,
    parent_task_id: Option<&str>,
) -> Tree {
    match ItemAddress::from_parents(parent_folder_id, parent_task_id) {
        Ok(address) => delete_at(tree, item_id, address),
        Err(_) => tree,
    }
}

/// Remove an item at an already-resolved address.
pub fn delete_at(mut tree: Tree, item_id: &str, address: ItemAddress<'_>) -> Tree {
    edit::delete_at(&mut tree, item_id, address);
    tree
}

// ---------------------------------------------------------------------------
// In-place edits
// ---------------------------------------------------------------------------

/// The edits above, applied to a borrowed tree. Each returns whether the
/// tree changed, so owners holding one tree need not compare copies.
pub mod edit {
    use chrono::{DateTime, Utc};

    use super::{ItemAddress, Leaf, folder_mut, task_in_folder_mut, task_or_subtask_mut};
    use crate::model::item::Tree;

    pub fn toggle_completion(tree: &mut Tree, target_id: &str) -> bool {
        let Some(item) = task_or_subtask_mut(tree, target_id) else {
            return false;
        };
        let flag = match item {
            Leaf::Task(task) => &mut task.is_completed,
            Leaf::Subtask(sub) => &mut sub.is_completed,
        };
        *flag = !*flag;
        true
    }

    pub fn toggle_folder_expansion(tree: &mut Tree, folder_id: &str) -> bool {
        let Some(folder) = folder_mut(tree, folder_id) else {
            return false;
        };
        folder.is_expanded = !folder.is_expanded;
        true
    }

    pub fn set_folder_expanded(tree: &mut Tree, folder_id: &str, expanded: bool) -> bool {
        match folder_mut(tree, folder_id) {
            Some(folder) if folder.is_expanded != expanded => {
                folder.is_expanded = expanded;
                true
            }
            _ => false,
        }
    }

    pub fn rename_item(tree: &mut Tree, target_id: &str, new_title: &str) -> bool {
        let new_title = new_title.trim();
        if new_title.is_empty() {
            return false;
        }
        let Some(item) = task_or_subtask_mut(tree, target_id) else {
            return false;
        };
        let title = match item {
            Leaf::Task(task) => &mut task.title,
            Leaf::Subtask(sub) => &mut sub.title,
        };
        replace_title(title, new_title)
    }

    pub fn rename_folder(tree: &mut Tree, folder_id: &str, new_title: &str) -> bool {
        let new_title = new_title.trim();
        if new_title.is_empty() {
            return false;
        }
        match folder_mut(tree, folder_id) {
            Some(folder) => replace_title(&mut folder.title, new_title),
            None => false,
        }
    }

    fn replace_title(title: &mut String, new_title: &str) -> bool {
        if title.as_str() == new_title {
            return false;
        }
        *title = new_title.to_string();
        true
    }

    pub fn set_due_date(tree: &mut Tree, task_id: &str, due: Option<DateTime<Utc>>) -> bool {
        let task = tree
            .folders
            .iter_mut()
            .flat_map(|f| f.tasks.iter_mut())
            .find(|t| t.id == task_id);
        match task {
            Some(task) if task.due_date != due => {
                task.due_date = due;
                true
            }
            _ => false,
        }
    }

    pub fn delete_at(tree: &mut Tree, item_id: &str, address: ItemAddress<'_>) -> bool {
        match address {
            ItemAddress::Folder => remove_by_id(&mut tree.folders, item_id, |f| &f.id),
            ItemAddress::Task { folder_id } => match folder_mut(tree, folder_id) {
                Some(folder) => remove_by_id(&mut folder.tasks, item_id, |t| &t.id),
                None => false,
            },
            ItemAddress::Subtask { folder_id, task_id } => {
                match task_in_folder_mut(tree, folder_id, task_id) {
                    Some(task) => remove_by_id(&mut task.subtasks, item_id, |s| &s.id),
                    None => false,
                }
            }
        }
    }

    fn remove_by_id<T>(items: &mut Vec<T>, id: &str, id_of: impl Fn(&T) -> &String) -> bool {
        let before = items.len();
        items.retain(|item| id_of(item) != id);
        items.len() != before
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn folder_mut<'a>(tree: &'a mut Tree, folder_id: &str) -> Option<&'a mut Folder> {
    tree.folders.iter_mut().find(|f| f.id == folder_id)
}

fn task_in_folder_mut<'a>(
    tree: &'a mut Tree,
    folder_id: &str,
    task_id: &str,
) -> Option<&'a mut Task> {
    folder_mut(tree, folder_id)?
        .tasks
        .iter_mut()
        .find(|t| t.id == task_id)
}

/// A task or subtask found by id
enum Leaf<'a> {
    Task(&'a mut Task),
    Subtask(&'a mut Subtask),
}

/// Search each task, then that task's subtasks, in tree order
fn task_or_subtask_mut<'a>(tree: &'a mut Tree, id: &str) -> Option<Leaf<'a>> {
    for task in tree.folders.iter_mut().flat_map(|f| f.tasks.iter_mut()) {
        if task.id == id {
            return Some(Leaf::Task(task));
        }
        if let Some(sub) = task.subtasks.iter_mut().find(|s| s.id == id) {
            return Some(Leaf::Subtask(sub));
        }
    }
    None
}

fn fresh_id(tree: &Tree, ids: &mut IdGenerator, kind: ItemKind) -> Option<String> {
    ids.observe_tree(tree);
    ids.next_id(kind)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
