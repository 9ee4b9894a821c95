use crate::model::item::{Folder, Task};
use crate::model::row::DisplayRow;
use crate::ops::placeholder::{PlaceholderKey, PlaceholderSnapshot};

/// Project folders plus pending placeholders into the ordered row list.
///
/// Order per folder: the folder row; then, only if it is expanded, each
/// task followed by its subtasks and its pending subtask row; then the
/// folder's pending task row. The pending folder row, if any, comes last.
pub fn flatten(folders: &[Folder], placeholders: &PlaceholderSnapshot) -> Vec<DisplayRow> {
    let mut rows = Vec::new();

    for folder in folders {
        rows.push(DisplayRow::folder(folder));
        if folder.is_expanded {
            flatten_folder_content(folder, placeholders, &mut rows);
        }
    }

    if let Some(row) = placeholders.get(&PlaceholderKey::Folder) {
        rows.push(row.clone());
    }

    rows
}

fn flatten_folder_content(
    folder: &Folder,
    placeholders: &PlaceholderSnapshot,
    rows: &mut Vec<DisplayRow>,
) {
    for task in &folder.tasks {
        flatten_task(task, &folder.id, placeholders, rows);
    }

    if let Some(row) = placeholders.get(&PlaceholderKey::task(&folder.id)) {
        rows.push(row.clone());
    }
}

fn flatten_task(
    task: &Task,
    folder_id: &str,
    placeholders: &PlaceholderSnapshot,
    rows: &mut Vec<DisplayRow>,
) {
    rows.push(DisplayRow::task(task, folder_id));
    for sub in &task.subtasks {
        rows.push(DisplayRow::subtask(sub, folder_id, &task.id));
    }

    if let Some(row) = placeholders.get(&PlaceholderKey::subtask(&task.id)) {
        rows.push(row.clone());
    }
}
