use crate::model::item::Item;
use crate::model::row::DisplayRow;

/// Where a new placeholder row goes in the current row list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionPlan {
    /// Insert before the row currently at this index (or append at `len`)
    At(usize),
    /// The parent folder is collapsed; expand it and plan again once the
    /// expanded rows have been flattened
    ExpandRequired,
    /// The parent is not in the row list
    NotFound,
}

impl InsertionPlan {
    pub fn index(self) -> Option<usize> {
        match self {
            InsertionPlan::At(i) => Some(i),
            _ => None,
        }
    }
}

/// Whether `folder_id` is shown, and if so whether it is expanded
fn folder_state(rows: &[DisplayRow], folder_id: &str) -> Option<(usize, bool)> {
    rows.iter().enumerate().find_map(|(i, row)| match row.as_folder() {
        Some(folder) if folder.id == folder_id => Some((i, folder.is_expanded)),
        _ => None,
    })
}

/// Plan a new task row at the end of `folder_id`'s block.
pub fn plan_task_insertion(rows: &[DisplayRow], folder_id: &str) -> InsertionPlan {
    let Some((folder_index, expanded)) = folder_state(rows, folder_id) else {
        return InsertionPlan::NotFound;
    };
    if !expanded {
        return InsertionPlan::ExpandRequired;
    }

    let end = rows[folder_index + 1..]
        .iter()
        .position(|row| row.kind.is_folder_level())
        .map_or(rows.len(), |offset| folder_index + 1 + offset);
    InsertionPlan::At(end)
}

/// Plan a new subtask row after the last subtask of `task_id`.
pub fn plan_subtask_insertion(rows: &[DisplayRow], folder_id: &str, task_id: &str) -> InsertionPlan {
    let Some((_, expanded)) = folder_state(rows, folder_id) else {
        return InsertionPlan::NotFound;
    };
    if !expanded {
        return InsertionPlan::ExpandRequired;
    }

    let task_index = rows.iter().position(|row| {
        matches!(row.item, Item::Task(_))
            && !row.is_placeholder()
            && row.id() == task_id
            && row.parent_folder_id.as_deref() == Some(folder_id)
    });
    let Some(task_index) = task_index else {
        return InsertionPlan::NotFound;
    };

    let end = rows[task_index + 1..]
        .iter()
        .position(|row| row.kind.is_folder_level() || row.kind.is_task_level())
        .map_or(rows.len(), |offset| task_index + 1 + offset);
    InsertionPlan::At(end)
}

/// A new folder row always goes at the end of the list.
pub fn plan_folder_insertion(rows: &[DisplayRow]) -> usize {
    rows.len()
}
