use chrono::NaiveDate;
use serde::Serialize;

use crate::model::item::{Item, ItemKind};
use crate::model::row::{DisplayRow, RowKind};
use crate::ops::search::SearchHit;
use crate::util::due::due_label;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct RowJson {
    pub id: String,
    pub kind: RowKind,
    pub level: u8,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expanded: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_folder_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<String>,
}

#[derive(Serialize)]
pub struct SearchHitJson {
    pub kind: ItemKind,
    pub id: String,
    pub title: String,
    pub path: Vec<String>,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn row_to_json(row: &DisplayRow) -> RowJson {
    let (completed, expanded, due) = match &row.item {
        Item::Folder(f) => (None, Some(f.is_expanded), None),
        Item::Task(t) => (
            Some(t.is_completed),
            None,
            t.due_date.map(|d| d.format("%Y-%m-%d").to_string()),
        ),
        Item::Subtask(s) => (Some(s.is_completed), None, None),
    };
    RowJson {
        id: row.id().to_string(),
        kind: row.kind,
        level: row.level(),
        title: row.item.title().to_string(),
        completed,
        expanded,
        due,
        parent_folder_id: row.parent_folder_id.clone(),
        parent_task_id: row.parent_task_id.clone(),
    }
}

pub fn hit_to_json(hit: &SearchHit) -> SearchHitJson {
    SearchHitJson {
        kind: hit.kind,
        id: hit.id.clone(),
        title: hit.title.clone(),
        path: hit.path.clone(),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

fn check_mark(done: bool) -> &'static str {
    if done { "[x]" } else { "[ ]" }
}

/// One line of `tw list`
pub fn format_row(row: &DisplayRow, today: NaiveDate) -> String {
    let indent = "  ".repeat(row.level() as usize);
    match &row.item {
        Item::Folder(f) => {
            let arrow = if f.is_expanded { "▾" } else { "▸" };
            format!("{}{} {} {} ({})", indent, arrow, f.id, f.title, f.tasks.len())
        }
        Item::Task(t) => {
            let due = t
                .due_date
                .map(|d| format!("  ({})", due_label(d, today)))
                .unwrap_or_default();
            format!(
                "{}{} {} {}{}",
                indent,
                check_mark(t.is_completed),
                t.id,
                t.title,
                due
            )
        }
        Item::Subtask(s) => format!(
            "{}{} {} {}",
            indent,
            check_mark(s.is_completed),
            s.id,
            s.title
        ),
    }
}

/// `[task] Home > Clean the house (task_2)`
pub fn format_search_hit(hit: &SearchHit) -> String {
    format!("[{}] {} ({})", hit.kind, hit.path.join(" > "), hit.id)
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::item::{Folder, Subtask, Task};
    use crate::util::due::parse_due;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()
    }

    #[test]
    fn folder_line_shows_state_and_count() {
        let mut folder = Folder::new("folder_1", "Home");
        folder.tasks.push(Task::new("task_2", "Clean"));
        assert_eq!(
            format_row(&DisplayRow::folder(&folder), today()),
            "▾ folder_1 Home (1)"
        );
        folder.is_expanded = false;
        assert_eq!(
            format_row(&DisplayRow::folder(&folder), today()),
            "▸ folder_1 Home (1)"
        );
    }

    #[test]
    fn task_and_subtask_lines() {
        let mut task = Task::new("task_2", "Clean");
        task.due_date = Some(parse_due("2026-03-12").unwrap());
        assert_eq!(
            format_row(&DisplayRow::task(&task, "folder_1"), today()),
            "  [ ] task_2 Clean  (due in 2 days)"
        );
        let mut sub = Subtask::new("subtask_3", "Phone");
        sub.is_completed = true;
        assert_eq!(
            format_row(&DisplayRow::subtask(&sub, "folder_1", "task_2"), today()),
            "    [x] subtask_3 Phone"
        );
    }

    #[test]
    fn row_json_fields() {
        let task = Task::new("task_2", "Clean");
        let json = serde_json::to_value(row_to_json(&DisplayRow::task(&task, "folder_1"))).unwrap();
        assert_eq!(json["kind"], "task");
        assert_eq!(json["level"], 1);
        assert_eq!(json["completed"], false);
        assert_eq!(json["parent_folder_id"], "folder_1");
        assert!(json.get("expanded").is_none());
    }
}
