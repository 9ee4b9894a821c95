use std::path::PathBuf;

use ratatui::Terminal;
use ratatui::backend::TestBackend;
use ratatui::layout::Rect;

use crate::model::{Folder, Project, ProjectConfig, ProjectInfo, Subtask, Task, Tree};
use crate::tui::app::App;

pub const TERM_W: u16 = 80;
pub const TERM_H: u16 = 24;

/// Render into an in-memory buffer and return plain text (no styles).
pub fn render_to_string<F>(w: u16, h: u16, f: F) -> String
where
    F: FnOnce(&mut ratatui::Frame, Rect),
{
    let backend = TestBackend::new(w, h);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal
        .draw(|frame| {
            let area = frame.area();
            f(frame, area);
        })
        .unwrap();

    let buf = terminal.backend().buffer().clone();
    let w = buf.area.width as usize;
    let lines: Vec<String> = buf
        .content
        .chunks(w)
        .map(|row| {
            let s: String = row.iter().map(|cell| cell.symbol()).collect();
            s.trim_end().to_string()
        })
        .collect();

    // Trim trailing blank lines
    let end = lines
        .iter()
        .rposition(|l| !l.is_empty())
        .map_or(0, |i| i + 1);
    lines[..end].join("\n")
}

/// Home (expanded): "Clean the house" [Phone], "Buy food";
/// Work (collapsed): "Write report"
pub fn sample_tree() -> Tree {
    let mut clean = Task::new("task_2", "Clean the house");
    clean.subtasks.push(Subtask::new("subtask_3", "Phone"));
    let mut home = Folder::new("folder_1", "Home");
    home.tasks = vec![clean, Task::new("task_4", "Buy food")];

    let mut work = Folder::new("folder_5", "Work");
    work.is_expanded = false;
    work.tasks.push(Task::new("task_6", "Write report"));

    Tree::new(vec![home, work])
}

pub fn sample_project() -> Project {
    Project {
        root: PathBuf::from("/nonexistent/twig-test"),
        twig_dir: PathBuf::from("/nonexistent/twig-test/twig"),
        config: ProjectConfig {
            project: ProjectInfo {
                name: "Chores".into(),
            },
            ui: Default::default(),
        },
        tree: sample_tree(),
        next_id: 7,
    }
}

pub fn app_with_sample() -> App {
    App::new(sample_project())
}

/// An App whose tree has no folders at all
pub fn empty_app() -> App {
    let mut project = sample_project();
    project.tree = Tree::default();
    App::new(project)
}
