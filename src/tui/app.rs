use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use regex::Regex;

use crate::io::lock::StoreLock;
use crate::io::project_io::{self, discover_project, load_project};
use crate::io::recovery;
use crate::io::state::{UiState, read_ui_state, write_ui_state};
use crate::io::watcher::{FileEvent, StoreWatcher};
use crate::model::{DisplayRow, Item, Project, RowKind};
use crate::ops::placeholder::PlaceholderKey;
use crate::ops::search::build_pattern;
use crate::ops::session::{AddOutcome, AddTarget, PlaceholderOutcome, Session};
use crate::util::due::parse_due;
use crate::util::text::EditBuffer;

use super::input;
use super::render;
use super::theme::Theme;

/// Current interaction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Navigate,
    /// Typing into a row (placeholder title, rename, due date)
    Edit,
    /// Waiting for y/n on a delete
    Confirm,
    Search,
}

/// What the edit buffer will be submitted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditTarget {
    Placeholder { key: String },
    Rename { id: String },
    Due { task_id: String },
}

#[derive(Debug, Clone)]
pub struct EditState {
    pub target: EditTarget,
    pub buffer: EditBuffer,
}

/// A delete waiting for confirmation, with the address it was raised at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelete {
    pub id: String,
    pub title: String,
    pub parent_folder_id: Option<String>,
    pub parent_task_id: Option<String>,
}

/// Main application state
pub struct App {
    pub twig_dir: PathBuf,
    pub project_name: String,
    pub show_key_hints: bool,
    pub session: Session,
    pub mode: Mode,
    pub should_quit: bool,
    pub theme: Theme,
    /// Cursor index into the session's rows
    pub cursor: usize,
    /// First visible row
    pub scroll_offset: usize,
    pub edit: Option<EditState>,
    pub pending_delete: Option<PendingDelete>,
    pub show_help: bool,
    /// Search mode: current query being typed
    pub search_input: String,
    /// Last executed search pattern
    pub last_search: Option<String>,
    pub status_message: Option<String>,
    pub status_is_error: bool,
}

impl App {
    pub fn new(project: Project) -> Self {
        let theme = Theme::from_config(&project.config.ui);
        let mut session = Session::new(project.tree, project.config.ui.placeholder.clone());
        session.reserve_ids(project.next_id);

        App {
            twig_dir: project.twig_dir,
            project_name: project.config.project.name,
            show_key_hints: project.config.ui.show_key_hints,
            session,
            mode: Mode::Navigate,
            should_quit: false,
            theme,
            cursor: 0,
            scroll_offset: 0,
            edit: None,
            pending_delete: None,
            show_help: false,
            search_input: String::new(),
            last_search: None,
            status_message: None,
            status_is_error: false,
        }
    }

    pub fn rows(&self) -> &[DisplayRow] {
        self.session.rows()
    }

    pub fn cursor_row(&self) -> Option<&DisplayRow> {
        self.rows().get(self.cursor)
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_is_error = false;
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_is_error = true;
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
        self.status_is_error = false;
    }

    /// Move the cursor onto the row with `id`, if it is shown
    pub fn select_id(&mut self, id: &str) -> bool {
        match self.rows().iter().position(|r| r.id() == id) {
            Some(pos) => {
                self.cursor = pos;
                true
            }
            None => false,
        }
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.rows().len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        self.cursor = self.cursor.saturating_add_signed(delta).min(len - 1);
    }

    fn clamp_cursor(&mut self) {
        self.cursor = self.cursor.min(self.rows().len().saturating_sub(1));
    }

    /// Get the active search regex for highlighting.
    pub fn active_search_re(&self) -> Option<Regex> {
        let pattern = match self.mode {
            Mode::Search if !self.search_input.is_empty() => &self.search_input,
            Mode::Navigate => self.last_search.as_deref()?,
            _ => return None,
        };
        build_pattern(pattern).ok()
    }

    // -----------------------------------------------------------------------
    // Sync: refresh, persist
    // -----------------------------------------------------------------------

    /// Bring rows up to date after an event, then persist.
    pub fn sync(&mut self) {
        if self.session.is_stale() {
            // Keep the cursor on the same item across the re-flatten
            let current = self.cursor_row().map(|r| r.id().to_string());
            self.session.refresh();
            if let Some(id) = current
                && !self.select_id(&id)
            {
                self.clamp_cursor();
            }
        }
        if let Some(outcome) = self.session.take_resumed_add() {
            self.on_add_outcome(outcome);
        }
        self.clamp_cursor();
        self.persist();
    }

    /// Save the tree if it changed and write out diagnostics.
    fn persist(&mut self) {
        let diagnostics = self.session.take_diagnostics();
        recovery::log_diagnostics(&self.twig_dir, diagnostics);

        if !self.session.take_dirty() {
            return;
        }
        let result = StoreLock::acquire_default(&self.twig_dir)
            .map_err(|e| e.to_string())
            .and_then(|_lock| {
                project_io::save_tree(&self.twig_dir, self.session.tree(), self.session.next_id())
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = result {
            self.set_error(format!("save failed: {}", e));
        }
    }

    /// Pick up a store changed by another process.
    pub fn reload_from_disk(&mut self) {
        match project_io::reload_tree(&self.twig_dir) {
            Ok((tree, next_id)) => {
                if &tree == self.session.tree() {
                    return;
                }
                self.session.replace_tree(tree);
                self.session.reserve_ids(next_id);
                self.drop_orphaned_edit();
                self.sync();
            }
            Err(e) => self.set_error(format!("reload failed: {}", e)),
        }
    }

    /// An edit whose row vanished in a reload cannot be submitted anywhere.
    fn drop_orphaned_edit(&mut self) {
        let Some(edit) = &self.edit else {
            return;
        };
        let alive = match &edit.target {
            EditTarget::Placeholder { key } => key
                .parse::<PlaceholderKey>()
                .is_ok_and(|k| self.session.registry().contains(&k)),
            EditTarget::Rename { id } | EditTarget::Due { task_id: id } => {
                self.session.tree().contains_id(id)
            }
        };
        if !alive {
            self.edit = None;
            self.mode = Mode::Navigate;
            self.set_error("item changed on disk; edit dropped");
        }
    }

    // -----------------------------------------------------------------------
    // Row actions
    // -----------------------------------------------------------------------

    /// Enter/space on the cursor row
    pub fn activate(&mut self) {
        let Some(row) = self.cursor_row() else {
            return;
        };
        let id = row.id().to_string();
        let kind = row.kind;
        match kind {
            RowKind::Folder => {
                self.session.folder_toggled(&id);
            }
            RowKind::Task | RowKind::Subtask => {
                self.session.item_activated(&id);
            }
            RowKind::NewFolder | RowKind::NewTask | RowKind::NewSubtask => {
                self.start_placeholder_edit(&id);
            }
        }
    }

    /// `a`: new child of the cursor row (task under a folder, subtask under
    /// a task or next to a subtask).
    pub fn add_child(&mut self) {
        let target = match self.cursor_row() {
            None => AddTarget::Folder,
            Some(row) if row.is_placeholder() => {
                let key = row.id().to_string();
                self.start_placeholder_edit(&key);
                return;
            }
            Some(row) => match (&row.item, &row.parent_folder_id, &row.parent_task_id) {
                (Item::Folder(f), _, _) => AddTarget::Task {
                    folder_id: f.id.clone(),
                },
                (Item::Task(t), Some(folder_id), _) => AddTarget::Subtask {
                    folder_id: folder_id.clone(),
                    task_id: t.id.clone(),
                },
                (Item::Subtask(_), Some(folder_id), Some(task_id)) => AddTarget::Subtask {
                    folder_id: folder_id.clone(),
                    task_id: task_id.clone(),
                },
                _ => return,
            },
        };
        self.request_add(target);
    }

    /// `t`: new task in the folder of the cursor row
    pub fn add_sibling_task(&mut self) {
        let folder_id = match self.cursor_row() {
            Some(row) => match &row.item {
                Item::Folder(f) if !row.is_placeholder() => Some(f.id.clone()),
                _ => row.parent_folder_id.clone(),
            },
            None => None,
        };
        match folder_id {
            Some(folder_id) => self.request_add(AddTarget::Task { folder_id }),
            None => self.request_add(AddTarget::Folder),
        }
    }

    pub fn request_add(&mut self, target: AddTarget) {
        let outcome = self.session.add_requested(target);
        self.on_add_outcome(outcome);
    }

    fn on_add_outcome(&mut self, outcome: AddOutcome) {
        match outcome {
            AddOutcome::Inserted { key, index } => {
                self.session.refresh();
                let key = key.as_key();
                if !self.select_id(&key) {
                    self.cursor = index;
                }
                self.start_placeholder_edit(&key);
            }
            AddOutcome::AwaitingExpansion { .. } => {
                self.session.refresh();
                if let Some(resumed) = self.session.take_resumed_add() {
                    self.on_add_outcome(resumed);
                }
            }
            AddOutcome::AlreadyPending { key } => {
                let key = key.as_key();
                self.select_id(&key);
                self.start_placeholder_edit(&key);
            }
            AddOutcome::ParentNotFound => self.set_error("parent no longer exists"),
        }
    }

    fn start_placeholder_edit(&mut self, key: &str) {
        self.select_id(key);
        self.edit = Some(EditState {
            target: EditTarget::Placeholder {
                key: key.to_string(),
            },
            buffer: EditBuffer::new(""),
        });
        self.mode = Mode::Edit;
    }

    /// `r`: rename the cursor row in place
    pub fn begin_rename(&mut self) {
        let Some(row) = self.cursor_row() else {
            return;
        };
        if row.is_placeholder() {
            let key = row.id().to_string();
            self.start_placeholder_edit(&key);
            return;
        }
        self.edit = Some(EditState {
            target: EditTarget::Rename {
                id: row.id().to_string(),
            },
            buffer: EditBuffer::new(row.item.title()),
        });
        self.mode = Mode::Edit;
    }

    /// `D`: edit the due date of the task under the cursor
    pub fn begin_due_edit(&mut self) {
        let Some(Item::Task(task)) = self.cursor_row().map(|r| &r.item) else {
            self.set_error("only tasks have due dates");
            return;
        };
        let current = task
            .due_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        self.edit = Some(EditState {
            target: EditTarget::Due {
                task_id: task.id.clone(),
            },
            buffer: EditBuffer::new(&current),
        });
        self.mode = Mode::Edit;
    }

    /// Enter, or focus leaving the row being edited
    pub fn submit_edit(&mut self) {
        self.mode = Mode::Navigate;
        let Some(edit) = self.edit.take() else {
            return;
        };
        let text = edit.buffer.text().trim().to_string();
        match edit.target {
            EditTarget::Placeholder { key } => {
                if let PlaceholderOutcome::Committed { id } =
                    self.session.placeholder_committed(&key, &text)
                {
                    self.session.refresh();
                    self.select_id(&id);
                }
            }
            EditTarget::Rename { id } => {
                self.session.rename_submitted(&id, &text);
            }
            EditTarget::Due { task_id } => {
                let due = if text.is_empty() {
                    None
                } else {
                    match parse_due(&text) {
                        Ok(due) => Some(due),
                        Err(_) => {
                            self.set_error(format!("invalid date '{}' (YYYY-MM-DD)", text));
                            return;
                        }
                    }
                };
                self.session.due_submitted(&task_id, due);
            }
        }
    }

    /// Esc while editing
    pub fn cancel_edit(&mut self) {
        self.mode = Mode::Navigate;
        if let Some(EditState {
            target: EditTarget::Placeholder { key },
            ..
        }) = self.edit.take()
        {
            self.session.placeholder_cancelled(&key);
        }
    }

    /// `d`: ask before deleting the cursor row. Placeholders just go away.
    pub fn request_delete(&mut self) {
        let Some(row) = self.cursor_row() else {
            return;
        };
        if row.is_placeholder() {
            let key = row.id().to_string();
            self.session.placeholder_cancelled(&key);
            return;
        }
        self.pending_delete = Some(PendingDelete {
            id: row.id().to_string(),
            title: row.item.title().to_string(),
            parent_folder_id: row.parent_folder_id.clone(),
            parent_task_id: row.parent_task_id.clone(),
        });
        self.mode = Mode::Confirm;
    }

    pub fn confirm_delete(&mut self) {
        self.mode = Mode::Navigate;
        let Some(pending) = self.pending_delete.take() else {
            return;
        };
        if self.session.delete_requested(
            &pending.id,
            pending.parent_folder_id.as_deref(),
            pending.parent_task_id.as_deref(),
        ) {
            self.set_status(format!("deleted \"{}\"", pending.title));
        }
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
        self.mode = Mode::Navigate;
    }

    // -----------------------------------------------------------------------
    // Search
    // -----------------------------------------------------------------------

    pub fn submit_search(&mut self) {
        self.mode = Mode::Navigate;
        let pattern = std::mem::take(&mut self.search_input);
        if pattern.is_empty() {
            self.last_search = None;
            return;
        }
        self.last_search = Some(pattern);
        if !self.jump_to_match(true, true) {
            self.set_error("no match");
        }
    }

    /// Move to the next (or previous) visible row whose title matches the
    /// last search. `inclusive` lets the cursor row itself count.
    pub fn jump_to_match(&mut self, forward: bool, inclusive: bool) -> bool {
        let Some(re) = self.active_search_re() else {
            return false;
        };
        let len = self.rows().len();
        if len == 0 {
            return false;
        }
        let start = if inclusive { 0 } else { 1 };
        for step in start..=len {
            let idx = if forward {
                (self.cursor + step) % len
            } else {
                (self.cursor + len * 2 - step) % len
            };
            let row = &self.rows()[idx];
            if !row.is_placeholder() && re.is_match(row.item.title()) {
                self.cursor = idx;
                return true;
            }
        }
        false
    }
}

/// Restore cursor, scroll and last search from .state.json
pub fn restore_ui_state(app: &mut App) {
    let Some(ui_state) = read_ui_state(&app.twig_dir) else {
        return;
    };
    let found = ui_state
        .cursor_id
        .as_deref()
        .is_some_and(|id| app.select_id(id));
    if !found {
        app.cursor = ui_state.cursor;
    }
    app.clamp_cursor();
    app.scroll_offset = ui_state.scroll_offset;
    app.last_search = ui_state.last_search;
}

/// Save UI state to .state.json
pub fn save_ui_state(app: &App) {
    let ui_state = UiState {
        cursor_id: app
            .cursor_row()
            .filter(|r| !r.is_placeholder())
            .map(|r| r.id().to_string()),
        cursor: app.cursor,
        scroll_offset: app.scroll_offset,
        last_search: app.last_search.clone(),
    };
    let _ = write_ui_state(&app.twig_dir, &ui_state);
}

/// Run the TUI application
pub fn run(project_dir: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let start = match project_dir {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };
    let root = discover_project(&start)?;
    let project = load_project(&root)?;

    let mut app = App::new(project);
    restore_ui_state(&mut app);

    let watcher = match StoreWatcher::start(&app.twig_dir) {
        Ok(w) => Some(w),
        Err(e) => {
            app.set_error(format!("not watching for changes: {}", e));
            None
        }
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Install panic hook to restore terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let result = run_event_loop(&mut terminal, &mut app, watcher.as_ref());

    save_ui_state(&app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    watcher: Option<&StoreWatcher>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut save_counter = 0u32;
    loop {
        terminal.draw(|frame| render::render(frame, app))?;

        if event::poll(Duration::from_millis(250))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            input::handle_key(app, key);
            app.sync();
            // Debounced state save: every ~5 key presses
            save_counter += 1;
            if save_counter >= 5 {
                save_ui_state(app);
                save_counter = 0;
            }
        }

        if let Some(watcher) = watcher {
            let changed = watcher
                .poll()
                .into_iter()
                .any(|FileEvent::Changed(paths)| !paths.is_empty());
            if changed {
                app.reload_from_disk();
            }
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::render::test_helpers::{app_with_sample, sample_project};
    use tempfile::TempDir;

    fn ids(app: &App) -> Vec<&str> {
        app.rows().iter().map(|r| r.id()).collect()
    }

    #[test]
    fn add_child_on_folder_opens_placeholder_editor() {
        let mut app = app_with_sample();
        app.select_id("folder_1");
        app.add_child();
        assert_eq!(app.mode, Mode::Edit);
        assert_eq!(app.cursor_row().unwrap().id(), "new_task_folder_1");
        assert_eq!(
            ids(&app),
            vec![
                "folder_1",
                "task_2",
                "subtask_3",
                "task_4",
                "new_task_folder_1",
                "folder_5"
            ]
        );
    }

    #[test]
    fn commit_places_cursor_on_new_item() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with_sample();
        app.twig_dir = dir.path().to_path_buf();
        app.select_id("task_4");
        app.add_sibling_task();
        for c in "Buy milk".chars() {
            app.edit.as_mut().unwrap().buffer.insert(c);
        }
        app.submit_edit();
        app.sync();
        let row = app.cursor_row().unwrap();
        assert_eq!(row.item.title(), "Buy milk");
        assert_eq!(row.parent_folder_id.as_deref(), Some("folder_1"));
        assert_eq!(app.mode, Mode::Navigate);
        assert!(!ids(&app).contains(&"new_task_folder_1"));
    }

    #[test]
    fn esc_cancels_placeholder() {
        let mut app = app_with_sample();
        app.select_id("task_2");
        app.add_child();
        assert!(ids(&app).contains(&"new_subtask_task_2"));
        app.cancel_edit();
        app.sync();
        assert!(!ids(&app).contains(&"new_subtask_task_2"));
        assert_eq!(app.session.tree(), &sample_project().tree);
    }

    #[test]
    fn add_in_collapsed_folder_expands_it() {
        let mut app = app_with_sample();
        app.select_id("folder_5");
        app.add_child();
        assert_eq!(app.mode, Mode::Edit);
        assert_eq!(
            ids(&app)[4..],
            ["folder_5", "task_6", "new_task_folder_5"]
        );
        assert_eq!(app.cursor_row().unwrap().id(), "new_task_folder_5");
    }

    #[test]
    fn delete_needs_confirmation_and_is_logged() {
        let dir = TempDir::new().unwrap();
        let mut app = app_with_sample();
        app.twig_dir = dir.path().to_path_buf();

        app.select_id("task_2");
        app.request_delete();
        assert_eq!(app.mode, Mode::Confirm);
        app.cancel_delete();
        assert!(app.session.tree().contains_id("task_2"));

        app.request_delete();
        app.confirm_delete();
        app.sync();
        assert!(!app.session.tree().contains_id("task_2"));
        assert!(!app.session.tree().contains_id("subtask_3"));

        // saved and logged
        let (tree, _) = project_io::reload_tree(dir.path()).unwrap();
        assert!(!tree.contains_id("task_2"));
        let entries = recovery::read_recovery_entries(dir.path(), None, None);
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn activate_toggles_by_row_kind() {
        let mut app = app_with_sample();
        let dir = TempDir::new().unwrap();
        app.twig_dir = dir.path().to_path_buf();
        app.select_id("task_4");
        app.activate();
        app.sync();
        assert!(app.session.tree().task("task_4").unwrap().1.is_completed);

        app.select_id("folder_1");
        app.activate();
        app.sync();
        assert_eq!(ids(&app), vec!["folder_1", "folder_5"]);
        assert_eq!(app.cursor, 0);
    }

    #[test]
    fn rename_and_due_edits() {
        let mut app = app_with_sample();
        let dir = TempDir::new().unwrap();
        app.twig_dir = dir.path().to_path_buf();
        app.select_id("task_4");
        app.begin_rename();
        let edit = app.edit.as_mut().unwrap();
        assert_eq!(edit.buffer.text(), "Buy food");
        edit.buffer.end();
        edit.buffer.insert('!');
        app.submit_edit();

        app.begin_due_edit();
        for c in "2026-04-01".chars() {
            app.edit.as_mut().unwrap().buffer.insert(c);
        }
        app.submit_edit();
        app.sync();

        let task = app.session.tree().task("task_4").unwrap().1;
        assert_eq!(task.title, "Buy food!");
        assert_eq!(task.due_date, Some(parse_due("2026-04-01").unwrap()));

        app.begin_due_edit();
        app.edit.as_mut().unwrap().buffer.insert('x');
        app.submit_edit();
        assert!(app.status_is_error);
    }

    #[test]
    fn search_jumps_and_wraps() {
        let mut app = app_with_sample();
        app.search_input = "buy".into();
        app.submit_search();
        assert_eq!(app.cursor_row().unwrap().id(), "task_4");
        // the only match wraps onto itself
        assert!(app.jump_to_match(true, false));
        assert_eq!(app.cursor_row().unwrap().id(), "task_4");

        app.search_input = "zzz".into();
        app.submit_search();
        assert!(app.status_is_error);
    }
}
