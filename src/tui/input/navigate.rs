use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::model::RowKind;
use crate::ops::session::AddTarget;
use crate::tui::app::{App, Mode};

pub(super) fn handle_navigate(app: &mut App, key: KeyEvent) {
    // Clear any transient status message on keypress
    app.clear_status();

    match (key.modifiers, key.code) {
        // Quit: q or Ctrl+C
        (_, KeyCode::Char('q')) => app.should_quit = true,
        (m, KeyCode::Char('c')) if m.contains(KeyModifiers::CONTROL) => app.should_quit = true,

        // Cursor
        (_, KeyCode::Char('j') | KeyCode::Down) => app.move_cursor(1),
        (_, KeyCode::Char('k') | KeyCode::Up) => app.move_cursor(-1),
        (_, KeyCode::Char('g') | KeyCode::Home) => app.cursor = 0,
        (_, KeyCode::Char('G') | KeyCode::End) => {
            app.cursor = app.rows().len().saturating_sub(1);
        }
        (_, KeyCode::PageDown) => app.move_cursor(10),
        (_, KeyCode::PageUp) => app.move_cursor(-10),

        // Folder expansion without toggling anything else
        (_, KeyCode::Char('l') | KeyCode::Right) => set_cursor_folder(app, true),
        (_, KeyCode::Char('h') | KeyCode::Left) => set_cursor_folder(app, false),

        // Toggle completion / expansion
        (_, KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Char('x')) => app.activate(),

        // Add
        (_, KeyCode::Char('a')) => app.add_child(),
        (_, KeyCode::Char('t')) => app.add_sibling_task(),
        (_, KeyCode::Char('A')) => app.request_add(AddTarget::Folder),

        // Edit
        (_, KeyCode::Char('r')) => app.begin_rename(),
        (_, KeyCode::Char('D')) => app.begin_due_edit(),
        (_, KeyCode::Char('d') | KeyCode::Delete) => app.request_delete(),

        // Search
        (_, KeyCode::Char('/')) => {
            app.search_input.clear();
            app.mode = Mode::Search;
        }
        (_, KeyCode::Char('n')) => {
            app.jump_to_match(true, false);
        }
        (_, KeyCode::Char('N')) => {
            app.jump_to_match(false, false);
        }
        (_, KeyCode::Esc) => app.last_search = None,

        (_, KeyCode::Char('?')) => app.show_help = true,

        _ => {}
    }
}

/// Expand (`l`) or collapse (`h`) the folder under the cursor. On a task
/// or subtask row, `h` collapses the enclosing folder and moves onto it.
fn set_cursor_folder(app: &mut App, expand: bool) {
    let Some(row) = app.cursor_row() else {
        return;
    };
    let (folder_id, is_expanded) = match (row.kind, row.as_folder()) {
        (RowKind::Folder, Some(folder)) => (folder.id.clone(), folder.is_expanded),
        _ if !expand => match row.parent_folder_id.clone() {
            Some(id) => (id, true),
            None => return,
        },
        _ => return,
    };
    if is_expanded != expand {
        app.select_id(&folder_id);
        app.session.folder_toggled(&folder_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::render::test_helpers::app_with_sample;

    fn press(app: &mut App, code: KeyCode) {
        handle_navigate(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let mut app = app_with_sample();
        press(&mut app, KeyCode::Char('k'));
        assert_eq!(app.cursor, 0);
        press(&mut app, KeyCode::Char('G'));
        assert_eq!(app.cursor, app.rows().len() - 1);
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.cursor, app.rows().len() - 1);
    }

    #[test]
    fn h_on_task_collapses_its_folder() {
        let mut app = app_with_sample();
        app.select_id("subtask_3");
        press(&mut app, KeyCode::Char('h'));
        app.session.refresh();
        assert_eq!(app.cursor, 0);
        assert!(!app.session.tree().folders[0].is_expanded);

        // already collapsed: no change
        press(&mut app, KeyCode::Char('h'));
        assert!(!app.session.tree().folders[0].is_expanded);
        press(&mut app, KeyCode::Char('l'));
        assert!(app.session.tree().folders[0].is_expanded);
    }

    #[test]
    fn quit_keys() {
        let mut app = app_with_sample();
        handle_navigate(
            &mut app,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
        );
        assert!(app.should_quit);
    }
}
