mod confirm;
mod edit;
mod navigate;
mod search;

use crossterm::event::{KeyCode, KeyEvent};

use super::app::{App, Mode};

use confirm::handle_confirm;
use edit::handle_edit;
use navigate::handle_navigate;
use search::handle_search;

/// Handle a key event in the current mode
pub fn handle_key(app: &mut App, key: KeyEvent) {
    // Ignore bare modifier key presses (Shift, Ctrl, Alt, etc.)
    if matches!(key.code, KeyCode::Modifier(_)) {
        return;
    }

    // Help overlay intercepts ? and Esc
    if app.show_help {
        if matches!(key.code, KeyCode::Char('?') | KeyCode::Esc) {
            app.show_help = false;
        }
        return;
    }

    match app.mode {
        Mode::Navigate => handle_navigate(app, key),
        Mode::Edit => handle_edit(app, key),
        Mode::Confirm => handle_confirm(app, key),
        Mode::Search => handle_search(app, key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::render::test_helpers::app_with_sample;
    use crossterm::event::KeyModifiers;

    fn press(app: &mut App, code: KeyCode) {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn help_overlay_swallows_keys() {
        let mut app = app_with_sample();
        press(&mut app, KeyCode::Char('?'));
        assert!(app.show_help);
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.cursor, 0);
        press(&mut app, KeyCode::Esc);
        assert!(!app.show_help);
    }

    #[test]
    fn typing_into_placeholder_then_enter() {
        let mut app = app_with_sample();
        let dir = tempfile::TempDir::new().unwrap();
        app.twig_dir = dir.path().to_path_buf();

        press(&mut app, KeyCode::Char('A'));
        assert_eq!(app.mode, Mode::Edit);
        assert_eq!(app.cursor_row().unwrap().id(), "new_folder");
        for c in "Errands".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Enter);
        app.sync();

        assert_eq!(app.mode, Mode::Navigate);
        let last = app.rows().last().unwrap();
        assert_eq!(last.item.title(), "Errands");
        assert_eq!(app.cursor_row().unwrap().id(), last.id());
    }

    #[test]
    fn moving_off_a_placeholder_commits_it() {
        let mut app = app_with_sample();
        let dir = tempfile::TempDir::new().unwrap();
        app.twig_dir = dir.path().to_path_buf();

        press(&mut app, KeyCode::Char('a'));
        assert_eq!(app.cursor_row().unwrap().id(), "new_task_folder_1");
        press(&mut app, KeyCode::Char('x'));
        press(&mut app, KeyCode::Up);
        app.sync();
        assert_eq!(app.mode, Mode::Navigate);
        assert_eq!(app.session.tree().folders[0].tasks.len(), 3);
    }

    #[test]
    fn delete_flow_through_keys() {
        let mut app = app_with_sample();
        let dir = tempfile::TempDir::new().unwrap();
        app.twig_dir = dir.path().to_path_buf();

        press(&mut app, KeyCode::Char('j'));
        press(&mut app, KeyCode::Char('d'));
        assert_eq!(app.mode, Mode::Confirm);
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.mode, Mode::Navigate);
        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('y'));
        app.sync();
        assert!(!app.session.tree().contains_id("task_2"));
    }
}
