use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::tui::app::App;

pub(super) fn handle_edit(app: &mut App, key: KeyEvent) {
    match (key.modifiers, key.code) {
        (_, KeyCode::Enter) => app.submit_edit(),
        (_, KeyCode::Esc) => app.cancel_edit(),

        // Focus leaves the row: submit what is there, then move
        (_, KeyCode::Up) => {
            app.submit_edit();
            app.sync();
            app.move_cursor(-1);
        }
        (_, KeyCode::Down | KeyCode::Tab) => {
            app.submit_edit();
            app.sync();
            app.move_cursor(1);
        }

        _ => {
            let Some(edit) = app.edit.as_mut() else {
                return;
            };
            let buf = &mut edit.buffer;
            match (key.modifiers, key.code) {
                (m, KeyCode::Char('w')) if m.contains(KeyModifiers::CONTROL) => {
                    buf.delete_word_back()
                }
                (m, KeyCode::Char('a')) if m.contains(KeyModifiers::CONTROL) => buf.home(),
                (m, KeyCode::Char('e')) if m.contains(KeyModifiers::CONTROL) => buf.end(),
                (m, KeyCode::Backspace) if m.contains(KeyModifiers::ALT) => buf.delete_word_back(),
                (_, KeyCode::Backspace) => buf.backspace(),
                (_, KeyCode::Delete) => buf.delete(),
                (_, KeyCode::Left) => buf.left(),
                (_, KeyCode::Right) => buf.right(),
                (_, KeyCode::Home) => buf.home(),
                (_, KeyCode::End) => buf.end(),
                (m, KeyCode::Char(c)) if !m.contains(KeyModifiers::CONTROL) => buf.insert(c),
                _ => {}
            }
        }
    }
}
