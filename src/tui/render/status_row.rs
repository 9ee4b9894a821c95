use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::app::{App, EditTarget, Mode};

const NAVIGATE_HINT: &str = "a add  A folder  r rename  d delete  ? help";

/// Left-side spans followed by a right-aligned dim hint, if it fits
fn with_hint<'a>(mut spans: Vec<Span<'a>>, hint: &'a str, app: &App, width: usize) -> Line<'a> {
    let bg = app.theme.background;
    let content_width: usize = spans.iter().map(|s| s.content.chars().count()).sum();
    let hint_width = hint.chars().count();
    if content_width + hint_width < width {
        let padding = width - content_width - hint_width;
        spans.push(Span::styled(" ".repeat(padding), Style::default().bg(bg)));
        spans.push(Span::styled(hint, Style::default().fg(app.theme.dim).bg(bg)));
    }
    Line::from(spans)
}

/// Render the status row (bottom of screen)
pub fn render_status_row(frame: &mut Frame, app: &App, area: Rect) {
    let bg = app.theme.background;
    let width = area.width as usize;

    let line = match app.mode {
        Mode::Navigate => {
            let hint = if app.show_key_hints { NAVIGATE_HINT } else { "" };
            if let Some(msg) = &app.status_message {
                let color = if app.status_is_error {
                    app.theme.red
                } else {
                    app.theme.green
                };
                with_hint(
                    vec![Span::styled(format!(" {}", msg), Style::default().fg(color).bg(bg))],
                    hint,
                    app,
                    width,
                )
            } else if let Some(pattern) = &app.last_search {
                with_hint(
                    vec![Span::styled(
                        format!("/{}", pattern),
                        Style::default().fg(app.theme.dim).bg(bg),
                    )],
                    "n/N next/prev",
                    app,
                    width,
                )
            } else {
                with_hint(Vec::new(), hint, app, width)
            }
        }
        Mode::Edit => {
            let label = match app.edit.as_ref().map(|e| &e.target) {
                Some(EditTarget::Placeholder { .. }) => " new",
                Some(EditTarget::Rename { .. }) => " rename",
                Some(EditTarget::Due { .. }) => " due date (YYYY-MM-DD, empty clears)",
                None => "",
            };
            with_hint(
                vec![Span::styled(
                    label,
                    Style::default().fg(app.theme.highlight).bg(bg),
                )],
                "Enter save  Esc cancel",
                app,
                width,
            )
        }
        Mode::Confirm => {
            let title = app
                .pending_delete
                .as_ref()
                .map(|p| p.title.as_str())
                .unwrap_or_default();
            with_hint(
                vec![Span::styled(
                    format!(" delete \"{}\" and everything under it?", title),
                    Style::default().fg(app.theme.red).bg(bg),
                )],
                "y/n",
                app,
                width,
            )
        }
        Mode::Search => {
            // Search prompt: /pattern▌
            let spans = vec![
                Span::styled(
                    format!("/{}", app.search_input),
                    Style::default().fg(app.theme.text_bright).bg(bg),
                ),
                Span::styled("\u{258C}", Style::default().fg(app.theme.highlight).bg(bg)),
            ];
            with_hint(spans, "Enter search  Esc cancel", app, width)
        }
    };

    let paragraph = Paragraph::new(line).style(Style::default().bg(bg));
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::render::test_helpers::{TERM_W, app_with_sample, render_to_string};
    use insta::assert_snapshot;

    fn status(app: &App) -> String {
        render_to_string(TERM_W, 1, |frame, area| render_status_row(frame, app, area))
    }

    #[test]
    fn navigate_shows_key_hints() {
        let mut app = app_with_sample();
        let output = status(&app);
        assert_snapshot!(output);
        app.show_key_hints = false;
        assert_eq!(status(&app), "");
    }

    #[test]
    fn error_message_shown() {
        let mut app = app_with_sample();
        app.set_error("save failed: disk full");
        assert!(status(&app).starts_with(" save failed: disk full"));
    }

    #[test]
    fn confirm_prompt_names_item() {
        let mut app = app_with_sample();
        app.select_id("task_2");
        app.request_delete();
        let output = status(&app);
        assert_snapshot!(output);
    }

    #[test]
    fn search_prompt() {
        let mut app = app_with_sample();
        app.mode = Mode::Search;
        app.search_input = "buy".into();
        assert!(status(&app).starts_with("/buy\u{258C}"));
    }
}
