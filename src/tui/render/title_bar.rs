use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::model::Tree;
use crate::tui::app::App;

/// (open, done) over tasks and subtasks
fn completion_counts(tree: &Tree) -> (usize, usize) {
    let mut open = 0;
    let mut done = 0;
    for task in tree.folders.iter().flat_map(|f| &f.tasks) {
        let flags = std::iter::once(task.is_completed)
            .chain(task.subtasks.iter().map(|s| s.is_completed));
        for completed in flags {
            if completed {
                done += 1;
            } else {
                open += 1;
            }
        }
    }
    (open, done)
}

/// Render the project name with open/done counts on the right
pub fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let bg = app.theme.background;
    let bg_style = Style::default().bg(bg);
    let width = area.width as usize;

    let mut spans = vec![
        Span::styled(" ", bg_style),
        Span::styled("\u{25B6}", Style::default().fg(app.theme.highlight).bg(bg)),
        Span::styled(" ", bg_style),
        Span::styled(
            app.project_name.clone(),
            Style::default()
                .fg(app.theme.text_bright)
                .bg(bg)
                .add_modifier(Modifier::BOLD),
        ),
    ];

    let (open, done) = completion_counts(app.session.tree());
    let counts = format!("{} open  {} done ", open, done);
    let used: usize = spans.iter().map(|s| s.content.chars().count()).sum();
    if used + counts.len() < width {
        spans.push(Span::styled(" ".repeat(width - used - counts.len()), bg_style));
        spans.push(Span::styled(counts, Style::default().fg(app.theme.dim).bg(bg)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).style(bg_style), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::render::test_helpers::{TERM_W, app_with_sample, render_to_string};
    use insta::assert_snapshot;

    #[test]
    fn shows_name_and_counts() {
        let mut app = app_with_sample();
        app.session.item_activated("subtask_3");
        let output = render_to_string(TERM_W, 1, |frame, area| {
            render_title_bar(frame, &app, area)
        });
        assert_snapshot!(output);
    }
}
