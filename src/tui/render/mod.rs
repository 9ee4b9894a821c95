pub mod help_overlay;
pub mod status_row;
pub mod title_bar;
pub mod tree_view;

#[cfg(test)]
pub mod test_helpers;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::Style;
use ratatui::text::Span;
use ratatui::widgets::Block;
use regex::Regex;

use super::app::App;

/// Main render function: title bar, tree, status row
pub fn render(frame: &mut Frame, app: &mut App) {
    let area = frame.area();

    // Background fill
    let bg_style = Style::default().bg(app.theme.background);
    frame.render_widget(Block::default().style(bg_style), area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // title bar
            Constraint::Min(1),    // tree
            Constraint::Length(1), // status row
        ])
        .split(area);

    title_bar::render_title_bar(frame, app, chunks[0]);
    tree_view::render_tree_view(frame, app, chunks[1]);

    if app.show_help {
        help_overlay::render_help_overlay(frame, app, frame.area());
    }

    status_row::render_status_row(frame, app, chunks[2]);
}

/// Push spans for text with regex match highlighting. If no regex or no matches,
/// pushes a single span with `base_style`. Otherwise splits text at match boundaries.
pub(super) fn push_highlighted_spans<'a>(
    spans: &mut Vec<Span<'a>>,
    text: &str,
    base_style: Style,
    highlight_style: Style,
    search_re: Option<&Regex>,
) {
    let Some(re) = search_re else {
        spans.push(Span::styled(text.to_string(), base_style));
        return;
    };

    let mut last_end = 0;
    for m in re.find_iter(text).filter(|m| !m.is_empty()) {
        if m.start() > last_end {
            spans.push(Span::styled(
                text[last_end..m.start()].to_string(),
                base_style,
            ));
        }
        spans.push(Span::styled(m.as_str().to_string(), highlight_style));
        last_end = m.end();
    }
    if last_end == 0 || last_end < text.len() {
        spans.push(Span::styled(text[last_end..].to_string(), base_style));
    }
}

#[cfg(test)]
mod tests {
    use super::test_helpers::{TERM_H, TERM_W, app_with_sample, render_to_string};
    use super::*;
    use insta::assert_snapshot;

    #[test]
    fn full_screen_layout() {
        let mut app = app_with_sample();
        let output = render_to_string(TERM_W, TERM_H, |frame, _| render(frame, &mut app));
        assert_snapshot!(output);
    }

    #[test]
    fn highlighted_spans_split_on_matches() {
        let re = Regex::new("(?i)an").unwrap();
        let mut spans = Vec::new();
        push_highlighted_spans(
            &mut spans,
            "Clean and",
            Style::default(),
            Style::default().bg(ratatui::style::Color::Red),
            Some(&re),
        );
        let parts: Vec<&str> = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(parts, vec!["Cle", "an", " ", "an", "d"]);
    }
}
