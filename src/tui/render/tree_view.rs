use chrono::NaiveDate;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use regex::Regex;

use crate::model::{DisplayRow, Item};
use crate::tui::app::{App, EditState, EditTarget};
use crate::util::due::{days_until, due_label};
use crate::util::text::{display_width, truncate_to_width};

use super::push_highlighted_spans;

/// Render the flattened tree into the content area
pub fn render_tree_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let bg = app.theme.background;
    if app.rows().is_empty() {
        let empty = Paragraph::new(" No folders. Press A to add one.")
            .style(Style::default().fg(app.theme.dim).bg(bg));
        frame.render_widget(empty, area);
        return;
    }

    // Keep the cursor in view
    let visible_height = area.height as usize;
    if app.cursor < app.scroll_offset {
        app.scroll_offset = app.cursor;
    } else if app.cursor >= app.scroll_offset + visible_height {
        app.scroll_offset = app.cursor.saturating_sub(visible_height.saturating_sub(1));
    }
    app.scroll_offset = app
        .scroll_offset
        .min(app.rows().len().saturating_sub(1));

    let app: &App = app;
    let today = chrono::Local::now().date_naive();
    let search_re = app.active_search_re();
    let start = app.scroll_offset;
    let end = app.rows().len().min(start + visible_height);

    let lines: Vec<Line> = (start..end)
        .map(|idx| {
            let row = &app.rows()[idx];
            row_line(app, row, idx == app.cursor, today, search_re.as_ref(), area.width)
        })
        .collect();

    frame.render_widget(
        Paragraph::new(lines).style(Style::default().bg(bg)),
        area,
    );
}

/// The edit state if it targets `row`
fn edit_for<'a>(app: &'a App, row: &DisplayRow) -> Option<&'a EditState> {
    let edit = app.edit.as_ref()?;
    let targets_row = match &edit.target {
        EditTarget::Placeholder { key } | EditTarget::Rename { id: key } => key == row.id(),
        EditTarget::Due { task_id } => task_id == row.id(),
    };
    targets_row.then_some(edit)
}

/// Buffer text with a bar cursor at the edit position
fn push_edit_spans(spans: &mut Vec<Span<'static>>, app: &App, edit: &EditState, style: Style) {
    let text = edit.buffer.text();
    let (before, after) = text.split_at(edit.buffer.cursor());
    spans.push(Span::styled(before.to_string(), style));
    spans.push(Span::styled(
        "\u{258C}",
        style.fg(app.theme.highlight).remove_modifier(Modifier::ITALIC),
    ));
    spans.push(Span::styled(after.to_string(), style));
}

fn row_line(
    app: &App,
    row: &DisplayRow,
    is_cursor: bool,
    today: NaiveDate,
    search_re: Option<&Regex>,
    width: u16,
) -> Line<'static> {
    let theme = &app.theme;
    let bg = if is_cursor {
        theme.selection_bg
    } else {
        theme.background
    };
    let base = Style::default().bg(bg);
    let match_style = Style::default()
        .fg(theme.search_match_fg)
        .bg(theme.search_match_bg);
    let edit = edit_for(app, row);

    let mut spans: Vec<Span<'static>> = Vec::new();
    spans.push(if is_cursor {
        Span::styled("\u{258E}", base.fg(theme.selection_border))
    } else {
        Span::styled(" ", base)
    });
    spans.push(Span::styled("  ".repeat(row.level() as usize), base));

    if row.is_placeholder() {
        spans.push(Span::styled("+ ", base.fg(theme.highlight)));
        match edit {
            Some(edit) if !edit.buffer.text().is_empty() => {
                push_edit_spans(&mut spans, app, edit, base.fg(theme.text_bright))
            }
            Some(_) => {
                spans.push(Span::styled("\u{258C}", base.fg(theme.highlight)));
                spans.push(Span::styled(
                    row.item.title().to_string(),
                    base.fg(theme.dim).add_modifier(Modifier::ITALIC),
                ));
            }
            None => spans.push(Span::styled(
                row.item.title().to_string(),
                base.fg(theme.dim).add_modifier(Modifier::ITALIC),
            )),
        }
        return fit_to_width(spans, width as usize, base);
    }

    let renaming = edit.filter(|e| matches!(e.target, EditTarget::Rename { .. }));
    let editing_due = edit.filter(|e| matches!(e.target, EditTarget::Due { .. }));

    match &row.item {
        Item::Folder(folder) => {
            let arrow = if folder.is_expanded { "\u{25BE} " } else { "\u{25B8} " };
            spans.push(Span::styled(arrow, base.fg(theme.highlight)));
            let title_style = base.fg(theme.text_bright).add_modifier(Modifier::BOLD);
            match renaming {
                Some(edit) => push_edit_spans(&mut spans, app, edit, title_style),
                None => push_highlighted_spans(
                    &mut spans,
                    &folder.title,
                    title_style,
                    match_style,
                    search_re,
                ),
            }
            spans.push(Span::styled(
                format!(" ({})", folder.tasks.len()),
                base.fg(theme.dim),
            ));
        }
        Item::Task(_) | Item::Subtask(_) => {
            let done = row.item.is_completed();
            let (mark, mark_color) = if done {
                ("[x] ", theme.green)
            } else {
                ("[ ] ", theme.text)
            };
            spans.push(Span::styled(mark, base.fg(mark_color)));
            let title_style = if done {
                base.fg(theme.dim).add_modifier(Modifier::CROSSED_OUT)
            } else {
                base.fg(theme.text)
            };
            match renaming {
                Some(edit) => push_edit_spans(&mut spans, app, edit, title_style),
                None => push_highlighted_spans(
                    &mut spans,
                    row.item.title(),
                    title_style,
                    match_style,
                    search_re,
                ),
            }

            if let Some(edit) = editing_due {
                spans.push(Span::styled("  due: ", base.fg(theme.dim)));
                push_edit_spans(&mut spans, app, edit, base.fg(theme.text_bright));
            } else if let Item::Task(task) = &row.item
                && let Some(due) = task.due_date
                && !done
            {
                let color = theme.due_color(days_until(due, today));
                spans.push(Span::styled(
                    format!("  {}", due_label(due, today)),
                    base.fg(color),
                ));
            }
        }
    }

    fit_to_width(spans, width as usize, base)
}

/// Truncate the last spans that overflow and pad the rest with `fill`
fn fit_to_width(spans: Vec<Span<'static>>, width: usize, fill: Style) -> Line<'static> {
    let mut out = Vec::with_capacity(spans.len() + 1);
    let mut used = 0;
    for span in spans {
        let w = display_width(&span.content);
        if used + w <= width {
            used += w;
            out.push(span);
        } else {
            let room = width.saturating_sub(used);
            if room > 0 {
                let text = truncate_to_width(&span.content, room);
                used += display_width(&text);
                out.push(Span::styled(text, span.style));
            }
            break;
        }
    }
    if used < width {
        out.push(Span::styled(" ".repeat(width - used), fill));
    }
    Line::from(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::session::AddTarget;
    use insta::assert_snapshot;
    use crate::tui::render::test_helpers::{
        TERM_W, app_with_sample, empty_app, render_to_string,
    };
    use crate::util::due::parse_due;

    fn render(app: &mut App, h: u16) -> String {
        render_to_string(TERM_W, h, |frame, area| render_tree_view(frame, app, area))
    }

    #[test]
    fn renders_levels_and_markers() {
        let mut app = app_with_sample();
        let output = render(&mut app, 10);
        assert_snapshot!(output);
    }

    #[test]
    fn due_label_and_completion() {
        let mut app = app_with_sample();
        let in_three = chrono::Local::now().date_naive() + chrono::Days::new(3);
        let due = parse_due(&in_three.format("%Y-%m-%d").to_string()).unwrap();
        app.session.due_submitted("task_4", Some(due));
        app.session.item_activated("subtask_3");
        app.session.refresh();

        let out = render(&mut app, 10);
        assert!(out.contains("[ ] Buy food  due in 3 days"));
        assert!(out.contains("[x] Phone"));
    }

    #[test]
    fn placeholder_row_shows_hint_then_typed_text() {
        let mut app = app_with_sample();
        app.select_id("folder_1");
        app.request_add(AddTarget::Task {
            folder_id: "folder_1".into(),
        });
        let output = render(&mut app, 10);
        assert_snapshot!(output);

        for c in "Milk".chars() {
            app.edit.as_mut().unwrap().buffer.insert(c);
        }
        let out = render(&mut app, 10);
        assert!(out.contains("+ Milk\u{258C}"));
        assert!(!out.contains("Enter a title"));
    }

    #[test]
    fn scrolls_to_keep_cursor_visible() {
        let mut app = app_with_sample();
        app.cursor = 4;
        let out = render(&mut app, 2);
        assert_eq!(app.scroll_offset, 3);
        assert!(out.contains("Buy food"));
        assert!(out.contains("Work"));
        assert!(!out.contains("Home"));
    }

    #[test]
    fn empty_tree_message() {
        let mut app = empty_app();
        let output = render(&mut app, 3);
        assert_snapshot!(output);
    }
}
