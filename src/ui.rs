//! Rendering for the `--tui` view.
//!
//! A scrollable list of emitted events on top and a one-line status bar
//! below.  State lives in [`App`]; key handling in [`crate::input`].

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::app::{App, EventRow};

pub fn draw(app: &mut App, frame: &mut Frame) {
    let [main_area, status_area] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(frame.area());

    draw_event_list(app, frame, main_area);
    draw_status_bar(app, frame, status_area);
}

/// `2024-01-01T08:30:00.000Z` → `2024-01-01 08:30`
fn short_time(published: &str) -> String {
    match published.get(..16) {
        Some(prefix) => prefix.replacen('T', " ", 1),
        None => published.to_string(),
    }
}

fn row_line(row: &EventRow) -> Line<'_> {
    let mut spans = vec![
        Span::styled(
            format!("{:<16}", short_time(&row.published)),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw(" "),
        Span::styled(row.title.as_str(), Style::default().fg(Color::White)),
        Span::raw("  "),
        Span::styled(format!("[{}]", row.feed), Style::default().fg(Color::Cyan)),
    ];
    if row.images > 0 {
        spans.push(Span::styled(
            format!(" {} img", row.images),
            Style::default().fg(Color::Magenta),
        ));
    }
    Line::from(spans)
}

fn draw_event_list(app: &mut App, frame: &mut Frame, area: Rect) {
    let items: Vec<ListItem> = app.rows.iter().map(|r| ListItem::new(row_line(r))).collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title(" Full-text RSS ")
                .borders(Borders::ALL),
        )
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        )
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn draw_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let status = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled(app.status.as_str(), Style::default().fg(Color::Yellow)),
        Span::raw("  "),
        Span::styled(
            format!("{} events", app.rows.len()),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  q: quit  ↑/↓: scroll  Home/End: jump"),
    ]));
    frame.render_widget(status, area);
}
