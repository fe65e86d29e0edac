// Header rendering module
//
// Title line with the event id and global stats. Hidden in kiosk mode.

use crate::app::AppState;
use crate::theme::{status_color, ACCENT_ORANGE, ACCENT_VIOLET, ERROR_RED, TEXT_MUTED};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

pub fn header_line(app: &AppState) -> Line<'static> {
    let mut spans = vec![
        Span::styled(
            " ◉ CONNECTION WALL ",
            Style::default()
                .fg(Color::Rgb(138, 43, 226))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("» {} ", app.event_id),
            Style::default().fg(ACCENT_ORANGE).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(
                "  [people: {}] [connections: {}] ",
                app.store.node_count(),
                app.store.edge_count()
            ),
            Style::default().fg(TEXT_MUTED),
        ),
        Span::styled(
            format!("[{}]", app.status.label()),
            Style::default()
                .fg(status_color(app.status))
                .add_modifier(Modifier::BOLD),
        ),
    ];

    if let Some(error) = &app.snapshot_error {
        spans.push(Span::styled(
            format!("  snapshot failed: {error}"),
            Style::default().fg(ERROR_RED),
        ));
    }

    Line::from(spans)
}

pub fn render_header(f: &mut Frame, area: Rect, app: &AppState) {
    let header = Paragraph::new(header_line(app))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Double)
                .border_style(Style::default().fg(ACCENT_VIOLET)),
        )
        .alignment(Alignment::Left);

    f.render_widget(header, area);
}
