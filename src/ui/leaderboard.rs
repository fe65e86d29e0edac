// Leaderboard rendering module
//
// Top connectors by degree, crowned for the first three places.

use super::wall::truncate_label;
use crate::app::config::LEADERBOARD_SIZE;
use crate::app::AppState;
use crate::render::Crown;
use crate::theme::{ACCENT_ORANGE, ACCENT_VIOLET, TEXT_MUTED};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem},
    Frame,
};

const NAME_COLS: usize = 16;

/// Panel size that fits every row plus borders
pub fn leaderboard_height(app: &AppState) -> u16 {
    let rows = app.store.node_count().clamp(1, LEADERBOARD_SIZE);
    rows as u16 + 2
}

pub fn leaderboard_lines(app: &AppState) -> Vec<Line<'static>> {
    let leaders = app.store.leaders(LEADERBOARD_SIZE);
    if leaders.is_empty() {
        return vec![Line::from(Span::styled(
            " nobody yet",
            Style::default().fg(Color::DarkGray),
        ))];
    }

    leaders
        .into_iter()
        .enumerate()
        .map(|(idx, (node, degree))| {
            let (badge, badge_style) = match Crown::for_rank(idx) {
                Some(crown) => (
                    crown.symbol().to_string(),
                    Style::default().fg(crown.color()),
                ),
                None => (" ".to_string(), Style::default()),
            };
            Line::from(vec![
                Span::styled(format!("{:2}.", idx + 1), Style::default().fg(Color::DarkGray)),
                Span::styled(badge, badge_style),
                Span::styled(
                    format!(" {:<width$}", truncate_label(&node.name, NAME_COLS), width = NAME_COLS),
                    Style::default().fg(TEXT_MUTED),
                ),
                Span::styled(
                    format!("{degree:>3}"),
                    Style::default().fg(ACCENT_ORANGE).add_modifier(Modifier::BOLD),
                ),
            ])
        })
        .collect()
}

pub fn render_leaderboard(f: &mut Frame, area: Rect, app: &AppState) {
    let items: Vec<ListItem> = leaderboard_lines(app).into_iter().map(ListItem::new).collect();

    let list = List::new(items).block(
        Block::default()
            .title(Span::styled(
                "━ Top Connectors ",
                Style::default().fg(ACCENT_ORANGE).add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(ACCENT_VIOLET)),
    );

    f.render_widget(Clear, area);
    f.render_widget(list, area);
}
