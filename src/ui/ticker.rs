// Ticker and achievement toasts
//
// The ticker lists the newest connections while they are fresh; toasts
// announce streak achievements for a few seconds.

use super::wall::truncate_label;
use crate::app::config::TICKER_TTL_MS;
use crate::app::AppState;
use crate::theme::{fade, ACCENT_ORANGE, ACCENT_VIOLET, LIVE_GREEN, TEXT_MUTED};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, Paragraph},
    Frame,
};

const NAME_COLS: usize = 14;

/// Newest first, fading out over the entry lifetime
pub fn ticker_lines(app: &AppState, now: i64) -> Vec<Line<'static>> {
    app.ticker
        .iter()
        .rev()
        .map(|item| {
            let age = (now - item.at).max(0) as f64;
            let opacity = (1.0 - age / TICKER_TTL_MS as f64).clamp(0.35, 1.0);
            let name = |s: &str| truncate_label(s, NAME_COLS);
            Line::from(vec![
                Span::styled(name(item.from.as_str()), Style::default().fg(fade((235, 235, 245), opacity))),
                Span::styled(" ⟷ ", Style::default().fg(ACCENT_ORANGE)),
                Span::styled(name(item.to.as_str()), Style::default().fg(fade((235, 235, 245), opacity))),
            ])
        })
        .collect()
}

pub fn render_ticker(f: &mut Frame, area: Rect, app: &AppState, now: i64) {
    let items: Vec<ListItem> = ticker_lines(app, now).into_iter().map(ListItem::new).collect();

    let list = List::new(items).block(
        Block::default()
            .title(Span::styled(
                "━ Just Connected ",
                Style::default().fg(ACCENT_ORANGE).add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(ACCENT_VIOLET)),
    );

    f.render_widget(Clear, area);
    f.render_widget(list, area);
}

pub fn toast_lines(app: &AppState) -> Vec<Line<'static>> {
    app.tracker
        .achievements()
        .iter()
        .rev()
        .map(|achievement| {
            let name = app
                .store
                .node(&achievement.node_id)
                .map_or(achievement.node_id.as_str(), |node| node.name.as_str());
            Line::from(vec![
                Span::styled("★ ", Style::default().fg(Color::Rgb(255, 215, 0))),
                Span::styled(
                    truncate_label(name, 24),
                    Style::default().fg(LIVE_GREEN).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(" is on a streak: {} connections!", achievement.streak),
                    Style::default().fg(TEXT_MUTED),
                ),
            ])
        })
        .collect()
}

pub fn render_toasts(f: &mut Frame, area: Rect, lines: Vec<Line<'static>>) {
    let toast = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .border_style(Style::default().fg(LIVE_GREEN)),
    );

    f.render_widget(Clear, area);
    f.render_widget(toast, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_config;
    use crate::graph::normalize::Connection;
    use crate::graph::{Edge, Node};
    use crate::stream::WallEvent;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn connect(app: &mut AppState, from: &str, to: &str, at: i64, rng: &mut StdRng) {
        let event = WallEvent::Edge(Connection {
            from: Node::new(from, format!("{from} name")),
            to: Node::new(to, format!("{to} name")),
            edge: Edge::new(from, to, at),
        });
        app.apply(event, at, rng);
    }

    #[test]
    fn test_ticker_newest_first() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut app = AppState::new(&test_config(), 0);
        connect(&mut app, "a", "b", 1_000, &mut rng);
        connect(&mut app, "c", "d", 2_000, &mut rng);

        let lines = ticker_lines(&app, 2_000);
        assert_eq!(lines.len(), 2);
        assert_eq!(text(&lines[0]), "c name ⟷ d name");
        assert_eq!(text(&lines[1]), "a name ⟷ b name");
    }

    #[test]
    fn test_toast_names_the_achiever() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut app = AppState::new(&test_config(), 0);
        assert!(toast_lines(&app).is_empty());

        for (i, peer) in ["b", "c", "d"].iter().enumerate() {
            let at = (i as i64 + 1) * 10_000;
            connect(&mut app, "a", peer, at, &mut rng);
        }
        let lines = toast_lines(&app);
        assert_eq!(lines.len(), 1);
        let line = text(&lines[0]);
        assert!(line.contains("a name"));
        assert!(line.contains("3 connections"));
    }
}
