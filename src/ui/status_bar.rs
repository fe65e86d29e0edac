// Status bar rendering module
//
// Renders the bottom status bar with keyboard shortcuts and toggle indicators.

use crate::app::config::DisplayToggles;
use crate::app::AppState;
use crate::theme::{ACCENT_VIOLET, LIVE_GREEN, TEXT_MUTED};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

struct Hint {
    priority: u8,
    key: &'static str,
    desc: &'static str,
    color: Color,
}

const HINTS: [Hint; 5] = [
    Hint {
        priority: 1,
        key: "Q:",
        desc: "Quit | ",
        color: Color::Red,
    },
    Hint {
        priority: 1,
        key: "A:",
        desc: "Autopan | ",
        color: ACCENT_VIOLET,
    },
    Hint {
        priority: 2,
        key: "L:",
        desc: "Leaders | ",
        color: ACCENT_VIOLET,
    },
    Hint {
        priority: 2,
        key: "T:",
        desc: "Ticker | ",
        color: ACCENT_VIOLET,
    },
    Hint {
        priority: 3,
        key: "H:",
        desc: "Heat ",
        color: ACCENT_VIOLET,
    },
];

pub fn status_line(app: &AppState, width: u16) -> Line<'static> {
    // Space left for hints after borders, icon and indicators
    let indicators = build_toggle_indicators(&app.toggles);
    let indicator_len: usize = indicators.iter().map(|s| s.content.chars().count()).sum();
    let available = (width as usize).saturating_sub(4 + indicator_len + 1);

    let mut spans = vec![Span::styled(" ◉ ", Style::default().fg(ACCENT_VIOLET))];
    let mut used = 3;

    // Add hints by priority until we run out of space
    for priority in 1..=3 {
        for hint in HINTS.iter().filter(|h| h.priority == priority) {
            let len = hint.key.len() + hint.desc.len();
            if used + len <= available {
                spans.push(Span::styled(
                    hint.key,
                    Style::default().fg(hint.color).add_modifier(Modifier::BOLD),
                ));
                spans.push(Span::raw(hint.desc));
                used += len;
            }
        }
    }

    spans.push(Span::raw(" "));
    spans.extend(indicators);
    Line::from(spans)
}

pub fn render_status_bar(f: &mut Frame, area: Rect, app: &AppState) {
    let status_bar = Paragraph::new(status_line(app, area.width))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Double)
                .border_style(Style::default().fg(ACCENT_VIOLET)),
        )
        .alignment(Alignment::Left);

    f.render_widget(status_bar, area);
}

/// Build toggle status indicator spans for the status bar
/// Shows [A:ON/OFF] [L:ON/OFF] [T:ON/OFF] [H:ON/OFF]
/// Green for ON, muted text for OFF
pub fn build_toggle_indicators(toggles: &DisplayToggles) -> Vec<Span<'static>> {
    let flags = [
        ("A", toggles.autopan),
        ("L", toggles.leaderboard),
        ("T", toggles.ticker),
        ("H", toggles.heat),
    ];

    let mut spans = Vec::new();
    for (key, on) in flags {
        let (state, color) = if on {
            ("ON", LIVE_GREEN)
        } else {
            ("OFF", TEXT_MUTED)
        };
        spans.push(Span::styled(format!("[{key}:"), Style::default().fg(TEXT_MUTED)));
        spans.push(Span::styled(
            state,
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled("] ", Style::default().fg(TEXT_MUTED)));
    }
    spans
}
