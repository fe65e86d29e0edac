// UI rendering module
//
// This module contains all UI rendering components for the wall.
// The main draw() function lays out the canvas and floats the optional
// panels over it.

mod header;
mod leaderboard;
mod status_bar;
mod ticker;
mod wall;

use crate::app::config::TICKER_MAX;
use crate::app::AppState;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    Frame,
};

use header::render_header;
use leaderboard::{leaderboard_height, render_leaderboard};
use status_bar::render_status_bar;
use ticker::{render_ticker, render_toasts, toast_lines};
use wall::render_wall;

const LEADERBOARD_WIDTH: u16 = 28;
const TICKER_WIDTH: u16 = 38;
const TOAST_WIDTH: u16 = 64;

/// Main UI drawing function
pub fn draw(f: &mut Frame, app: &AppState, now: i64) {
    let size = f.area();

    let wall_area = if app.toggles.kiosk {
        size
    } else {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(0),    // Wall
                Constraint::Length(3), // Status bar
            ])
            .split(size);
        render_header(f, chunks[0], app);
        render_status_bar(f, chunks[2], app);
        chunks[1]
    };

    render_wall(f, wall_area, app);

    if app.toggles.leaderboard {
        let area = top_right(wall_area, LEADERBOARD_WIDTH, leaderboard_height(app));
        render_leaderboard(f, area, app);
    }

    if app.toggles.ticker && !app.ticker.is_empty() {
        let height = app.ticker.len().min(TICKER_MAX) as u16 + 2;
        render_ticker(f, bottom_left(wall_area, TICKER_WIDTH, height), app, now);
    }

    let toasts = toast_lines(app);
    if !toasts.is_empty() {
        let height = toasts.len() as u16 + 2;
        render_toasts(f, top_center(wall_area, TOAST_WIDTH, height), toasts);
    }
}

/// Clamp a panel of `width` x `height` to fit inside `area`
fn fit(area: Rect, width: u16, height: u16) -> (u16, u16) {
    (width.min(area.width), height.min(area.height))
}

fn top_right(area: Rect, width: u16, height: u16) -> Rect {
    let (w, h) = fit(area, width, height);
    Rect::new(area.x + area.width - w, area.y, w, h)
}

fn bottom_left(area: Rect, width: u16, height: u16) -> Rect {
    let (w, h) = fit(area, width, height);
    Rect::new(area.x, area.y + area.height - h, w, h)
}

fn top_center(area: Rect, width: u16, height: u16) -> Rect {
    let (w, h) = fit(area, width, height);
    Rect::new(area.x + (area.width - w) / 2, area.y, w, h)
}
