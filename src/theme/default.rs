// Color helpers
//
// The canvas has no alpha channel, so transparency is emulated by blending
// toward the wall backdrop.

use ratatui::style::Color;

use super::{ACCENT_ORANGE, ERROR_RED, LIVE_GREEN, WALL_BG};
use crate::stream::StreamStatus;

/// Interpolate between two RGB colors based on a ratio (0.0 ~ 1.0)
///
/// # Arguments
/// * `color1` - Starting color as (r, g, b) tuple
/// * `color2` - Ending color as (r, g, b) tuple
/// * `ratio` - Interpolation ratio (0.0 = color1, 1.0 = color2)
///
/// # Returns
/// Interpolated Color::Rgb value
pub fn interpolate_color(color1: (u8, u8, u8), color2: (u8, u8, u8), ratio: f32) -> Color {
    let ratio = ratio.clamp(0.0, 1.0);
    let r = (color1.0 as f32 + (color2.0 as f32 - color1.0 as f32) * ratio) as u8;
    let g = (color1.1 as f32 + (color2.1 as f32 - color1.1 as f32) * ratio) as u8;
    let b = (color1.2 as f32 + (color2.2 as f32 - color1.2 as f32) * ratio) as u8;
    Color::Rgb(r, g, b)
}

/// `color` drawn at `opacity` over the backdrop
pub fn fade(color: (u8, u8, u8), opacity: f64) -> Color {
    interpolate_color(WALL_BG, color, opacity as f32)
}

/// Brighten toward white by `amount`
pub fn lighten(color: (u8, u8, u8), amount: f64) -> Color {
    interpolate_color(color, (255, 255, 255), amount as f32)
}

pub fn status_color(status: StreamStatus) -> Color {
    match status {
        StreamStatus::Connected => LIVE_GREEN,
        StreamStatus::Connecting => ACCENT_ORANGE,
        StreamStatus::Disconnected => ERROR_RED,
    }
}
