// Theme module - Color constants and theme re-exports
//
// This module provides the palette for the wall: a dark backdrop with
// violet chrome so the per-person node hues stand out.

pub mod default;

use ratatui::style::Color;

/// Backdrop every faded element blends toward
/// RGB: (11, 11, 22)
pub const WALL_BG: (u8, u8, u8) = (11, 11, 22);

/// Primary accent color - used for borders, titles, key hints
/// RGB: (187, 154, 247)
pub const ACCENT_VIOLET: Color = Color::Rgb(187, 154, 247);

/// Secondary accent - used for ticker arrows and the header tagline
/// RGB: (255, 158, 100)
pub const ACCENT_ORANGE: Color = Color::Rgb(255, 158, 100);

/// Errors and offline state
/// RGB: (247, 118, 142)
pub const ERROR_RED: Color = Color::Rgb(247, 118, 142);

/// Connected state and enabled toggles
/// RGB: (158, 206, 106)
pub const LIVE_GREEN: Color = Color::Rgb(158, 206, 106);

/// Neutral text
/// RGB: (169, 177, 214)
pub const TEXT_MUTED: Color = Color::Rgb(169, 177, 214);

/// Activity ring around recently active nodes
/// RGB: (255, 255, 255)
pub const RING_WHITE: (u8, u8, u8) = (255, 255, 255);

/// Heatmap glow
/// RGB: (255, 96, 64)
pub const HEAT_RED: (u8, u8, u8) = (255, 96, 64);

pub use default::*;
