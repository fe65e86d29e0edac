// Wall (graph canvas) rendering module
//
// Paints the current `Scene` onto a Braille canvas: heat glow first, then
// fading connection trails, then nodes back to front with their halo,
// activity ring, crown and label.

use crate::app::AppState;
use crate::render::{HeatSpot, NodeVisual, Scene, TrailSegment};
use crate::theme::{fade, lighten, HEAT_RED, RING_WHITE, TEXT_MUTED, WALL_BG};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::Span,
    widgets::canvas::{Canvas, Circle, Context, Line as CanvasLine},
    Frame,
};
use unicode_width::UnicodeWidthStr;

/// Core glyph printed at a node center
const NODE_GLYPH: &str = "●";

/// Labels are cut to this many terminal columns
const LABEL_MAX_COLS: usize = 18;

/// Below this opacity a label is not printed at all
const LABEL_MIN_OPACITY: f64 = 0.08;

const EMPTY_MESSAGE: &str = "Waiting for the first connection...";

/// Canvas bounds that keep world units square on a terminal grid
///
/// Terminal cells are roughly twice as tall as wide, so `height` rows span
/// the same physical extent as `2 * height` columns. `y` always covers
/// -1..1 to match the projection.
pub fn canvas_bounds(width: u16, height: u16) -> ([f64; 2], [f64; 2]) {
    let height = f64::from(height.max(1));
    let aspect = f64::from(width.max(1)) / (2.0 * height);
    ([-aspect, aspect], [-1.0, 1.0])
}

/// Horizontal extent of one terminal column in canvas units
pub fn column_width(height: u16) -> f64 {
    1.0 / f64::from(height.max(1))
}

/// Cut a label to `max_cols` display columns, marking the cut with `…`
pub fn truncate_label(label: &str, max_cols: usize) -> String {
    if label.width() <= max_cols {
        return label.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in label.chars() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 1 > max_cols {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

pub fn render_wall(f: &mut Frame, area: Rect, app: &AppState) {
    let (x_bounds, y_bounds) = canvas_bounds(area.width, area.height);
    let column = column_width(area.height);
    let scene = &app.scene;
    let (r, g, b) = WALL_BG;

    let canvas = Canvas::default()
        .marker(Marker::Braille)
        .background_color(Color::Rgb(r, g, b))
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(move |ctx| {
            if scene.nodes.is_empty() {
                draw_empty(ctx, column);
                return;
            }

            for spot in &scene.heat {
                draw_heat(ctx, spot);
            }
            ctx.layer();

            for trail in &scene.trails {
                draw_trail(ctx, trail);
            }
            ctx.layer();

            for node in &scene.nodes {
                draw_node(ctx, node, scene);
            }
            for node in &scene.nodes {
                draw_label(ctx, node, scene, column);
            }
        });

    f.render_widget(canvas, area);
}

fn draw_empty(ctx: &mut Context, column: f64) {
    let offset = EMPTY_MESSAGE.width() as f64 / 2.0 * column;
    ctx.print(
        -offset,
        0.0,
        Span::styled(
            EMPTY_MESSAGE,
            Style::default().fg(TEXT_MUTED).add_modifier(Modifier::ITALIC),
        ),
    );
}

fn draw_heat(ctx: &mut Context, spot: &HeatSpot) {
    // Outer rings dimmer than inner ones for a soft falloff
    for (scale, strength) in [(1.0, 0.35), (0.66, 0.6), (0.33, 0.9)] {
        ctx.draw(&Circle {
            x: spot.x,
            y: spot.y,
            radius: spot.radius * scale,
            color: fade(HEAT_RED, spot.intensity * strength),
        });
    }
}

fn draw_trail(ctx: &mut Context, trail: &TrailSegment) {
    ctx.draw(&CanvasLine {
        x1: trail.from.0,
        y1: trail.from.1,
        x2: trail.to.0,
        y2: trail.to.1,
        color: fade(trail.color, trail.opacity * 0.8),
    });
}

fn draw_node(ctx: &mut Context, node: &NodeVisual, scene: &Scene) {
    if node.halo > 0.0 {
        ctx.draw(&Circle {
            x: node.x,
            y: node.y,
            radius: node.radius * 1.8,
            color: fade(node.color, node.halo * 0.5),
        });
    }
    if node.ring > 0.0 {
        ctx.draw(&Circle {
            x: node.x,
            y: node.y,
            radius: node.radius * 1.35,
            color: fade(RING_WHITE, node.ring),
        });
    }

    let focused = scene.focus.as_deref() == Some(node.id.as_str());
    let core = if focused {
        lighten(node.color, 0.35)
    } else {
        fade(node.color, 1.0)
    };
    ctx.draw(&Circle {
        x: node.x,
        y: node.y,
        radius: node.radius,
        color: core,
    });
    ctx.print(node.x, node.y, Span::styled(NODE_GLYPH, Style::default().fg(core)));
}

fn draw_label(ctx: &mut Context, node: &NodeVisual, scene: &Scene, column: f64) {
    let label_x = node.x + node.radius + column;

    if let Some(crown) = node.crown {
        ctx.print(
            node.x,
            node.y + node.radius + column * 2.0,
            Span::styled(crown.symbol(), Style::default().fg(crown.color())),
        );
    }

    if node.label_opacity < LABEL_MIN_OPACITY {
        return;
    }
    let mut style = Style::default().fg(fade((235, 235, 245), node.label_opacity));
    if scene.focus.as_deref() == Some(node.id.as_str()) {
        style = style.add_modifier(Modifier::BOLD);
    }
    ctx.print(
        label_x,
        node.y,
        Span::styled(truncate_label(&node.label, LABEL_MAX_COLS), style),
    );
}
