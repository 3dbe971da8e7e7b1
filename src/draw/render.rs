//! Cairo/Pango drawing primitives for capture overlays.
//!
//! Every function here returns the Cairo status instead of discarding it: a
//! failed fill or stroke aborts the composition and the caller falls back to
//! the untouched capture.

use super::color::Color;
use super::font::FontDescriptor;
use crate::config::{IconVariant, MarkerStyle};
use crate::util::Rect;
use std::f64::consts::PI;

/// Renders the click marker: a filled disc for [`MarkerStyle::Solid`], or a
/// dashed/dotted ring otherwise.
///
/// # Arguments
/// * `ctx` - Cairo drawing context to render to
/// * `center_x`, `center_y` - Click position in image pixels
/// * `radius` - Marker radius in image pixels (clamped to at least 1px)
/// * `color` - Marker color with opacity already applied
/// * `style` - Fill or dash style
/// * `line_width` - Stroke width for dashed/dotted rings
pub fn render_marker(
    ctx: &cairo::Context,
    center_x: f64,
    center_y: f64,
    radius: f64,
    color: Color,
    style: MarkerStyle,
    line_width: f64,
) -> Result<(), cairo::Error> {
    if color.a <= 0.0 {
        return Ok(());
    }

    let radius = radius.max(1.0);
    ctx.save()?;
    ctx.set_source_rgba(color.r, color.g, color.b, color.a);
    ctx.new_sub_path();
    ctx.arc(center_x, center_y, radius, 0.0, PI * 2.0);

    let result = match style.dash_pattern() {
        None => ctx.fill(),
        Some(pattern) => {
            let scale = (line_width / 2.0).max(1.0);
            let dashes = [pattern[0] * scale, pattern[1] * scale];
            ctx.set_dash(&dashes, 0.0);
            ctx.set_line_width(line_width);
            ctx.stroke()
        }
    };

    ctx.restore()?;
    result
}

/// Draws a built-in arrow pointer with its tip at (`x`, `y`).
///
/// Used when the pointer icon image for `variant` cannot be loaded.
pub fn render_fallback_pointer(
    ctx: &cairo::Context,
    x: f64,
    y: f64,
    size: f64,
    variant: IconVariant,
) -> Result<(), cairo::Error> {
    // Outline of a classic cursor in a 16x24 unit box, tip at the origin.
    const POINTS: [(f64, f64); 7] = [
        (0.0, 0.0),
        (0.0, 17.0),
        (4.5, 13.0),
        (7.5, 20.0),
        (10.0, 19.0),
        (7.0, 12.0),
        (12.5, 12.0),
    ];

    let scale = size / 24.0;
    let fill = variant.fill_color();
    let outline = variant.outline_color();

    ctx.save()?;
    ctx.translate(x, y);
    ctx.scale(scale, scale);

    ctx.new_path();
    for (index, (px, py)) in POINTS.iter().enumerate() {
        if index == 0 {
            ctx.move_to(*px, *py);
        } else {
            ctx.line_to(*px, *py);
        }
    }
    ctx.close_path();

    ctx.set_source_rgba(fill.r, fill.g, fill.b, fill.a);
    ctx.fill_preserve()?;
    ctx.set_source_rgba(outline.r, outline.g, outline.b, outline.a);
    ctx.set_line_width(1.5);
    ctx.set_line_join(cairo::LineJoin::Round);
    let stroked = ctx.stroke();

    ctx.restore()?;
    stroked
}

/// Paints a decoded icon surface scaled into a `size` x `size` square with
/// its top-left corner (the pointer tip) at (`x`, `y`).
pub fn render_icon_surface(
    ctx: &cairo::Context,
    icon: &cairo::ImageSurface,
    x: f64,
    y: f64,
    size: f64,
) -> Result<(), cairo::Error> {
    let width = icon.width().max(1) as f64;
    let height = icon.height().max(1) as f64;

    ctx.save()?;
    ctx.translate(x, y);
    ctx.scale(size / width, size / height);
    ctx.set_source_surface(icon, 0.0, 0.0)?;
    let painted = ctx.paint();
    ctx.restore()?;
    painted
}

/// Adds a rounded rectangle path to the context.
fn rounded_rect_path(ctx: &cairo::Context, rect: &Rect, radius: f64) {
    let r = radius.min(rect.width / 2.0).min(rect.height / 2.0).max(0.0);
    let (x, y, w, h) = (rect.x, rect.y, rect.width, rect.height);

    ctx.new_sub_path();
    ctx.arc(x + w - r, y + r, r, -PI / 2.0, 0.0);
    ctx.arc(x + w - r, y + h - r, r, 0.0, PI / 2.0);
    ctx.arc(x + r, y + h - r, r, PI / 2.0, PI);
    ctx.arc(x + r, y + r, r, PI, 3.0 * PI / 2.0);
    ctx.close_path();
}

/// Renders pre-wrapped annotation text inside a rounded, semi-opaque box.
///
/// Lines are drawn one by one at `line_height` spacing so the drawn block
/// matches the measured box exactly.
#[allow(clippy::too_many_arguments)]
pub fn render_text_box(
    ctx: &cairo::Context,
    rect: &Rect,
    lines: &[String],
    font: &FontDescriptor,
    font_size: f64,
    line_height: f64,
    padding: f64,
    corner_radius: f64,
    background: Color,
    text_color: Color,
) -> Result<(), cairo::Error> {
    ctx.save()?;

    // Gray antialiasing avoids color fringing on the flattened capture
    ctx.set_antialias(cairo::Antialias::Best);

    rounded_rect_path(ctx, rect, corner_radius);
    ctx.set_source_rgba(background.r, background.g, background.b, background.a);
    ctx.fill()?;

    let layout = pangocairo::functions::create_layout(ctx);
    let font_desc = pango::FontDescription::from_string(&font.to_pango_string(font_size));
    layout.set_font_description(Some(&font_desc));

    ctx.set_source_rgba(text_color.r, text_color.g, text_color.b, text_color.a);
    for (index, line) in lines.iter().enumerate() {
        if line.is_empty() {
            continue;
        }
        layout.set_text(line);
        ctx.move_to(
            rect.x + padding,
            rect.y + padding + index as f64 * line_height,
        );
        pangocairo::functions::show_layout(ctx, &layout);
    }

    ctx.restore()?;
    Ok(())
}
