//! Pure description of a composed capture as an ordered list of layers.
//!
//! Planning does no drawing: a backend renders the resulting [`Composition`]
//! in a single pass, and tests can assert on the layer list directly.

use super::layout::{Placement, TextMeasure, wrap_text};
use super::spec::OverlaySpec;
use crate::config::{IconVariant, MarkerStyle};
use crate::draw::{Color, FontDescriptor, color::WHITE};
use crate::util::Rect;

/// Pointer icon edge length in CSS pixels.
pub const ICON_SIZE: f64 = 24.0;
/// Stroke width of dashed/dotted markers in CSS pixels.
pub const MARKER_LINE_WIDTH: f64 = 2.0;
/// Padding inside the annotation box in CSS pixels.
pub const TEXT_PADDING: f64 = 8.0;
/// Gap between the marker edge and the annotation box in CSS pixels.
pub const TEXT_GAP: f64 = 12.0;
/// Minimum distance between the annotation box and the image edge in CSS pixels.
pub const EDGE_MARGIN: f64 = 8.0;
/// Corner radius of the annotation box in CSS pixels.
pub const CORNER_RADIUS: f64 = 6.0;
/// Lower bound for the wrap width when little space is left beside the marker.
pub const MIN_TEXT_WIDTH: f64 = 120.0;

const TEXT_BACKGROUND: Color = Color {
    r: 0.0,
    g: 0.0,
    b: 0.0,
    a: 0.75,
};

/// One drawing step, in image pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    /// The captured bitmap at its natural size.
    Base { width: u32, height: u32 },
    Marker {
        center_x: f64,
        center_y: f64,
        radius: f64,
        color: Color,
        style: MarkerStyle,
        line_width: f64,
    },
    /// Pointer icon with its tip at (`x`, `y`).
    Icon {
        variant: IconVariant,
        x: f64,
        y: f64,
        size: f64,
    },
    TextBox {
        rect: Rect,
        lines: Vec<String>,
        font: FontDescriptor,
        font_size: f64,
        line_height: f64,
        padding: f64,
        corner_radius: f64,
        background: Color,
        text_color: Color,
    },
}

/// Ordered layers for one capture, bottom first.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub width: u32,
    pub height: u32,
    pub layers: Vec<Layer>,
}

impl Composition {
    pub fn text_box(&self) -> Option<&Layer> {
        self.layers
            .iter()
            .find(|layer| matches!(layer, Layer::TextBox { .. }))
    }
}

/// Lays out the overlay for a `width` x `height` capture.
///
/// `font` is the resolved annotation font and `measure` must measure text at
/// `spec.font_size * device_pixel_ratio`.
pub fn plan_composition(
    spec: &OverlaySpec,
    font: &FontDescriptor,
    width: u32,
    height: u32,
    measure: &dyn TextMeasure,
) -> Composition {
    let dpr = spec.device_pixel_ratio;
    let center_x = spec.coordinates.x * dpr;
    let center_y = spec.coordinates.y * dpr;

    let mut layers = vec![Layer::Base { width, height }];

    let mut marker_radius = 0.0;
    if let Some(marker) = &spec.marker {
        marker_radius = (marker.size / 2.0) * dpr;
        layers.push(Layer::Marker {
            center_x,
            center_y,
            radius: marker_radius,
            color: marker.color.with_opacity(marker.opacity),
            style: marker.style,
            line_width: MARKER_LINE_WIDTH * dpr,
        });
    }

    let icon_size = ICON_SIZE * dpr;
    if let Some(variant) = spec.icon_variant {
        layers.push(Layer::Icon {
            variant,
            x: center_x,
            y: center_y,
            size: icon_size,
        });
    }

    let paragraphs = spec.text_paragraphs();
    if !paragraphs.is_empty() {
        let padding = TEXT_PADDING * dpr;
        let margin = EDGE_MARGIN * dpr;
        let placement = Placement {
            anchor_x: center_x,
            anchor_y: center_y,
            offset: marker_radius.max(icon_size / 2.0) + TEXT_GAP * dpr,
            margin,
            image_width: width as f64,
            image_height: height as f64,
        };

        let max_line_width = wrap_width(spec, &placement, padding);
        let lines = wrap_text(&paragraphs.join("\n"), max_line_width, measure);

        if !lines.is_empty() {
            let line_height = measure.line_height().max(1.0);
            let text_width = lines
                .iter()
                .map(|line| measure.text_width(line))
                .fold(0.0, f64::max);
            let box_width = text_width + padding * 2.0;
            let box_height = line_height * lines.len() as f64 + padding * 2.0;

            layers.push(Layer::TextBox {
                rect: placement.place(box_width, box_height),
                lines,
                font: font.clone(),
                font_size: spec.font_size * dpr,
                line_height,
                padding,
                corner_radius: CORNER_RADIUS * dpr,
                background: TEXT_BACKGROUND,
                text_color: WHITE,
            });
        }
    }

    Composition {
        width,
        height,
        layers,
    }
}

/// Maximum wrapped line width: the configured limit, narrowed to the space
/// beside the marker but never below [`MIN_TEXT_WIDTH`] (or the image width).
fn wrap_width(spec: &OverlaySpec, placement: &Placement, padding: f64) -> f64 {
    let dpr = spec.device_pixel_ratio;
    let limit = spec.max_text_width * dpr;
    let beside = placement.side_space() - padding * 2.0;
    let floor = (MIN_TEXT_WIDTH * dpr)
        .min(placement.image_width - placement.margin * 2.0 - padding * 2.0);

    limit.min(beside).max(floor).max(1.0)
}
