//! Inputs to the compositing engine.

use crate::config::{IconVariant, ImageFormat, MarkerStyle, Settings};
use crate::draw::{Color, FontDescriptor};
use serde::{Deserialize, Serialize};

/// Click position in CSS pixels relative to the visible viewport.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

impl Coordinates {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// How the click marker should look.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerSpec {
    pub color: Color,
    pub opacity: f64,
    /// Diameter in CSS pixels.
    pub size: f64,
    pub style: MarkerStyle,
}

/// Everything drawn on top of one capture. Immutable per capture.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySpec {
    pub coordinates: Coordinates,
    /// Ratio between image pixels and CSS pixels (HiDPI captures are larger).
    pub device_pixel_ratio: f64,
    pub marker: Option<MarkerSpec>,
    pub icon_variant: Option<IconVariant>,
    pub annotation_text: Option<String>,
    pub transcription_text: Option<String>,
    pub format: ImageFormat,
    /// Encoder quality in 0..1, only used by lossy formats.
    pub quality: f64,
    pub font: FontDescriptor,
    pub font_size: f64,
    /// Upper bound for a wrapped line, in CSS pixels.
    pub max_text_width: f64,
}

impl OverlaySpec {
    /// Builds the spec for one capture from the current settings merged with
    /// the request fields.
    pub fn from_settings(
        settings: &Settings,
        coordinates: Coordinates,
        icon_variant: Option<IconVariant>,
        annotation_text: Option<String>,
        transcription_text: Option<String>,
        device_pixel_ratio: Option<f64>,
    ) -> Self {
        let marker = settings.show_marker.then(|| MarkerSpec {
            color: settings.marker_color(),
            opacity: settings.marker_opacity,
            size: settings.marker_size,
            style: settings.marker_style,
        });

        Self {
            coordinates,
            device_pixel_ratio: device_pixel_ratio
                .filter(|ratio| ratio.is_finite() && *ratio > 0.0)
                .unwrap_or(1.0),
            marker,
            icon_variant: icon_variant.or(Some(settings.icon_variant)),
            annotation_text: non_empty(annotation_text),
            transcription_text: non_empty(transcription_text),
            format: settings.image_format,
            quality: settings.image_quality,
            font: FontDescriptor::new(
                settings.font_family.clone(),
                "normal".to_string(),
                "normal".to_string(),
            ),
            font_size: settings.font_size,
            max_text_width: settings.max_text_width,
        }
    }

    /// Paragraphs shown in the text box: annotation first, then transcription.
    pub fn text_paragraphs(&self) -> Vec<&str> {
        [&self.annotation_text, &self.transcription_text]
            .into_iter()
            .filter_map(|text| text.as_deref())
            .collect()
    }
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}
