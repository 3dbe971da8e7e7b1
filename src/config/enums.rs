//! Configuration enum types.

use crate::draw::{Color, color::*};
use log::warn;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outline style of the click marker.
///
/// Unknown values (from an older or hand-edited settings blob) degrade to
/// [`MarkerStyle::Solid`] instead of failing deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum MarkerStyle {
    /// Filled circle
    #[default]
    Solid,
    /// Stroked circle, dash pattern `[4, 2]`
    Dashed,
    /// Stroked circle, dash pattern `[2, 2]`
    Dotted,
}

impl MarkerStyle {
    /// Dash pattern for stroked styles, `None` for a filled marker.
    pub fn dash_pattern(self) -> Option<[f64; 2]> {
        match self {
            MarkerStyle::Solid => None,
            MarkerStyle::Dashed => Some([4.0, 2.0]),
            MarkerStyle::Dotted => Some([2.0, 2.0]),
        }
    }
}

impl From<String> for MarkerStyle {
    fn from(value: String) -> Self {
        match value.to_lowercase().as_str() {
            "solid" => MarkerStyle::Solid,
            "dashed" => MarkerStyle::Dashed,
            "dotted" => MarkerStyle::Dotted,
            other => {
                warn!("Unknown marker style '{}', using solid", other);
                MarkerStyle::Solid
            }
        }
    }
}

/// Pointer icon drawn on top of the marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum IconVariant {
    Light,
    #[default]
    Blue,
    Dark,
}

impl IconVariant {
    pub const ALL: [IconVariant; 3] = [IconVariant::Light, IconVariant::Blue, IconVariant::Dark];

    pub fn as_str(self) -> &'static str {
        match self {
            IconVariant::Light => "light",
            IconVariant::Blue => "blue",
            IconVariant::Dark => "dark",
        }
    }

    /// Fill color used by the vector fallback pointer.
    pub fn fill_color(self) -> Color {
        match self {
            IconVariant::Light => WHITE,
            IconVariant::Blue => POINTER_BLUE,
            IconVariant::Dark => Color::from_rgb8(0x20, 0x21, 0x24),
        }
    }

    /// Outline color used by the vector fallback pointer.
    pub fn outline_color(self) -> Color {
        match self {
            IconVariant::Light => Color::from_rgb8(0x20, 0x21, 0x24),
            IconVariant::Blue | IconVariant::Dark => WHITE,
        }
    }
}

impl fmt::Display for IconVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encoded output format of the composited image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    #[serde(alias = "jpg")]
    Jpeg,
}

impl ImageFormat {
    /// File extension (also the wire name).
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

/// Color specification - either a named color, a hex string, or RGB values.
///
/// # Examples
/// ```toml
/// marker_color = "red"
/// marker_color = "#1a73e8"
/// marker_color = [255, 128, 0]
/// ```
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
#[serde(untagged)]
pub enum ColorSpec {
    /// Named color (red, green, blue, yellow, orange, pink, white, black) or `#rrggbb`
    Name(String),
    /// RGB color as [red, green, blue] where each component is 0-255
    Rgb([u8; 3]),
}

impl ColorSpec {
    /// Converts the color specification to a [`Color`].
    ///
    /// Unknown names default to red with a warning.
    pub fn to_color(&self) -> Color {
        match self {
            ColorSpec::Name(name) => name_to_color(name)
                .or_else(|| Color::from_hex(name))
                .unwrap_or_else(|| {
                    warn!("Unknown color '{}', using red", name);
                    RED
                }),
            ColorSpec::Rgb([r, g, b]) => Color::from_rgb8(*r, *g, *b),
        }
    }
}

impl Default for ColorSpec {
    fn default() -> Self {
        ColorSpec::Name("#ff0000".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_marker_style_degrades_to_solid() {
        let style: MarkerStyle = serde_json::from_str("\"wavy\"").unwrap();
        assert_eq!(style, MarkerStyle::Solid);
        let dotted: MarkerStyle = serde_json::from_str("\"Dotted\"").unwrap();
        assert_eq!(dotted, MarkerStyle::Dotted);
    }

    #[test]
    fn dash_patterns_follow_style() {
        assert_eq!(MarkerStyle::Solid.dash_pattern(), None);
        assert_eq!(MarkerStyle::Dashed.dash_pattern(), Some([4.0, 2.0]));
        assert_eq!(MarkerStyle::Dotted.dash_pattern(), Some([2.0, 2.0]));
    }

    #[test]
    fn jpg_alias_parses_as_jpeg() {
        let format: ImageFormat = serde_json::from_str("\"jpg\"").unwrap();
        assert_eq!(format, ImageFormat::Jpeg);
        assert_eq!(format.extension(), "jpeg");
    }

    #[test]
    fn color_spec_accepts_names_hex_and_rgb() {
        assert_eq!(ColorSpec::Name("blue".into()).to_color(), BLUE);
        assert_eq!(ColorSpec::Name("#00ff00".into()).to_color(), GREEN);
        assert_eq!(ColorSpec::Rgb([255, 255, 255]).to_color(), WHITE);
        assert_eq!(ColorSpec::Name("nope".into()).to_color(), RED);
    }
}
