//! User-editable settings exchanged with the control panel.
//!
//! The `[overlay]`/`[storage]` config sections provide defaults; the values
//! the user edits are persisted in the key-value store under
//! [`Settings::STORE_KEY`] and merged on top.

use super::Config;
use super::enums::{IconVariant, ImageFormat, MarkerStyle};
use crate::draw::{Color, color::RED};
use serde::{Deserialize, Serialize};

/// Settings as seen by the control panel (camelCase on the wire).
/// Missing fields take their config-file defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub marker_color: String,
    pub marker_opacity: f64,
    pub marker_size: f64,
    pub marker_style: MarkerStyle,
    pub show_marker: bool,
    pub icon_variant: IconVariant,
    pub image_format: ImageFormat,
    pub image_quality: f64,
    pub organize_by_month: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_path: Option<String>,
    pub font_family: String,
    pub font_size: f64,
    pub max_text_width: f64,
    pub notifications: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl Settings {
    pub const STORE_KEY: &'static str = "settings";

    /// Settings derived purely from the config file.
    pub fn from_config(config: &Config) -> Self {
        let overlay = &config.overlay;
        Self {
            marker_color: overlay.marker_color.to_color().to_hex(),
            marker_opacity: overlay.marker_opacity,
            marker_size: overlay.marker_size,
            marker_style: overlay.marker_style,
            show_marker: overlay.show_marker,
            icon_variant: overlay.icon_variant,
            image_format: overlay.image_format,
            image_quality: overlay.image_quality,
            organize_by_month: config.storage.organize_by_month,
            custom_path: None,
            font_family: overlay.font_family.clone(),
            font_size: overlay.font_size,
            max_text_width: overlay.max_text_width,
            notifications: config.capture.notify,
        }
    }

    /// Parsed marker color; unparseable values fall back to red.
    pub fn marker_color(&self) -> Color {
        Color::from_hex(&self.marker_color).unwrap_or_else(|| {
            log::warn!("Invalid marker color '{}', using red", self.marker_color);
            RED
        })
    }

    /// Clamps numeric fields into the ranges the config file enforces.
    pub fn clamp(&mut self) {
        self.marker_opacity = self.marker_opacity.clamp(0.0, 1.0);
        self.marker_size = self.marker_size.clamp(4.0, 200.0);
        self.image_quality = self.image_quality.clamp(0.1, 1.0);
        self.font_size = self.font_size.clamp(8.0, 72.0);
        self.max_text_width = self.max_text_width.clamp(120.0, 800.0);
        if Color::from_hex(&self.marker_color).is_none() {
            log::warn!(
                "Ignoring invalid marker color '{}', using #ff0000",
                self.marker_color
            );
            self.marker_color = RED.to_hex();
        }
        if self.font_family.trim().is_empty() {
            self.font_family = "Sans".to_string();
        }
        if let Some(path) = &self.custom_path
            && path.trim().is_empty()
        {
            self.custom_path = None;
        }
    }

    /// Returns a copy with `patch` applied and clamped.
    pub fn merged(&self, patch: &SettingsPatch) -> Self {
        let mut next = self.clone();
        patch.apply_to(&mut next);
        next.clamp();
        next
    }
}

/// Partial settings update sent with `UPDATE_SETTINGS`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsPatch {
    pub marker_color: Option<String>,
    pub marker_opacity: Option<f64>,
    pub marker_size: Option<f64>,
    pub marker_style: Option<MarkerStyle>,
    pub show_marker: Option<bool>,
    pub icon_variant: Option<IconVariant>,
    pub image_format: Option<ImageFormat>,
    pub image_quality: Option<f64>,
    pub organize_by_month: Option<bool>,
    pub custom_path: Option<String>,
    pub font_family: Option<String>,
    pub font_size: Option<f64>,
    pub max_text_width: Option<f64>,
    pub notifications: Option<bool>,
}

impl SettingsPatch {
    fn apply_to(&self, settings: &mut Settings) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if let Some(value) = &self.$field {
                    settings.$field = value.clone();
                })*
            };
        }
        take!(
            marker_color,
            marker_opacity,
            marker_size,
            marker_style,
            show_marker,
            icon_variant,
            image_format,
            image_quality,
            organize_by_month,
            font_family,
            font_size,
            max_text_width,
            notifications
        );
        if let Some(path) = &self.custom_path {
            settings.custom_path = Some(path.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_config() {
        let settings = Settings::from_config(&Config::default());
        assert_eq!(settings.marker_color, "#ff0000");
        assert_eq!(settings.marker_style, MarkerStyle::Solid);
        assert_eq!(settings.icon_variant, IconVariant::Blue);
        assert!(settings.organize_by_month);
    }

    #[test]
    fn patch_overrides_only_given_fields() {
        let base = Settings::from_config(&Config::default());
        let patch: SettingsPatch =
            serde_json::from_str(r#"{"markerStyle":"dotted","markerOpacity":4.0}"#).unwrap();
        let merged = base.merged(&patch);
        assert_eq!(merged.marker_style, MarkerStyle::Dotted);
        assert_eq!(merged.marker_opacity, 1.0);
        assert_eq!(merged.marker_size, base.marker_size);
    }

    #[test]
    fn invalid_color_in_patch_is_replaced() {
        let base = Settings::from_config(&Config::default());
        let patch = SettingsPatch {
            marker_color: Some("not-a-color".into()),
            ..Default::default()
        };
        assert_eq!(base.merged(&patch).marker_color, "#ff0000");
    }

    #[test]
    fn wire_format_is_camel_case() {
        let json = serde_json::to_value(Settings::from_config(&Config::default())).unwrap();
        assert!(json.get("markerColor").is_some());
        assert!(json.get("organizeByMonth").is_some());
        assert!(json.get("customPath").is_none());
    }
}
