//! Configuration type definitions.

use super::enums::{ColorSpec, IconVariant, ImageFormat, MarkerStyle};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Capture pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CaptureConfig {
    /// Minimum time between two accepted captures in milliseconds (valid range: 100 - 60000)
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Extra URL prefixes that must never be captured (e.g. "https://intranet.example/")
    #[serde(default)]
    pub restricted_prefixes: Vec<String>,

    /// Show a desktop notification after each capture
    #[serde(default = "default_notify")]
    pub notify: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
            restricted_prefixes: Vec::new(),
            notify: default_notify(),
        }
    }
}

/// Defaults for the overlay drawn on every capture.
///
/// These seed the user settings; values changed through the control panel are
/// stored separately and take precedence.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OverlayConfig {
    /// Marker color - a named color, `#rrggbb`, or `[r, g, b]`
    #[serde(default)]
    pub marker_color: ColorSpec,

    /// Marker opacity (valid range: 0.0 - 1.0)
    #[serde(default = "default_marker_opacity")]
    pub marker_opacity: f64,

    /// Marker diameter in CSS pixels (valid range: 4.0 - 200.0)
    #[serde(default = "default_marker_size")]
    pub marker_size: f64,

    /// Marker style: solid, dashed, or dotted
    #[serde(default)]
    #[schemars(with = "String")]
    pub marker_style: MarkerStyle,

    /// Draw the marker at all
    #[serde(default = "default_true")]
    pub show_marker: bool,

    /// Pointer icon variant: light, blue, or dark
    #[serde(default)]
    pub icon_variant: IconVariant,

    /// Output format: png or jpeg
    #[serde(default)]
    pub image_format: ImageFormat,

    /// Encoder quality for lossy formats (valid range: 0.1 - 1.0)
    #[serde(default = "default_image_quality")]
    pub image_quality: f64,

    /// Font family for annotation text
    #[serde(default = "default_font_family")]
    pub font_family: String,

    /// Font size for annotation text in points (valid range: 8.0 - 72.0)
    #[serde(default = "default_font_size")]
    pub font_size: f64,

    /// Upper bound for the annotation box line width in CSS pixels (valid range: 120.0 - 800.0)
    #[serde(default = "default_max_text_width")]
    pub max_text_width: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            marker_color: ColorSpec::default(),
            marker_opacity: default_marker_opacity(),
            marker_size: default_marker_size(),
            marker_style: MarkerStyle::default(),
            show_marker: default_true(),
            icon_variant: IconVariant::default(),
            image_format: ImageFormat::default(),
            image_quality: default_image_quality(),
            font_family: default_font_family(),
            font_size: default_font_size(),
            max_text_width: default_max_text_width(),
        }
    }
}

/// Where and how captures are stored.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StorageConfig {
    /// Directory downloads are written to (defaults to the XDG download dir)
    #[serde(default)]
    pub download_dir: Option<String>,

    /// Folder created inside the download directory
    #[serde(default = "default_root_folder")]
    pub root_folder: String,

    /// Sort captures into `{yyyy}/{MM}-{Month}/by-domain/{domain}` sub-folders
    #[serde(default = "default_true")]
    pub organize_by_month: bool,

    /// Metadata store file (defaults to `~/.local/share/clickshot/store.json`)
    #[serde(default)]
    pub store_path: Option<String>,

    /// Maximum number of screenshots kept in the metadata index (valid range: 10 - 1000)
    #[serde(default = "default_max_index_entries")]
    pub max_index_entries: usize,

    /// Fraction of the quota after which space is reported as low (valid range: 0.5 - 1.0)
    #[serde(default = "default_quota_warning_ratio")]
    pub quota_warning_ratio: f64,

    /// Directory holding `pointer-light.png`, `pointer-blue.png` and `pointer-dark.png`
    #[serde(default)]
    pub icon_dir: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            download_dir: None,
            root_folder: default_root_folder(),
            organize_by_month: default_true(),
            store_path: None,
            max_index_entries: default_max_index_entries(),
            quota_warning_ratio: default_quota_warning_ratio(),
            icon_dir: None,
        }
    }
}

/// Background controller settings.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RuntimeConfig {
    /// Seconds between keep-alive pings (valid range: 5 - 300)
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            keep_alive_secs: default_keep_alive_secs(),
        }
    }
}

// =============================================================================
// Defaults
// =============================================================================

fn default_cooldown_ms() -> u64 {
    1000
}

fn default_notify() -> bool {
    false
}

fn default_true() -> bool {
    true
}

fn default_marker_opacity() -> f64 {
    0.8
}

fn default_marker_size() -> f64 {
    24.0
}

fn default_image_quality() -> f64 {
    0.85
}

fn default_font_family() -> String {
    "Sans".to_string()
}

fn default_font_size() -> f64 {
    14.0
}

fn default_max_text_width() -> f64 {
    300.0
}

fn default_root_folder() -> String {
    "UX-Screenshots".to_string()
}

pub(crate) fn default_max_index_entries() -> usize {
    1000
}

fn default_quota_warning_ratio() -> f64 {
    0.9
}

fn default_keep_alive_secs() -> u64 {
    20
}
