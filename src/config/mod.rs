//! Configuration file support for clickshot.
//!
//! This module handles loading and validating settings from the configuration
//! file located at `~/.config/clickshot/config.toml`. Settings include capture
//! throttling, overlay defaults, storage layout, and controller tuning.
//!
//! If no config file exists, sensible defaults are used automatically.

pub mod enums;
pub mod settings;
pub mod types;

pub use enums::{ColorSpec, IconVariant, ImageFormat, MarkerStyle};
pub use settings::{Settings, SettingsPatch};
pub use types::{CaptureConfig, OverlayConfig, RuntimeConfig, StorageConfig};

use anyhow::{Context, Result};
use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure containing all settings.
///
/// # Example TOML
/// ```toml
/// [capture]
/// cooldown_ms = 1000
///
/// [overlay]
/// marker_color = "#ff0000"
/// marker_style = "dashed"
/// icon_variant = "blue"
///
/// [storage]
/// root_folder = "UX-Screenshots"
/// organize_by_month = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, JsonSchema)]
pub struct Config {
    /// Capture throttling and page restrictions
    #[serde(default)]
    pub capture: CaptureConfig,

    /// Overlay defaults (marker, icon, annotation text, encoding)
    #[serde(default)]
    pub overlay: OverlayConfig,

    /// Download location and metadata store
    #[serde(default)]
    pub storage: StorageConfig,

    /// Background controller tuning
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl Config {
    /// Validates and clamps all configuration values to acceptable ranges.
    ///
    /// Invalid values are clamped to the nearest valid value and a warning is logged.
    fn validate_and_clamp(&mut self) {
        if !(100..=60_000).contains(&self.capture.cooldown_ms) {
            log::warn!(
                "Invalid cooldown_ms {}, clamping to 100-60000 range",
                self.capture.cooldown_ms
            );
            self.capture.cooldown_ms = self.capture.cooldown_ms.clamp(100, 60_000);
        }

        if !(0.0..=1.0).contains(&self.overlay.marker_opacity) {
            log::warn!(
                "Invalid marker_opacity {:.2}, clamping to 0.0-1.0 range",
                self.overlay.marker_opacity
            );
            self.overlay.marker_opacity = self.overlay.marker_opacity.clamp(0.0, 1.0);
        }

        if !(4.0..=200.0).contains(&self.overlay.marker_size) {
            log::warn!(
                "Invalid marker_size {:.1}, clamping to 4.0-200.0 range",
                self.overlay.marker_size
            );
            self.overlay.marker_size = self.overlay.marker_size.clamp(4.0, 200.0);
        }

        if !(0.1..=1.0).contains(&self.overlay.image_quality) {
            log::warn!(
                "Invalid image_quality {:.2}, clamping to 0.1-1.0 range",
                self.overlay.image_quality
            );
            self.overlay.image_quality = self.overlay.image_quality.clamp(0.1, 1.0);
        }

        if !(8.0..=72.0).contains(&self.overlay.font_size) {
            log::warn!(
                "Invalid font_size {:.1}, clamping to 8.0-72.0 range",
                self.overlay.font_size
            );
            self.overlay.font_size = self.overlay.font_size.clamp(8.0, 72.0);
        }

        if !(120.0..=800.0).contains(&self.overlay.max_text_width) {
            log::warn!(
                "Invalid max_text_width {:.1}, clamping to 120.0-800.0 range",
                self.overlay.max_text_width
            );
            self.overlay.max_text_width = self.overlay.max_text_width.clamp(120.0, 800.0);
        }

        if self.overlay.font_family.trim().is_empty() {
            log::warn!("Empty font_family, falling back to 'Sans'");
            self.overlay.font_family = "Sans".to_string();
        }

        if !(10..=1000).contains(&self.storage.max_index_entries) {
            log::warn!(
                "Invalid max_index_entries {}, clamping to 10-1000 range",
                self.storage.max_index_entries
            );
            self.storage.max_index_entries = self.storage.max_index_entries.clamp(10, 1000);
        }

        if !(0.5..=1.0).contains(&self.storage.quota_warning_ratio) {
            log::warn!(
                "Invalid quota_warning_ratio {:.2}, clamping to 0.5-1.0 range",
                self.storage.quota_warning_ratio
            );
            self.storage.quota_warning_ratio = self.storage.quota_warning_ratio.clamp(0.5, 1.0);
        }

        let root = sanitize_folder_name(&self.storage.root_folder);
        if root != self.storage.root_folder {
            log::warn!(
                "Invalid root_folder '{}', using '{}'",
                self.storage.root_folder,
                root
            );
            self.storage.root_folder = root;
        }

        if !(5..=300).contains(&self.runtime.keep_alive_secs) {
            log::warn!(
                "Invalid keep_alive_secs {}, clamping to 5-300 range",
                self.runtime.keep_alive_secs
            );
            self.runtime.keep_alive_secs = self.runtime.keep_alive_secs.clamp(5, 300);
        }
    }

    /// Returns the path to the configuration file (`~/.config/clickshot/config.toml`).
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be determined (e.g., HOME not set).
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("clickshot");

        Ok(config_dir.join("config.toml"))
    }

    /// Loads configuration from the default location, or returns defaults if not found.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Loads configuration from `config_path`, or returns defaults if the file is missing.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or contains invalid TOML.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!("Config file not found, using defaults");
            debug!("Expected config at: {}", config_path.display());
            return Ok(Self::default());
        }

        let config_str = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

        config.validate_and_clamp();

        info!("Loaded config from {}", config_path.display());
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// JSON schema describing the config file, used by editor tooling.
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Config)
    }

    /// Directory downloads are written into.
    pub fn download_dir(&self) -> PathBuf {
        match &self.storage.download_dir {
            Some(dir) => expand_tilde(dir),
            None => dirs::download_dir()
                .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }

    /// File backing the metadata key-value store.
    pub fn store_path(&self) -> PathBuf {
        match &self.storage.store_path {
            Some(path) => expand_tilde(path),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("clickshot")
                .join("store.json"),
        }
    }

    /// Directory holding pointer icon images, if configured.
    pub fn icon_dir(&self) -> Option<PathBuf> {
        self.storage.icon_dir.as_deref().map(expand_tilde)
    }
}

/// Expand tilde (~) in path strings.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }
    PathBuf::from(path)
}

fn sanitize_folder_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "UX-Screenshots".to_string()
    } else {
        cleaned
    }
}
