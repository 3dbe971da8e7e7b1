//! Font descriptor for annotation text, and the preloader that makes sure the
//! requested family is available before text is drawn.

use pango::prelude::*;
use std::sync::Mutex;

/// Fallback family used when the configured one cannot be resolved.
pub const FALLBACK_FAMILY: &str = "Sans";

/// Font configuration for text rendering.
///
/// Describes which font to use, including family name, weight, and style.
#[derive(Debug, Clone, PartialEq)]
pub struct FontDescriptor {
    /// Font family name (e.g., "Sans", "Inter", "JetBrains Mono")
    pub family: String,

    /// Font weight (e.g., "normal", "bold", "light" or numeric 100-900)
    pub weight: String,

    /// Font style (e.g., "normal", "italic", "oblique")
    pub style: String,
}

impl FontDescriptor {
    pub fn new(family: String, weight: String, style: String) -> Self {
        Self {
            family,
            weight,
            style,
        }
    }

    /// Same descriptor with another family.
    pub fn with_family(&self, family: &str) -> Self {
        Self {
            family: family.to_string(),
            ..self.clone()
        }
    }

    /// Converts this font descriptor to a Pango font description string.
    ///
    /// Format: "Family Style Weight Size", e.g. "Sans Bold 14".
    pub fn to_pango_string(&self, size: f64) -> String {
        let mut parts = vec![self.family.clone()];

        if self.style.to_lowercase() != "normal" {
            parts.push(capitalize_first(&self.style));
        }

        if self.weight.to_lowercase() != "normal" {
            parts.push(capitalize_first(&self.weight));
        }

        parts.push(format!("{}", size.round() as i32));

        parts.join(" ")
    }
}

impl Default for FontDescriptor {
    fn default() -> Self {
        Self {
            family: FALLBACK_FAMILY.to_string(),
            weight: "normal".to_string(),
            style: "normal".to_string(),
        }
    }
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

/// Resolves the annotation font once and remembers the result.
///
/// The cached flag is soft state: it only lives as long as the controller
/// process, and [`FontPreloader::reset`] clears it for tests.
#[derive(Debug, Default)]
pub struct FontPreloader {
    loaded_family: Mutex<Option<String>>,
}

impl FontPreloader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures `font` can be used for drawing and returns the descriptor to
    /// draw with. Lookup failures are logged and fall back to [`FALLBACK_FAMILY`].
    pub fn ensure_loaded(&self, font: &FontDescriptor) -> FontDescriptor {
        let mut loaded = self
            .loaded_family
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if loaded.as_deref() == Some(font.family.as_str()) {
            return font.clone();
        }

        if family_available(&font.family) {
            log::debug!("Font family '{}' available for annotations", font.family);
            *loaded = Some(font.family.clone());
            font.clone()
        } else {
            log::warn!(
                "Font family '{}' not found, falling back to '{}'",
                font.family,
                FALLBACK_FAMILY
            );
            font.with_family(FALLBACK_FAMILY)
        }
    }

    /// Returns `true` once a family has been resolved successfully.
    pub fn is_loaded(&self) -> bool {
        self.loaded_family
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    pub fn reset(&self) {
        let mut loaded = self
            .loaded_family
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *loaded = None;
    }
}

fn family_available(family: &str) -> bool {
    let font_map = pangocairo::FontMap::default();
    font_map
        .list_families()
        .iter()
        .any(|candidate| candidate.name().eq_ignore_ascii_case(family))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pango_string_default() {
        let font = FontDescriptor::default();
        assert_eq!(font.to_pango_string(14.0), "Sans 14");
    }

    #[test]
    fn test_pango_string_bold_italic() {
        let font = FontDescriptor::new(
            "Monospace".to_string(),
            "bold".to_string(),
            "italic".to_string(),
        );
        assert_eq!(font.to_pango_string(24.0), "Monospace Italic Bold 24");
    }

    #[test]
    fn missing_family_falls_back_without_caching() {
        let preloader = FontPreloader::new();
        let font = FontDescriptor::default().with_family("Definitely Not A Real Font 9000");
        let resolved = preloader.ensure_loaded(&font);
        assert_eq!(resolved.family, FALLBACK_FAMILY);
        assert!(!preloader.is_loaded());
    }

    #[test]
    fn reset_clears_loaded_flag() {
        let preloader = FontPreloader::new();
        *preloader.loaded_family.lock().unwrap() = Some("Sans".to_string());
        assert!(preloader.is_loaded());
        preloader.reset();
        assert!(!preloader.is_loaded());
    }
}
