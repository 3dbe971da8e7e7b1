//! Pointer icon lookup.

use super::CompositingError;
use crate::config::IconVariant;
use image::RgbaImage;
use std::path::PathBuf;

/// Supplies the bitmap for a pointer icon variant.
pub trait IconSource: Send + Sync {
    fn load(&self, variant: IconVariant) -> Result<RgbaImage, CompositingError>;
}

/// Loads `pointer-{variant}.png` from a directory.
#[derive(Debug, Clone)]
pub struct IconDirectory {
    dir: PathBuf,
}

impl IconDirectory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn icon_path(&self, variant: IconVariant) -> PathBuf {
        self.dir.join(format!("pointer-{}.png", variant.as_str()))
    }
}

impl IconSource for IconDirectory {
    fn load(&self, variant: IconVariant) -> Result<RgbaImage, CompositingError> {
        let path = self.icon_path(variant);
        let bytes = std::fs::read(&path)?;
        let icon = image::load_from_memory(&bytes)?.to_rgba8();
        log::debug!(
            "Loaded {} icon from {} ({}x{})",
            variant,
            path.display(),
            icon.width(),
            icon.height()
        );
        Ok(icon)
    }
}

/// Source with no bitmaps; every variant is drawn with the vector pointer.
#[derive(Debug, Default, Clone, Copy)]
pub struct VectorIcons;

impl IconSource for VectorIcons {
    fn load(&self, variant: IconVariant) -> Result<RgbaImage, CompositingError> {
        Err(CompositingError::IconUnavailable(variant))
    }
}
