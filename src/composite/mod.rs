//! Overlay compositing for captured bitmaps.
//!
//! A capture is decoded, described as an ordered list of layers by
//! [`plan_composition`], rendered in one pass by a [`CompositionBackend`], and
//! re-encoded. [`Compositor::composite`] never fails: any error along the way
//! yields the original capture bytes.

pub mod backend;
pub mod encode;
pub mod icons;
pub mod layout;
pub mod plan;
pub mod spec;
pub mod surface;

mod compositor;
#[cfg(test)]
mod tests;

pub use backend::{CairoBackend, CompositionBackend, PangoMeasure, RenderInputs};
pub use compositor::{Compositor, EncodedImage};
pub use icons::{IconDirectory, IconSource, VectorIcons};
pub use layout::{Placement, TextMeasure, wrap_text};
pub use plan::{Composition, Layer, plan_composition};
pub use spec::{Coordinates, MarkerSpec, OverlaySpec};

use crate::config::IconVariant;
use thiserror::Error;

/// Failures inside the compositing engine. These are logged and absorbed by
/// [`Compositor::composite`]; they never reach a caller of the pipeline.
#[derive(Debug, Error)]
pub enum CompositingError {
    #[error("Failed to decode or encode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Cairo error: {0}")]
    Cairo(#[from] cairo::Error),

    #[error("Cannot access surface pixels: {0}")]
    SurfaceAccess(String),

    #[error("Captured image has no pixels")]
    EmptyImage,

    #[error("No bitmap for the {0} pointer icon")]
    IconUnavailable(IconVariant),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Rendering backend failed: {0}")]
    Backend(String),
}
