//! Rendering primitives (Cairo-based).
//!
//! - [`Color`]: RGBA color representation with predefined color constants
//! - [`FontDescriptor`] / [`FontPreloader`]: annotation font selection
//! - Rendering functions for markers, pointer icons and text boxes

pub mod color;
pub mod font;
pub mod render;

pub use color::Color;
pub use font::{FontDescriptor, FontPreloader};
pub use render::{render_fallback_pointer, render_icon_surface, render_marker, render_text_box};
