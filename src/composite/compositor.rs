use std::path::PathBuf;
use std::sync::Arc;

use image::RgbaImage;

use super::backend::{CairoBackend, CompositionBackend, RenderInputs};
use super::encode::{decode, encode, sniff_format};
use super::icons::{IconDirectory, IconSource, VectorIcons};
use super::plan::{Composition, plan_composition};
use super::spec::OverlaySpec;
use super::CompositingError;
use crate::config::ImageFormat;
use crate::draw::FontPreloader;

/// Result of [`Compositor::composite`].
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    /// `false` when the overlay failed and `bytes` is the raw capture.
    pub composited: bool,
}

/// Stateless per call: every invocation decodes into its own surface. The
/// only shared state is the font preloader's soft cache.
pub struct Compositor {
    backend: Arc<dyn CompositionBackend>,
    icons: Arc<dyn IconSource>,
    fonts: FontPreloader,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(Arc::new(CairoBackend), Arc::new(VectorIcons))
    }
}

impl Compositor {
    pub fn new(backend: Arc<dyn CompositionBackend>, icons: Arc<dyn IconSource>) -> Self {
        Self {
            backend,
            icons,
            fonts: FontPreloader::new(),
        }
    }

    /// Cairo compositor loading icons from `icon_dir` when one is configured.
    pub fn with_icon_dir(icon_dir: Option<PathBuf>) -> Self {
        let icons: Arc<dyn IconSource> = match icon_dir {
            Some(dir) => Arc::new(IconDirectory::new(dir)),
            None => Arc::new(VectorIcons),
        };
        Self::new(Arc::new(CairoBackend), icons)
    }

    pub fn fonts(&self) -> &FontPreloader {
        &self.fonts
    }

    /// Overlays `spec` onto `raw` and encodes the result.
    ///
    /// Total: on any failure the raw capture is returned unchanged.
    pub fn composite(&self, raw: &[u8], spec: &OverlaySpec) -> EncodedImage {
        match self.try_composite(raw, spec) {
            Ok(bytes) => {
                log::debug!(
                    "Composited capture: {} bytes in, {} bytes out ({:?})",
                    raw.len(),
                    bytes.len(),
                    spec.format
                );
                EncodedImage {
                    bytes,
                    format: spec.format,
                    composited: true,
                }
            }
            Err(err) => {
                log::warn!("Compositing failed, keeping the raw capture: {}", err);
                EncodedImage {
                    bytes: raw.to_vec(),
                    format: sniff_format(raw).unwrap_or_default(),
                    composited: false,
                }
            }
        }
    }

    /// Layer plan for `spec` on a `width` x `height` capture, without drawing.
    pub fn plan(
        &self,
        spec: &OverlaySpec,
        width: u32,
        height: u32,
    ) -> Result<Composition, CompositingError> {
        let font = self.fonts.ensure_loaded(&spec.font);
        let measure = self
            .backend
            .text_measure(&font, spec.font_size * spec.device_pixel_ratio)?;
        Ok(plan_composition(spec, &font, width, height, measure.as_ref()))
    }

    fn try_composite(&self, raw: &[u8], spec: &OverlaySpec) -> Result<Vec<u8>, CompositingError> {
        let base = decode(raw)?;
        let composition = self.plan(spec, base.width(), base.height())?;
        let icon = self.load_icon(spec);

        let composed = self.backend.render(
            &composition,
            RenderInputs {
                base: &base,
                icon: icon.as_ref(),
            },
        )?;

        encode(composed, spec.format, spec.quality)
    }

    fn load_icon(&self, spec: &OverlaySpec) -> Option<RgbaImage> {
        let variant = spec.icon_variant?;
        match self.icons.load(variant) {
            Ok(icon) => Some(icon),
            Err(CompositingError::IconUnavailable(_)) => None,
            Err(err) => {
                log::warn!("Using vector pointer for {} icon: {}", variant, err);
                None
            }
        }
    }
}
