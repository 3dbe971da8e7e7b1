//! Rendering backends for a planned [`Composition`].

use super::CompositingError;
use super::layout::TextMeasure;
use super::plan::{Composition, Layer};
use super::surface::{rgba_from_surface, surface_from_rgba};
use crate::draw::{self, FontDescriptor};
use cairo::{Context, Format, ImageSurface};
use image::RgbaImage;

/// Pixels available to the backend while rendering.
pub struct RenderInputs<'a> {
    pub base: &'a RgbaImage,
    /// Decoded pointer icon; `None` means draw the vector fallback.
    pub icon: Option<&'a RgbaImage>,
}

/// Renders a composition in one pass on a fresh surface.
pub trait CompositionBackend: Send + Sync {
    /// Text metrics for `font` at `size` (already scaled to image pixels).
    fn text_measure(
        &self,
        font: &FontDescriptor,
        size: f64,
    ) -> Result<Box<dyn TextMeasure>, CompositingError>;

    fn render(
        &self,
        composition: &Composition,
        inputs: RenderInputs<'_>,
    ) -> Result<RgbaImage, CompositingError>;
}

/// Cairo + Pango backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct CairoBackend;

impl CompositionBackend for CairoBackend {
    fn text_measure(
        &self,
        font: &FontDescriptor,
        size: f64,
    ) -> Result<Box<dyn TextMeasure>, CompositingError> {
        Ok(Box::new(PangoMeasure::new(font, size)?))
    }

    fn render(
        &self,
        composition: &Composition,
        inputs: RenderInputs<'_>,
    ) -> Result<RgbaImage, CompositingError> {
        let mut target = ImageSurface::create(
            Format::ARgb32,
            composition.width as i32,
            composition.height as i32,
        )?;

        {
            let ctx = Context::new(&target)?;
            for layer in &composition.layers {
                render_layer(&ctx, layer, &inputs)?;
            }
        }

        rgba_from_surface(&mut target)
    }
}

fn render_layer(
    ctx: &Context,
    layer: &Layer,
    inputs: &RenderInputs<'_>,
) -> Result<(), CompositingError> {
    match layer {
        Layer::Base { .. } => {
            let base = surface_from_rgba(inputs.base)?;
            ctx.set_source_surface(&base, 0.0, 0.0)?;
            ctx.paint()?;
        }
        Layer::Marker {
            center_x,
            center_y,
            radius,
            color,
            style,
            line_width,
        } => {
            draw::render_marker(ctx, *center_x, *center_y, *radius, *color, *style, *line_width)?;
        }
        Layer::Icon {
            variant,
            x,
            y,
            size,
        } => match inputs.icon {
            Some(icon) => {
                let surface = surface_from_rgba(icon)?;
                draw::render_icon_surface(ctx, &surface, *x, *y, *size)?;
            }
            None => draw::render_fallback_pointer(ctx, *x, *y, *size, *variant)?,
        },
        Layer::TextBox {
            rect,
            lines,
            font,
            font_size,
            line_height,
            padding,
            corner_radius,
            background,
            text_color,
        } => {
            draw::render_text_box(
                ctx,
                rect,
                lines,
                font,
                *font_size,
                *line_height,
                *padding,
                *corner_radius,
                *background,
                *text_color,
            )?;
        }
    }
    Ok(())
}

/// Measures text with a Pango layout bound to a scratch surface.
pub struct PangoMeasure {
    layout: pango::Layout,
    line_height: f64,
}

impl PangoMeasure {
    pub fn new(font: &FontDescriptor, size: f64) -> Result<Self, CompositingError> {
        let scratch = ImageSurface::create(Format::ARgb32, 1, 1)?;
        let ctx = Context::new(&scratch)?;
        let layout = pangocairo::functions::create_layout(&ctx);
        let font_desc = pango::FontDescription::from_string(&font.to_pango_string(size));
        layout.set_font_description(Some(&font_desc));

        layout.set_text("Ag");
        let (_, logical) = layout.pixel_extents();
        let line_height = f64::from(logical.height()).max(1.0);

        Ok(Self {
            layout,
            line_height,
        })
    }
}

impl TextMeasure for PangoMeasure {
    fn text_width(&self, text: &str) -> f64 {
        self.layout.set_text(text);
        let (_, logical) = self.layout.pixel_extents();
        f64::from(logical.width())
    }

    fn line_height(&self) -> f64 {
        self.line_height
    }
}
