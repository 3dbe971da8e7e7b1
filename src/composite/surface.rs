//! Conversions between straight-alpha RGBA buffers and Cairo image surfaces.
//!
//! Cairo's `ARgb32` stores premultiplied pixels as native-endian `u32`s.

use super::CompositingError;
use cairo::{Format, ImageSurface};
use image::RgbaImage;

/// Copies `image` into a new premultiplied Cairo surface.
pub fn surface_from_rgba(image: &RgbaImage) -> Result<ImageSurface, CompositingError> {
    let (width, height) = image.dimensions();
    let mut surface = ImageSurface::create(Format::ARgb32, width as i32, height as i32)?;
    let stride = surface.stride() as usize;

    {
        let mut data = surface
            .data()
            .map_err(|e| CompositingError::SurfaceAccess(e.to_string()))?;

        for (y, row) in image.rows().enumerate() {
            let row_offset = y * stride;
            for (x, pixel) in row.enumerate() {
                let [r, g, b, a] = pixel.0;
                let value = (u32::from(a) << 24)
                    | (u32::from(premultiply(r, a)) << 16)
                    | (u32::from(premultiply(g, a)) << 8)
                    | u32::from(premultiply(b, a));
                let offset = row_offset + x * 4;
                data[offset..offset + 4].copy_from_slice(&value.to_ne_bytes());
            }
        }
    }

    Ok(surface)
}

/// Reads a Cairo surface back into a straight-alpha RGBA buffer.
///
/// The surface must not be referenced by a live `cairo::Context`.
pub fn rgba_from_surface(surface: &mut ImageSurface) -> Result<RgbaImage, CompositingError> {
    surface.flush();
    let width = surface.width().max(0) as u32;
    let height = surface.height().max(0) as u32;
    let stride = surface.stride() as usize;

    let data = surface
        .data()
        .map_err(|e| CompositingError::SurfaceAccess(e.to_string()))?;

    let mut image = RgbaImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let offset = y as usize * stride + x as usize * 4;
        let value = u32::from_ne_bytes([
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ]);
        let a = (value >> 24) as u8;
        let r = unpremultiply((value >> 16) as u8, a);
        let g = unpremultiply((value >> 8) as u8, a);
        let b = unpremultiply(value as u8, a);
        *pixel = image::Rgba([r, g, b, a]);
    }

    Ok(image)
}

fn premultiply(channel: u8, alpha: u8) -> u8 {
    ((u16::from(channel) * u16::from(alpha) + 127) / 255) as u8
}

fn unpremultiply(channel: u8, alpha: u8) -> u8 {
    if alpha == 0 {
        0
    } else {
        ((u32::from(channel) * 255 + u32::from(alpha) / 2) / u32::from(alpha)).min(255) as u8
    }
}
