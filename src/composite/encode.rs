//! Image decoding and encoding around the drawing surface.

use super::CompositingError;
use crate::config::ImageFormat;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use std::io::Cursor;

/// Decodes a captured bitmap (PNG or JPEG) at its natural size.
pub fn decode(raw: &[u8]) -> Result<RgbaImage, CompositingError> {
    let image = image::load_from_memory(raw)?.to_rgba8();
    if image.width() == 0 || image.height() == 0 {
        return Err(CompositingError::EmptyImage);
    }
    Ok(image)
}

/// Encodes `image` as `format`; `quality` (0..1) applies to JPEG only.
pub fn encode(image: RgbaImage, format: ImageFormat, quality: f64) -> Result<Vec<u8>, CompositingError> {
    let mut out = Cursor::new(Vec::new());
    match format {
        ImageFormat::Png => {
            image.write_to(&mut out, image::ImageFormat::Png)?;
        }
        ImageFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(image).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut out, jpeg_quality(quality));
            encoder.encode_image(&rgb)?;
        }
    }
    Ok(out.into_inner())
}

/// Detects the format of already-encoded bytes, if it is one we write.
pub fn sniff_format(bytes: &[u8]) -> Option<ImageFormat> {
    match image::guess_format(bytes).ok()? {
        image::ImageFormat::Png => Some(ImageFormat::Png),
        image::ImageFormat::Jpeg => Some(ImageFormat::Jpeg),
        _ => None,
    }
}

fn jpeg_quality(quality: f64) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RgbaImage {
        RgbaImage::from_pixel(8, 6, image::Rgba([200, 40, 40, 255]))
    }

    #[test]
    fn png_encoding_is_sniffed_back() {
        let bytes = encode(sample(), ImageFormat::Png, 0.85).unwrap();
        assert_eq!(&bytes[0..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
        assert_eq!(sniff_format(&bytes), Some(ImageFormat::Png));
        assert_eq!(decode(&bytes).unwrap().dimensions(), (8, 6));
    }

    #[test]
    fn jpeg_encoding_drops_alpha() {
        let bytes = encode(sample(), ImageFormat::Jpeg, 0.5).unwrap();
        assert_eq!(&bytes[0..2], &[0xFF, 0xD8]);
        assert_eq!(sniff_format(&bytes), Some(ImageFormat::Jpeg));
    }

    #[test]
    fn quality_maps_to_percent() {
        assert_eq!(jpeg_quality(0.85), 85);
        assert_eq!(jpeg_quality(0.0), 1);
        assert_eq!(jpeg_quality(7.0), 100);
    }

    #[test]
    fn garbage_does_not_decode() {
        assert!(decode(b"not an image").is_err());
        assert_eq!(sniff_format(b"not an image"), None);
    }
}
