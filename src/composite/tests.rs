use std::sync::{Arc, Mutex};

use image::{Rgba, RgbaImage};

use super::{
    CairoBackend, CompositingError, Composition, CompositionBackend, Compositor, IconSource,
    Layer, OverlaySpec, RenderInputs, TextMeasure, VectorIcons,
    encode::{decode, encode},
    layout::tests::FixedAdvance,
    spec::{Coordinates, MarkerSpec},
};
use crate::config::{IconVariant, ImageFormat, MarkerStyle, Settings};
use crate::draw::{FontDescriptor, color::RED};

struct FailingBackend;

impl CompositionBackend for FailingBackend {
    fn text_measure(
        &self,
        _font: &FontDescriptor,
        _size: f64,
    ) -> Result<Box<dyn TextMeasure>, CompositingError> {
        Err(CompositingError::Backend("no fonts".to_string()))
    }

    fn render(
        &self,
        _composition: &Composition,
        _inputs: RenderInputs<'_>,
    ) -> Result<RgbaImage, CompositingError> {
        Err(CompositingError::Backend("no surface".to_string()))
    }
}

/// Measures with a fixed advance and records the plans it renders.
#[derive(Clone, Default)]
struct RecordingBackend {
    rendered: Arc<Mutex<Vec<Composition>>>,
    icon_seen: Arc<Mutex<Vec<bool>>>,
}

impl CompositionBackend for RecordingBackend {
    fn text_measure(
        &self,
        _font: &FontDescriptor,
        _size: f64,
    ) -> Result<Box<dyn TextMeasure>, CompositingError> {
        Ok(Box::new(FixedAdvance {
            advance: 7.0,
            line_height: 15.0,
        }))
    }

    fn render(
        &self,
        composition: &Composition,
        inputs: RenderInputs<'_>,
    ) -> Result<RgbaImage, CompositingError> {
        self.rendered.lock().unwrap().push(composition.clone());
        self.icon_seen.lock().unwrap().push(inputs.icon.is_some());
        Ok(inputs.base.clone())
    }
}

#[derive(Clone, Default)]
struct CountingIcons {
    calls: Arc<Mutex<usize>>,
    fail: bool,
}

impl IconSource for CountingIcons {
    fn load(&self, _variant: IconVariant) -> Result<RgbaImage, CompositingError> {
        *self.calls.lock().unwrap() += 1;
        if self.fail {
            Err(CompositingError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "missing icon",
            )))
        } else {
            Ok(RgbaImage::from_pixel(24, 24, Rgba([26, 115, 232, 255])))
        }
    }
}

fn white_png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    encode(image, ImageFormat::Png, 1.0).unwrap()
}

fn overlay(x: f64, y: f64) -> OverlaySpec {
    OverlaySpec {
        coordinates: Coordinates::new(x, y),
        device_pixel_ratio: 1.0,
        marker: Some(MarkerSpec {
            color: RED,
            opacity: 1.0,
            size: 24.0,
            style: MarkerStyle::Solid,
        }),
        icon_variant: Some(IconVariant::Blue),
        annotation_text: None,
        transcription_text: None,
        format: ImageFormat::Png,
        quality: 0.85,
        font: FontDescriptor::default(),
        font_size: 14.0,
        max_text_width: 300.0,
    }
}

#[test]
fn failing_backend_returns_raw_bytes_unchanged() {
    let raw = white_png(40, 30);
    let compositor = Compositor::new(Arc::new(FailingBackend), Arc::new(VectorIcons));

    let result = compositor.composite(&raw, &overlay(10.0, 10.0));
    assert_eq!(result.bytes, raw);
    assert_eq!(result.format, ImageFormat::Png);
    assert!(!result.composited);
    assert!(decode(&result.bytes).is_ok());
}

#[test]
fn undecodable_capture_is_passed_through() {
    let compositor = Compositor::new(Arc::new(RecordingBackend::default()), Arc::new(VectorIcons));
    let result = compositor.composite(b"garbage", &overlay(1.0, 1.0));
    assert_eq!(result.bytes, b"garbage".to_vec());
    assert!(!result.composited);
}

#[test]
fn raw_jpeg_fallback_reports_jpeg() {
    let raw = encode(
        RgbaImage::from_pixel(16, 16, Rgba([10, 10, 10, 255])),
        ImageFormat::Jpeg,
        0.9,
    )
    .unwrap();
    let compositor = Compositor::new(Arc::new(FailingBackend), Arc::new(VectorIcons));
    let result = compositor.composite(&raw, &overlay(4.0, 4.0));
    assert_eq!(result.format, ImageFormat::Jpeg);
    assert_eq!(result.bytes, raw);
}

#[test]
fn icon_failure_falls_back_to_vector_pointer() {
    let backend = RecordingBackend::default();
    let icons = CountingIcons {
        fail: true,
        ..Default::default()
    };
    let compositor = Compositor::new(Arc::new(backend.clone()), Arc::new(icons.clone()));

    let result = compositor.composite(&white_png(200, 100), &overlay(50.0, 50.0));
    assert!(result.composited);
    assert_eq!(*icons.calls.lock().unwrap(), 1);
    assert_eq!(*backend.icon_seen.lock().unwrap(), vec![false]);
}

#[test]
fn loaded_icon_reaches_the_backend() {
    let backend = RecordingBackend::default();
    let icons = CountingIcons::default();
    let compositor = Compositor::new(Arc::new(backend.clone()), Arc::new(icons));

    compositor.composite(&white_png(200, 100), &overlay(50.0, 50.0));
    assert_eq!(*backend.icon_seen.lock().unwrap(), vec![true]);
}

#[test]
fn plan_is_sized_to_the_capture() {
    let backend = RecordingBackend::default();
    let compositor = Compositor::new(Arc::new(backend.clone()), Arc::new(VectorIcons));

    let mut spec = overlay(150.0, 40.0);
    spec.annotation_text = Some("Checkout button overlaps the footer".into());
    compositor.composite(&white_png(320, 80), &spec);

    let rendered = backend.rendered.lock().unwrap();
    let composition = &rendered[0];
    assert_eq!((composition.width, composition.height), (320, 80));
    match composition.text_box() {
        Some(Layer::TextBox { rect, .. }) => assert!(rect.fits_within(320.0, 80.0)),
        other => panic!("expected text box, got {other:?}"),
    }
}

#[test]
fn cairo_backend_draws_marker_over_base() {
    let compositor = Compositor::default();
    let mut spec = overlay(20.0, 20.0);
    spec.icon_variant = None;

    let result = compositor.composite(&white_png(40, 40), &spec);
    assert!(result.composited);

    let image = decode(&result.bytes).unwrap();
    assert_eq!(image.dimensions(), (40, 40));
    let center = image.get_pixel(20, 20).0;
    assert!(center[0] > 200 && center[1] < 60, "marker not drawn: {center:?}");
    assert_eq!(image.get_pixel(0, 0).0, [255, 255, 255, 255]);
}

#[test]
fn cairo_backend_renders_text_and_jpeg() {
    let compositor = Compositor::default();
    let settings = Settings::from_config(&crate::config::Config::default());
    let mut spec = OverlaySpec::from_settings(
        &settings,
        Coordinates::new(60.0, 60.0),
        Some(IconVariant::Dark),
        Some("Label is cut off".into()),
        Some("this should wrap onto a second line".into()),
        Some(1.0),
    );
    spec.format = ImageFormat::Jpeg;

    let result = compositor.composite(&white_png(400, 200), &spec);
    assert!(result.composited);
    assert_eq!(result.format, ImageFormat::Jpeg);
    assert_eq!(&result.bytes[0..2], &[0xFF, 0xD8]);
    assert_eq!(decode(&result.bytes).unwrap().dimensions(), (400, 200));
}

#[test]
fn cairo_backend_renders_plan_directly() {
    let base = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 255, 255]));
    let composition = Composition {
        width: 10,
        height: 10,
        layers: vec![Layer::Base {
            width: 10,
            height: 10,
        }],
    };
    let rendered = CairoBackend
        .render(
            &composition,
            RenderInputs {
                base: &base,
                icon: None,
            },
        )
        .unwrap();
    assert_eq!(rendered.get_pixel(5, 5).0, [0, 0, 255, 255]);
}
