use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use image::{Rgba, RgbaImage};

use super::{
    CaptureDependencies, CaptureError, CaptureOrchestrator, CapturePolicy, CaptureRequest,
    CaptureStatus, PageInfo, VisibleAreaCapture,
};
use crate::clock::ManualClock;
use crate::composite::{Compositor, encode::encode};
use crate::config::{IconVariant, ImageFormat, Settings};
use crate::host::HostError;
use crate::storage::{
    DownloadHost, DownloadRequest, DownloadResult, MemoryStore, StorageEstimate,
    StorageEstimator, StorageLimits, StorageManager,
};

#[derive(Clone)]
struct MockSource {
    data: Vec<u8>,
    error: Arc<Mutex<Option<HostError>>>,
    calls: Arc<Mutex<usize>>,
}

impl MockSource {
    fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            error: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(0)),
        }
    }
}

#[async_trait]
impl VisibleAreaCapture for MockSource {
    async fn capture_visible(&self, _page: &PageInfo) -> Result<Vec<u8>, HostError> {
        *self.calls.lock().unwrap() += 1;
        if let Some(err) = self.error.lock().unwrap().take() {
            Err(err)
        } else {
            Ok(self.data.clone())
        }
    }
}

#[derive(Clone, Default)]
struct MockDownloads {
    should_fail: bool,
    calls: Arc<Mutex<usize>>,
    written: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

#[async_trait]
impl DownloadHost for MockDownloads {
    async fn download(&self, request: DownloadRequest) -> Result<DownloadResult, HostError> {
        let id = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls as u64
        };
        if self.should_fail {
            return Err(HostError::Other("download interrupted".to_string()));
        }
        self.written
            .lock()
            .unwrap()
            .push((request.relative_path.clone(), request.bytes.clone()));
        Ok(DownloadResult {
            download_id: id,
            path: PathBuf::from("/downloads").join(&request.relative_path),
        })
    }
}

struct NoQuota;

#[async_trait]
impl StorageEstimator for NoQuota {
    async fn estimate(&self) -> Result<StorageEstimate, HostError> {
        Ok(StorageEstimate { usage: 0, quota: 0 })
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 8, 20, 10, 30, 0).unwrap()
}

fn placeholder_png() -> Vec<u8> {
    encode(
        RgbaImage::from_pixel(200, 150, Rgba([240, 240, 240, 255])),
        ImageFormat::Png,
        1.0,
    )
    .unwrap()
}

struct Harness {
    orchestrator: CaptureOrchestrator,
    source: MockSource,
    downloads: MockDownloads,
    storage: Arc<StorageManager>,
    clock: Arc<ManualClock>,
}

fn harness(source: MockSource, downloads: MockDownloads) -> Harness {
    let clock = Arc::new(ManualClock::new(t0()));
    let storage = Arc::new(StorageManager::new(
        Arc::new(MemoryStore::new()),
        Arc::new(downloads.clone()),
        Arc::new(NoQuota),
        clock.clone(),
        StorageLimits::default(),
    ));
    let deps = CaptureDependencies {
        source: Arc::new(source.clone()),
        compositor: Arc::new(Compositor::default()),
        storage: storage.clone(),
        clock: clock.clone(),
    };
    Harness {
        orchestrator: CaptureOrchestrator::new(deps, CapturePolicy::default()),
        source,
        downloads,
        storage,
        clock,
    }
}

fn blue_click() -> CaptureRequest {
    CaptureRequest {
        icon_variant: Some(IconVariant::Blue),
        ..CaptureRequest::at(100.0, 100.0)
    }
}

#[tokio::test]
async fn end_to_end_capture_is_filed_by_host_and_date() {
    let h = harness(MockSource::new(placeholder_png()), MockDownloads::default());
    let page = PageInfo::new("https://example.com/page");

    let receipt = h
        .orchestrator
        .capture(&page, blue_click(), &Settings::default())
        .await
        .unwrap();

    assert_eq!(receipt.filename, "ux-screenshot_2023-08-20_10-30-00_example-com.png");
    assert!(receipt.composited);
    assert_eq!(h.orchestrator.last_status(), CaptureStatus::Done);

    let record = h
        .storage
        .get_screenshot_metadata(receipt.download_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.domain, "example.com");
    assert_eq!(h.storage.get_storage_stats().await.unwrap().total_screenshots, 1);

    let written = h.downloads.written.lock().unwrap();
    assert_eq!(
        written[0].0,
        "UX-Screenshots/2023/08-August/by-domain/example.com/ux-screenshot_2023-08-20_10-30-00_example-com.png"
    );
    assert_eq!(&written[0].1[0..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
}

#[tokio::test]
async fn second_capture_within_cooldown_is_rejected() {
    let h = harness(MockSource::new(placeholder_png()), MockDownloads::default());
    let page = PageInfo::new("https://example.com/page");
    let settings = Settings::default();

    h.orchestrator
        .capture(&page, blue_click(), &settings)
        .await
        .unwrap();
    h.clock.advance(chrono::Duration::milliseconds(200));
    let second = h.orchestrator.capture(&page, blue_click(), &settings).await;

    match second {
        Err(err @ CaptureError::RateLimited { .. }) => {
            assert!(err.to_string().contains("wait a moment"));
        }
        other => panic!("expected rate limit, got {other:?}"),
    }
    assert_eq!(*h.source.calls.lock().unwrap(), 1);
    assert_eq!(*h.downloads.calls.lock().unwrap(), 1);
    assert_eq!(h.storage.get_storage_stats().await.unwrap().total_screenshots, 1);

    h.clock.advance(chrono::Duration::milliseconds(800));
    assert!(h.orchestrator.capture(&page, blue_click(), &settings).await.is_ok());
}

#[tokio::test]
async fn restricted_page_fails_before_capture() {
    let h = harness(MockSource::new(placeholder_png()), MockDownloads::default());
    let result = h
        .orchestrator
        .capture(&PageInfo::new("chrome://settings"), blue_click(), &Settings::default())
        .await;

    match result {
        Err(CaptureError::Validation(message)) => assert!(message.contains("chrome://settings")),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(*h.source.calls.lock().unwrap(), 0);
    assert_eq!(h.orchestrator.rate_limiter().last_capture_at(), None);
    assert!(matches!(h.orchestrator.last_status(), CaptureStatus::Failed(_)));
}

#[tokio::test]
async fn failed_capture_still_consumes_the_cooldown() {
    let source = MockSource::new(placeholder_png());
    *source.error.lock().unwrap() = Some(HostError::PortalUnavailable);
    let h = harness(source, MockDownloads::default());
    let page = PageInfo::new("https://example.com");

    let first = h
        .orchestrator
        .capture(&page, blue_click(), &Settings::default())
        .await;
    match &first {
        Err(err @ CaptureError::Capture(_)) => {
            assert!(err.to_string().contains("try again"));
            assert!(err.detail().unwrap().contains("portal"));
        }
        other => panic!("expected capture error, got {other:?}"),
    }
    assert_eq!(h.orchestrator.rate_limiter().last_capture_at(), Some(t0()));
    assert_eq!(*h.downloads.calls.lock().unwrap(), 0);

    let retry = h
        .orchestrator
        .capture(&page, blue_click(), &Settings::default())
        .await;
    assert!(matches!(retry, Err(CaptureError::RateLimited { .. })));
}

#[tokio::test]
async fn undecodable_capture_is_saved_raw() {
    let raw = b"opaque host bitmap".to_vec();
    let h = harness(MockSource::new(raw.clone()), MockDownloads::default());

    let receipt = h
        .orchestrator
        .capture(
            &PageInfo::new("https://example.com"),
            blue_click(),
            &Settings::default(),
        )
        .await
        .unwrap();

    assert!(!receipt.composited);
    assert_eq!(h.downloads.written.lock().unwrap()[0].1, raw);
}

#[tokio::test]
async fn persist_failure_is_reported() {
    let h = harness(
        MockSource::new(placeholder_png()),
        MockDownloads {
            should_fail: true,
            ..Default::default()
        },
    );
    let result = h
        .orchestrator
        .capture(
            &PageInfo::new("https://example.com"),
            blue_click(),
            &Settings::default(),
        )
        .await;

    assert!(matches!(result, Err(CaptureError::Persist(_))));
    assert_eq!(h.storage.get_storage_stats().await.unwrap().total_screenshots, 0);
}

#[tokio::test]
async fn annotated_jpeg_capture() {
    let h = harness(MockSource::new(placeholder_png()), MockDownloads::default());
    let settings = Settings {
        image_format: ImageFormat::Jpeg,
        ..Settings::default()
    };
    let request = CaptureRequest {
        annotation_text: Some("Misaligned icon".into()),
        transcription_text: Some("the icon is off".into()),
        ..blue_click()
    };

    let receipt = h
        .orchestrator
        .capture(&PageInfo::new("https://shop.example.com:8443/cart"), request, &settings)
        .await
        .unwrap();
    assert_eq!(
        receipt.filename,
        "ux-screenshot_2023-08-20_10-30-00_shop-example-com-8443_annotated.jpeg"
    );

    let record = h
        .storage
        .get_screenshot_metadata(receipt.download_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.annotation_text.as_deref(), Some("Misaligned icon"));
    assert_eq!(record.transcription_text.as_deref(), Some("the icon is off"));
}

#[tokio::test]
async fn reset_reopens_the_window() {
    let h = harness(MockSource::new(placeholder_png()), MockDownloads::default());
    let page = PageInfo::new("https://example.com");
    h.orchestrator
        .capture(&page, blue_click(), &Settings::default())
        .await
        .unwrap();
    h.orchestrator.reset();
    assert_eq!(h.orchestrator.last_status(), CaptureStatus::Idle);
    assert!(h
        .orchestrator
        .capture(&page, blue_click(), &Settings::default())
        .await
        .is_ok());
}
