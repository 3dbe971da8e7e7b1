use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use image::{Rgba, RgbaImage};
use serde_json::{Value, json};

use super::*;
use crate::capture::VisibleAreaCapture;
use crate::clock::ManualClock;
use crate::composite::encode::encode;
use crate::config::ImageFormat;
use crate::host::HostError;
use crate::router::{ErrorCategory, RouterService};
use crate::storage::{
    DownloadHost, DownloadRequest, DownloadResult, KeyValueStore, MemoryStore, StorageEstimate,
    StorageEstimator,
};

struct StaticCapture(Vec<u8>);

#[async_trait]
impl VisibleAreaCapture for StaticCapture {
    async fn capture_visible(&self, _page: &PageInfo) -> Result<Vec<u8>, HostError> {
        Ok(self.0.clone())
    }
}

#[derive(Default)]
struct CountingDownloads {
    calls: Mutex<u64>,
}

#[async_trait]
impl DownloadHost for CountingDownloads {
    async fn download(&self, request: DownloadRequest) -> Result<DownloadResult, HostError> {
        let mut calls = self.calls.lock().unwrap();
        *calls += 1;
        Ok(DownloadResult {
            download_id: *calls,
            path: PathBuf::from("/downloads").join(request.relative_path),
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

#[derive(Default)]
struct RecordingObserver {
    activations: Mutex<Vec<Option<ActivatePayload>>>,
    notifications: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl ObserverHost for RecordingObserver {
    async fn set_active(&self, activation: Option<ActivatePayload>) -> Result<(), HostError> {
        self.activations.lock().unwrap().push(activation);
        Ok(())
    }

    async fn notify(&self, summary: &str, body: &str) -> Result<(), HostError> {
        self.notifications
            .lock()
            .unwrap()
            .push((summary.to_string(), body.to_string()));
        Ok(())
    }
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 8, 20, 10, 30, 0).unwrap()
}

fn png() -> Vec<u8> {
    encode(
        RgbaImage::from_pixel(160, 120, Rgba([250, 250, 250, 255])),
        ImageFormat::Png,
        1.0,
    )
    .unwrap()
}

struct Fixture {
    controller: Arc<Controller>,
    router: Arc<MessageRouter>,
    store: Arc<MemoryStore>,
    observer: Arc<RecordingObserver>,
    clock: Arc<ManualClock>,
}

fn host(
    store: Arc<MemoryStore>,
    observer: Arc<RecordingObserver>,
    clock: Arc<ManualClock>,
    pages: Arc<dyn PageQuery>,
) -> HostDependencies {
    HostDependencies {
        capture: Arc::new(StaticCapture(png())),
        downloads: Arc::new(CountingDownloads::default()),
        store,
        estimator: Arc::new(NoQuota),
        pages,
        observer,
        clock,
    }
}

async fn fixture_with(pages: Arc<dyn PageQuery>, store: Arc<MemoryStore>) -> Fixture {
    let observer = Arc::new(RecordingObserver::default());
    let clock = Arc::new(ManualClock::new(t0()));
    let controller = Controller::start(
        &Config::default(),
        host(store.clone(), observer.clone(), clock.clone(), pages),
    )
    .await
    .unwrap();
    let router = Arc::new(MessageRouter::new());
    controller.register(&router);
    Fixture {
        controller,
        router,
        store,
        observer,
        clock,
    }
}

async fn fixture() -> Fixture {
    fixture_with(Arc::new(NoActivePage), Arc::new(MemoryStore::new())).await
}

fn capture_line(url: &str) -> String {
    json!({
        "type": "CAPTURE_SCREENSHOT",
        "timestamp": 1692527400000i64,
        "payload": {"coordinates": {"x": 100, "y": 100}, "iconVariant": "blue"},
        "sender": {"tabId": 7, "url": url}
    })
    .to_string()
}

#[tokio::test]
async fn every_kind_has_a_handler() {
    let f = fixture().await;
    for kind in MessageKind::ALL {
        assert!(f.router.has_handler(*kind), "{kind} unhandled");
    }
}

#[tokio::test]
async fn capture_from_observer_is_saved_and_announced() {
    let f = fixture().await;

    let response = f
        .router
        .dispatch_json(&capture_line("https://example.com/page"))
        .await;
    assert!(response.success, "{response:?}");
    let data = response.data.unwrap();
    assert_eq!(
        data["filename"],
        "ux-screenshot_2023-08-20_10-30-00_example-com.png"
    );
    assert_eq!(data["composited"], true);

    let stats = f
        .router
        .dispatch(MessageEnvelope::new(Message::GetStorageStats))
        .await;
    assert_eq!(stats.data.unwrap()["totalScreenshots"], 1);

    let notifications = f.observer.notifications.lock().unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].0, "Screenshot saved");
}

#[tokio::test]
async fn capture_without_sender_asks_for_the_active_page() {
    let f = fixture_with(
        Arc::new(FixedPage(PageInfo::new("https://docs.example.org/"))),
        Arc::new(MemoryStore::new()),
    )
    .await;

    let response = f
        .router
        .dispatch(MessageEnvelope::new(Message::CaptureScreenshot(
            crate::capture::CaptureRequest::at(10.0, 10.0),
        )))
        .await;
    assert!(response.success, "{response:?}");
    assert!(
        response.data.unwrap()["filename"]
            .as_str()
            .unwrap()
            .contains("docs-example-org")
    );
}

#[tokio::test]
async fn capture_without_any_page_fails_as_capture_error() {
    let f = fixture().await;
    let response = f
        .router
        .dispatch(MessageEnvelope::new(Message::CaptureScreenshot(
            crate::capture::CaptureRequest::at(10.0, 10.0),
        )))
        .await;
    assert!(!response.success);
    assert_eq!(response.error_category, Some(ErrorCategory::Capture));
}

#[tokio::test]
async fn rejected_captures_carry_their_category() {
    let f = fixture().await;

    let restricted = f.router.dispatch_json(&capture_line("chrome://settings")).await;
    assert_eq!(restricted.error_category, Some(ErrorCategory::Validation));

    assert!(
        f.router
            .dispatch_json(&capture_line("https://example.com/"))
            .await
            .success
    );
    f.clock.advance(chrono::Duration::milliseconds(200));
    let limited = f
        .router
        .dispatch_json(&capture_line("https://example.com/"))
        .await;
    assert_eq!(limited.error_category, Some(ErrorCategory::RateLimited));
    assert_eq!(
        limited.error.as_deref(),
        Some("Please wait a moment before taking another screenshot")
    );

    // Only the saved capture is announced.
    assert_eq!(f.observer.notifications.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn settings_updates_are_clamped_and_persisted() {
    let store = Arc::new(MemoryStore::new());
    let f = fixture_with(Arc::new(NoActivePage), store.clone()).await;

    let response = f
        .router
        .dispatch_json(
            &json!({
                "type": "UPDATE_SETTINGS",
                "payload": {"markerOpacity": 3.0, "imageFormat": "jpeg", "notifications": false}
            })
            .to_string(),
        )
        .await;
    assert!(response.success, "{response:?}");
    let data = response.data.unwrap();
    assert_eq!(data["markerOpacity"], 1.0);
    assert_eq!(data["imageFormat"], "jpeg");

    let stored = f.store.get(Settings::STORE_KEY).await.unwrap().unwrap();
    assert_eq!(stored["imageFormat"], "jpeg");

    // A fresh controller over the same store sees the update.
    let again = fixture_with(Arc::new(NoActivePage), store).await;
    let settings = again.controller.settings().await;
    assert_eq!(settings.image_format, ImageFormat::Jpeg);
    assert!(!settings.notifications);
}

#[tokio::test]
async fn disabled_notifications_stay_quiet() {
    let f = fixture().await;
    f.controller
        .handle(MessageEnvelope::new(Message::UpdateSettings(
            crate::config::SettingsPatch {
                notifications: Some(false),
                ..Default::default()
            },
        )))
        .await
        .unwrap();

    let response = f
        .router
        .dispatch_json(&capture_line("https://example.com/"))
        .await;
    assert!(response.success);
    assert!(f.observer.notifications.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_stored_settings_fall_back_to_defaults() {
    let store = Arc::new(MemoryStore::new());
    let mut batch = WriteBatch::new();
    batch
        .set(Settings::STORE_KEY, &json!({"markerOpacity": "loud"}))
        .unwrap();
    store.commit(batch).await.unwrap();

    let f = fixture_with(Arc::new(NoActivePage), store).await;
    assert_eq!(f.controller.settings().await, Settings::default());
}

#[tokio::test]
async fn activation_reaches_the_observer() {
    let f = fixture().await;

    let response = f
        .router
        .dispatch_json(
            &json!({
                "type": "ACTIVATE_EXTENSION",
                "payload": {"mode": "annotation", "iconVariant": "dark"}
            })
            .to_string(),
        )
        .await;
    assert_eq!(
        response.data,
        Some(json!({"active": true, "mode": "annotation"}))
    );
    assert!(f.controller.activation().is_some());

    let response = f
        .router
        .dispatch(MessageEnvelope::new(Message::DeactivateExtension))
        .await;
    assert_eq!(response.data, Some(json!({"active": false})));

    let activations = f.observer.activations.lock().unwrap();
    assert_eq!(activations.len(), 2);
    assert!(activations[1].is_none());
}

#[tokio::test]
async fn unknown_metadata_is_not_found() {
    let f = fixture().await;
    let response = f
        .router
        .dispatch(MessageEnvelope::new(Message::GetScreenshotMetadata {
            download_id: 42,
        }))
        .await;
    assert_eq!(response.error_category, Some(ErrorCategory::NotFound));
}

#[tokio::test]
async fn export_then_import_into_a_fresh_store() {
    let f = fixture().await;
    assert!(
        f.router
            .dispatch_json(&capture_line("https://example.com/"))
            .await
            .success
    );

    let exported = f
        .router
        .dispatch(MessageEnvelope::new(Message::ExportData))
        .await
        .data
        .unwrap();
    assert_eq!(exported["version"], 1);

    let target = fixture().await;
    let response = target
        .router
        .dispatch(MessageEnvelope::new(Message::ImportData(exported)))
        .await;
    assert!(response.success, "{response:?}");

    let listed = target
        .router
        .dispatch(MessageEnvelope::new(Message::GetScreenshots))
        .await
        .data
        .unwrap();
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let rejected = target
        .router
        .dispatch(MessageEnvelope::new(Message::ImportData(
            json!({"version": 1}),
        )))
        .await;
    assert_eq!(rejected.error_category, Some(ErrorCategory::InvalidRequest));
}

#[tokio::test]
async fn keep_alive_runs_until_the_router_stops() {
    let f = fixture().await;
    let (service, handle) = RouterService::new(f.router.clone(), 8);
    let service = tokio::spawn(service.run());

    let ticker = spawn_keep_alive(handle, Duration::from_millis(10));
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(!ticker.is_finished());

    service.abort();
    tokio::time::timeout(Duration::from_secs(1), ticker)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn keep_alive_answers_directly() {
    let f = fixture().await;
    let value: Value = f
        .controller
        .handle(MessageEnvelope::new(Message::KeepAlive))
        .await
        .unwrap();
    assert_eq!(value, json!({"alive": true}));
}
