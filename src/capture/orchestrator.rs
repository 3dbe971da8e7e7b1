use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use super::{
    dependencies::CaptureDependencies,
    eligibility::validate_page,
    rate_limit::RateLimiter,
    types::{CaptureError, CaptureReceipt, CaptureRequest, CaptureStatus, PageInfo},
};
use crate::composite::{EncodedImage, OverlaySpec, encode::sniff_format};
use crate::config::{Config, Settings};
use crate::storage::{CompositedArtifact, SaveOptions};

/// Capture rules taken from the config file.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturePolicy {
    pub cooldown_ms: u64,
    /// Denylist entries on top of the built-in browser pages.
    pub restricted_prefixes: Vec<String>,
    pub root_folder: String,
}

impl Default for CapturePolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl CapturePolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cooldown_ms: config.capture.cooldown_ms,
            restricted_prefixes: config.capture.restricted_prefixes.clone(),
            root_folder: config.storage.root_folder.clone(),
        }
    }
}

/// Turns capture requests into saved screenshots:
/// Validating -> RateChecking -> Capturing -> Compositing -> Persisting.
pub struct CaptureOrchestrator {
    deps: CaptureDependencies,
    policy: CapturePolicy,
    rate_limiter: RateLimiter,
    status: Arc<Mutex<CaptureStatus>>,
}

impl CaptureOrchestrator {
    pub fn new(deps: CaptureDependencies, policy: CapturePolicy) -> Self {
        let rate_limiter = RateLimiter::new(policy.cooldown_ms);
        Self {
            deps,
            policy,
            rate_limiter,
            status: Arc::new(Mutex::new(CaptureStatus::Idle)),
        }
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Stage reached by the most recent capture.
    pub fn last_status(&self) -> CaptureStatus {
        self.status
            .lock()
            .map(|status| status.clone())
            .unwrap_or(CaptureStatus::Idle)
    }

    /// Clears the cooldown and the font cache.
    pub fn reset(&self) {
        self.rate_limiter.reset();
        self.deps.compositor.fonts().reset();
        self.set_status(CaptureStatus::Idle);
    }

    /// Runs one capture with `settings` as the overlay defaults.
    pub async fn capture(
        &self,
        page: &PageInfo,
        request: CaptureRequest,
        settings: &Settings,
    ) -> Result<CaptureReceipt, CaptureError> {
        match self.run(page, request, settings).await {
            Ok(receipt) => {
                log::info!(
                    "Capture saved as {} (download {})",
                    receipt.full_path,
                    receipt.download_id
                );
                self.set_status(CaptureStatus::Done);
                Ok(receipt)
            }
            Err(err) => {
                match err.detail() {
                    Some(detail) => log::error!("Capture failed: {} ({})", err, detail),
                    None => log::info!("Capture rejected: {}", err),
                }
                self.set_status(CaptureStatus::Failed(err.to_string()));
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        page: &PageInfo,
        request: CaptureRequest,
        settings: &Settings,
    ) -> Result<CaptureReceipt, CaptureError> {
        self.set_status(CaptureStatus::Validating);
        validate_page(&page.url, &self.policy.restricted_prefixes)?;

        self.set_status(CaptureStatus::RateChecking);
        let now = self.deps.clock.now();
        self.rate_limiter.try_acquire(now)?;

        // The cooldown stays consumed from here on, even if the capture fails.
        self.set_status(CaptureStatus::Capturing);
        let raw = self
            .deps
            .source
            .capture_visible(page)
            .await
            .map_err(CaptureError::Capture)?;
        log::debug!("Captured {} bytes from {}", raw.len(), page.url);

        self.set_status(CaptureStatus::Compositing);
        let spec = OverlaySpec::from_settings(
            settings,
            request.coordinates,
            request.icon_variant,
            request.annotation_text.clone(),
            request.transcription_text.clone(),
            request.device_pixel_ratio,
        );
        let image = self.composite(raw, spec).await;

        self.set_status(CaptureStatus::Persisting);
        let artifact = build_artifact(page, &request, image.bytes, image.format, now);
        let options = SaveOptions::from_settings(settings, &self.policy.root_folder);
        let outcome = self
            .deps
            .storage
            .save_screenshot(&artifact, &options)
            .await
            .map_err(CaptureError::Persist)?;

        Ok(CaptureReceipt {
            download_id: outcome.download_id,
            filename: outcome.filename,
            full_path: outcome.full_path,
            size_bytes: outcome.size_bytes,
            timestamp: now,
            composited: image.composited,
        })
    }

    /// Composites off the async runtime. A failed task still yields the raw capture.
    async fn composite(&self, raw: Vec<u8>, spec: OverlaySpec) -> EncodedImage {
        let compositor = Arc::clone(&self.deps.compositor);
        let fallback = raw.clone();
        match tokio::task::spawn_blocking(move || compositor.composite(&raw, &spec)).await {
            Ok(image) => image,
            Err(err) => {
                log::warn!("Compositing task failed, keeping the raw capture: {}", err);
                EncodedImage {
                    format: sniff_format(&fallback).unwrap_or_default(),
                    bytes: fallback,
                    composited: false,
                }
            }
        }
    }

    fn set_status(&self, status: CaptureStatus) {
        log::debug!("Capture status -> {:?}", status);
        if let Ok(mut current) = self.status.lock() {
            *current = status;
        }
    }
}

fn build_artifact(
    page: &PageInfo,
    request: &CaptureRequest,
    encoded_image: Vec<u8>,
    format: crate::config::ImageFormat,
    timestamp: DateTime<Utc>,
) -> CompositedArtifact {
    CompositedArtifact {
        encoded_image,
        format,
        source_url: page.url.clone(),
        timestamp,
        coordinates: request.coordinates,
        annotation_text: request
            .annotation_text
            .clone()
            .filter(|text| !text.trim().is_empty()),
        transcription_text: request
            .transcription_text
            .clone()
            .filter(|text| !text.trim().is_empty()),
    }
}
