//! The privileged background controller.
//!
//! Owns the user settings, the observer activation state, the capture
//! orchestrator and the storage manager, and answers every [`MessageKind`]
//! through one exhaustive `match`.

mod observer;
mod page;

#[cfg(test)]
mod tests;

pub use observer::{DesktopObserver, ObserverHost};
pub use page::{FixedPage, NoActivePage, PageQuery};

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use serde_json::{Value, json};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::capture::{
    CaptureDependencies, CaptureError, CaptureOrchestrator, CapturePolicy, CaptureReceipt,
    PageInfo,
};
use crate::composite::Compositor;
use crate::config::{Config, Settings, SettingsPatch};
use crate::host::HostDependencies;
use crate::router::{
    ActivatePayload, ErrorCategory, HandlerError, Message, MessageEnvelope, MessageKind,
    MessageRouter, RouterHandle,
};
use crate::storage::{
    SaveOptions, StorageError, StorageLimits, StorageManager, StoreError, WriteBatch,
};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Failed to load settings: {0}")]
    Settings(#[from] StoreError),
}

pub struct Controller {
    defaults: Settings,
    settings: RwLock<Settings>,
    activation: Mutex<Option<ActivatePayload>>,
    orchestrator: CaptureOrchestrator,
    storage: Arc<StorageManager>,
    pages: Arc<dyn PageQuery>,
    observer: Arc<dyn ObserverHost>,
    root_folder: String,
}

impl Controller {
    /// Builds the controller and loads stored settings on top of the
    /// config defaults.
    pub async fn start(config: &Config, host: HostDependencies) -> Result<Arc<Self>, ControllerError> {
        let controller = Self::new(config, host);
        controller.reload_settings().await?;
        Ok(Arc::new(controller))
    }

    /// Builds the controller with config-default settings; nothing is read yet.
    pub fn new(config: &Config, host: HostDependencies) -> Self {
        let storage = Arc::new(StorageManager::new(
            host.store,
            host.downloads,
            host.estimator,
            Arc::clone(&host.clock),
            StorageLimits::from_config(config),
        ));
        let orchestrator = CaptureOrchestrator::new(
            CaptureDependencies {
                source: host.capture,
                compositor: Arc::new(Compositor::with_icon_dir(config.icon_dir())),
                storage: Arc::clone(&storage),
                clock: host.clock,
            },
            CapturePolicy::from_config(config),
        );
        let defaults = Settings::from_config(config);

        Self {
            settings: RwLock::new(defaults.clone()),
            defaults,
            activation: Mutex::new(None),
            orchestrator,
            storage,
            pages: host.pages,
            observer: host.observer,
            root_folder: config.storage.root_folder.clone(),
        }
    }

    pub fn orchestrator(&self) -> &CaptureOrchestrator {
        &self.orchestrator
    }

    pub fn storage(&self) -> &Arc<StorageManager> {
        &self.storage
    }

    pub async fn settings(&self) -> Settings {
        self.settings.read().await.clone()
    }

    pub fn activation(&self) -> Option<ActivatePayload> {
        self.activation
            .lock()
            .ok()
            .and_then(|activation| activation.clone())
    }

    /// Re-reads stored settings. Missing or malformed entries fall back to
    /// the config defaults field by field.
    pub async fn reload_settings(&self) -> Result<Settings, ControllerError> {
        let stored = self.storage.store().get(Settings::STORE_KEY).await?;
        let patch = match stored {
            Some(value) => serde_json::from_value::<SettingsPatch>(value).unwrap_or_else(|err| {
                log::warn!("Ignoring malformed stored settings: {}", err);
                SettingsPatch::default()
            }),
            None => SettingsPatch::default(),
        };

        let settings = self.defaults.merged(&patch);
        *self.settings.write().await = settings.clone();
        log::debug!("Settings loaded: {:?}", settings);
        Ok(settings)
    }

    /// Registers a handler for every message kind on `router`.
    pub fn register(self: &Arc<Self>, router: &MessageRouter) {
        for kind in MessageKind::ALL {
            let controller = Arc::clone(self);
            router.register_handler(
                *kind,
                Arc::new(move |envelope| {
                    let controller = Arc::clone(&controller);
                    async move { controller.handle(envelope).await }.boxed()
                }),
            );
        }
        log::info!("Registered {} message handlers", MessageKind::ALL.len());
    }

    /// Handles one envelope.
    pub async fn handle(&self, envelope: MessageEnvelope) -> Result<Value, HandlerError> {
        let MessageEnvelope {
            message, sender, ..
        } = envelope;

        match message {
            Message::CaptureScreenshot(request) => {
                let page = self.resolve_page(sender).await?;
                let settings = self.settings().await;
                let result = self.orchestrator.capture(&page, request, &settings).await;
                self.report_capture(&settings, &result).await;
                Ok(serde_json::to_value(result?)?)
            }
            Message::ScreenshotCaptured { artifact } => {
                log::info!(
                    "Screenshot of {} captured elsewhere ({} bytes)",
                    artifact.source_url,
                    artifact.encoded_image.len()
                );
                Ok(Value::Null)
            }
            Message::ScreenshotError { code, message } => {
                log::warn!("Observer reported capture error {}: {}", code, message);
                if self.settings().await.notifications {
                    self.notify("Screenshot failed", &message).await;
                }
                Ok(Value::Null)
            }
            Message::SaveScreenshot(payload) => {
                let options = match payload.options {
                    Some(options) => options,
                    None => SaveOptions::from_settings(&self.settings().await, &self.root_folder),
                };
                let outcome = self.storage.save_screenshot(&payload.artifact, &options).await?;
                Ok(serde_json::to_value(outcome)?)
            }
            Message::ScreenshotSaved { download_id } => {
                let record = self.storage.get_screenshot_metadata(download_id).await?;
                Ok(serde_json::to_value(record)?)
            }
            Message::GetStorageStats => {
                Ok(serde_json::to_value(self.storage.get_storage_stats().await?)?)
            }
            Message::GetSettings => Ok(serde_json::to_value(self.settings().await)?),
            Message::UpdateSettings(patch) => {
                let settings = self.update_settings(&patch).await?;
                Ok(serde_json::to_value(settings)?)
            }
            Message::ActivateExtension(payload) => {
                self.set_activation(Some(payload)).await?;
                Ok(self.activation_state())
            }
            Message::DeactivateExtension => {
                self.set_activation(None).await?;
                Ok(self.activation_state())
            }
            Message::KeepAlive => Ok(json!({ "alive": true })),
            Message::GetScreenshots => {
                Ok(serde_json::to_value(self.storage.get_all_screenshots().await?)?)
            }
            Message::GetScreenshotMetadata { download_id } => {
                match self.storage.get_screenshot_metadata(download_id).await? {
                    Some(record) => Ok(serde_json::to_value(record)?),
                    None => Err(StorageError::NotFound(download_id).into()),
                }
            }
            Message::CleanupOldData { max_age_days } => {
                let report = self.storage.cleanup_old_data(max_age_days).await?;
                Ok(serde_json::to_value(report)?)
            }
            Message::CheckStorageSpace => {
                Ok(serde_json::to_value(self.storage.check_storage_space().await?)?)
            }
            Message::ExportData => {
                let settings = self.settings().await;
                let snapshot = self.storage.export_screenshot_data(&settings).await?;
                Ok(serde_json::to_value(snapshot)?)
            }
            Message::ImportData(value) => {
                let report = self.storage.import_screenshot_data(value).await?;
                *self.settings.write().await = report.settings.clone();
                Ok(serde_json::to_value(report)?)
            }
        }
    }

    async fn resolve_page(&self, sender: Option<PageInfo>) -> Result<PageInfo, HandlerError> {
        if let Some(page) = sender {
            return Ok(page);
        }
        self.pages.active_page().await.map_err(|err| {
            HandlerError::new("No page to capture", ErrorCategory::Capture)
                .with_detail(err.to_string())
        })
    }

    async fn update_settings(&self, patch: &SettingsPatch) -> Result<Settings, HandlerError> {
        let mut settings = self.settings.write().await;
        let next = settings.merged(patch);

        let mut batch = WriteBatch::new();
        batch.set(Settings::STORE_KEY, &next).map_err(StorageError::from)?;
        self.storage
            .store()
            .commit(batch)
            .await
            .map_err(StorageError::from)?;

        log::info!("Settings updated");
        *settings = next.clone();
        Ok(next)
    }

    async fn set_activation(&self, activation: Option<ActivatePayload>) -> Result<(), HandlerError> {
        self.observer
            .set_active(activation.clone())
            .await
            .map_err(|err| {
                HandlerError::new("Could not reach the page", ErrorCategory::Internal)
                    .with_detail(err.to_string())
            })?;
        if let Ok(mut current) = self.activation.lock() {
            *current = activation;
        }
        Ok(())
    }

    fn activation_state(&self) -> Value {
        match self.activation() {
            Some(payload) => json!({ "active": true, "mode": payload.mode }),
            None => json!({ "active": false }),
        }
    }

    async fn report_capture(&self, settings: &Settings, result: &Result<CaptureReceipt, CaptureError>) {
        if !settings.notifications {
            return;
        }
        match result {
            Ok(receipt) => self.notify("Screenshot saved", &receipt.filename).await,
            Err(err @ (CaptureError::Capture(_) | CaptureError::Persist(_))) => {
                self.notify("Screenshot failed", &err.to_string()).await
            }
            Err(_) => {}
        }
    }

    async fn notify(&self, summary: &str, body: &str) {
        if let Err(err) = self.observer.notify(summary, body).await {
            log::warn!("Failed to send notification: {}", err);
        }
    }
}

/// Sends KEEP_ALIVE through `router` every `period` until the router is gone.
pub fn spawn_keep_alive(router: RouterHandle, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match router.send(MessageEnvelope::new(Message::KeepAlive)).await {
                Ok(response) if response.success => log::debug!("Keep-alive acknowledged"),
                Ok(response) => log::warn!("Keep-alive rejected: {:?}", response.error),
                Err(err) => {
                    log::info!("Stopping keep-alive: {}", err);
                    break;
                }
            }
        }
    })
}
