//! Capabilities the pipeline borrows from its host environment.
//!
//! Every capability is a trait object so tests can swap in mocks; the
//! desktop implementations live next to the code that consumes them.

use std::sync::Arc;

use thiserror::Error;

use crate::capture::{PortalCapture, VisibleAreaCapture};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::controller::{DesktopObserver, NoActivePage, ObserverHost, PageQuery};
use crate::storage::{
    DiskEstimator, DownloadHost, FileDownloader, JsonFileStore, KeyValueStore, StorageEstimator,
};

/// Failure reported by a host capability.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("xdg-desktop-portal is not available")]
    PortalUnavailable,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("D-Bus communication error: {0}")]
    DBus(#[from] zbus::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Host returned invalid response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Other(String),
}

/// Bundle of host capabilities used by the controller.
#[derive(Clone)]
pub struct HostDependencies {
    pub capture: Arc<dyn VisibleAreaCapture>,
    pub downloads: Arc<dyn DownloadHost>,
    pub store: Arc<dyn KeyValueStore>,
    pub estimator: Arc<dyn StorageEstimator>,
    pub pages: Arc<dyn PageQuery>,
    pub observer: Arc<dyn ObserverHost>,
    pub clock: Arc<dyn Clock>,
}

impl HostDependencies {
    /// Desktop capabilities configured from `config`: portal capture, downloads
    /// under the download directory, a JSON file store, and D-Bus notifications.
    pub fn desktop(config: &Config) -> Self {
        let download_dir = config.download_dir();
        Self {
            capture: Arc::new(PortalCapture),
            downloads: Arc::new(FileDownloader::new(download_dir.clone())),
            store: Arc::new(JsonFileStore::new(config.store_path())),
            estimator: Arc::new(DiskEstimator::new(download_dir)),
            pages: Arc::new(NoActivePage),
            observer: Arc::new(DesktopObserver::new(config.capture.notify)),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_pages(mut self, pages: Arc<dyn PageQuery>) -> Self {
        self.pages = pages;
        self
    }
}
