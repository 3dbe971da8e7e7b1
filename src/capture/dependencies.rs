use std::sync::Arc;

use async_trait::async_trait;

use super::{portal, reader::read_image_from_uri, types::PageInfo};
use crate::clock::Clock;
use crate::composite::Compositor;
use crate::host::HostError;
use crate::storage::StorageManager;

/// Host capability that returns the visible area of a page as an encoded
/// bitmap (PNG or JPEG).
#[async_trait]
pub trait VisibleAreaCapture: Send + Sync {
    async fn capture_visible(&self, page: &PageInfo) -> Result<Vec<u8>, HostError>;
}

/// Captures the screen through xdg-desktop-portal.
#[derive(Debug, Default, Clone, Copy)]
pub struct PortalCapture;

#[async_trait]
impl VisibleAreaCapture for PortalCapture {
    async fn capture_visible(&self, page: &PageInfo) -> Result<Vec<u8>, HostError> {
        log::debug!("Capturing visible area for {}", page.url);
        let uri = portal::capture_via_portal().await?;
        tokio::task::spawn_blocking(move || read_image_from_uri(&uri))
            .await
            .map_err(|e| HostError::Other(format!("Portal reader task failed: {}", e)))?
    }
}

/// Everything the capture pipeline calls out to. Each part can be mocked.
#[derive(Clone)]
pub struct CaptureDependencies {
    pub source: Arc<dyn VisibleAreaCapture>,
    pub compositor: Arc<Compositor>,
    pub storage: Arc<StorageManager>,
    pub clock: Arc<dyn Clock>,
}
