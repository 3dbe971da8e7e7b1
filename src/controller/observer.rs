use std::sync::Mutex;

use async_trait::async_trait;

use crate::host::HostError;
use crate::notification;
use crate::router::ActivatePayload;

/// The surface that listens for clicks and shows results to the user.
#[async_trait]
pub trait ObserverHost: Send + Sync {
    /// `None` deactivates.
    async fn set_active(&self, activation: Option<ActivatePayload>) -> Result<(), HostError>;

    async fn notify(&self, summary: &str, body: &str) -> Result<(), HostError>;
}

/// Records activation locally and reports through desktop notifications.
#[derive(Debug, Default)]
pub struct DesktopObserver {
    notifications: bool,
    active: Mutex<Option<ActivatePayload>>,
}

impl DesktopObserver {
    pub fn new(notifications: bool) -> Self {
        Self {
            notifications,
            active: Mutex::new(None),
        }
    }

    pub fn activation(&self) -> Option<ActivatePayload> {
        self.active.lock().ok().and_then(|active| active.clone())
    }
}

#[async_trait]
impl ObserverHost for DesktopObserver {
    async fn set_active(&self, activation: Option<ActivatePayload>) -> Result<(), HostError> {
        match &activation {
            Some(payload) => log::info!("Observer activated in {:?} mode", payload.mode),
            None => log::info!("Observer deactivated"),
        }
        let mut active = self
            .active
            .lock()
            .map_err(|_| HostError::Other("Observer state poisoned".to_string()))?;
        *active = activation;
        Ok(())
    }

    async fn notify(&self, summary: &str, body: &str) -> Result<(), HostError> {
        if !self.notifications {
            log::debug!("Notifications disabled, skipping '{}'", summary);
            return Ok(());
        }
        notification::send_notification(summary, body, None).await?;
        Ok(())
    }
}
