//! Desktop notifications via freedesktop D-Bus.

use std::collections::HashMap;

use zbus::{Connection, proxy};

use crate::host::HostError;

const APP_NAME: &str = "clickshot";
const DEFAULT_ICON: &str = "camera-photo";
const EXPIRE_TIMEOUT_MS: i32 = 3000;

#[proxy(
    interface = "org.freedesktop.Notifications",
    default_service = "org.freedesktop.Notifications",
    default_path = "/org/freedesktop/Notifications"
)]
trait Notifications {
    /// Returns the notification id.
    #[allow(clippy::too_many_arguments)]
    fn notify(
        &self,
        app_name: &str,
        replaces_id: u32,
        app_icon: &str,
        summary: &str,
        body: &str,
        actions: Vec<&str>,
        hints: HashMap<&str, zbus::zvariant::Value<'_>>,
        expire_timeout: i32,
    ) -> zbus::Result<u32>;
}

/// Sends a notification; `icon` defaults to "camera-photo".
pub async fn send_notification(
    summary: &str,
    body: &str,
    icon: Option<&str>,
) -> Result<u32, HostError> {
    let connection = Connection::session().await?;
    let proxy = NotificationsProxy::new(&connection).await?;

    let id = proxy
        .notify(
            APP_NAME,
            0,
            icon.unwrap_or(DEFAULT_ICON),
            summary,
            body,
            vec![],
            HashMap::new(),
            EXPIRE_TIMEOUT_MS,
        )
        .await?;

    log::debug!("Sent notification {} ('{}')", id, summary);
    Ok(id)
}
