//! xdg-desktop-portal Screenshot integration.

use std::collections::HashMap;

use futures::StreamExt;
use zbus::zvariant::OwnedValue;
use zbus::{Connection, proxy};

use crate::host::HostError;

#[proxy(
    interface = "org.freedesktop.portal.Screenshot",
    default_service = "org.freedesktop.portal.Desktop",
    default_path = "/org/freedesktop/portal/desktop"
)]
trait Screenshot {
    /// Returns the object path of a Request whose Response signal carries the URI.
    async fn screenshot(
        &self,
        parent_window: &str,
        options: HashMap<String, zbus::zvariant::Value<'_>>,
    ) -> zbus::Result<zbus::zvariant::OwnedObjectPath>;
}

#[proxy(
    interface = "org.freedesktop.portal.Request",
    default_service = "org.freedesktop.portal.Desktop"
)]
trait Request {
    /// `response`: 0 = success, 1 = cancelled, 2 = other error.
    #[zbus(signal)]
    fn response(&self, response: u32, results: HashMap<String, OwnedValue>) -> zbus::Result<()>;
}

/// Asks the portal for a non-interactive screenshot and returns the file URI.
pub async fn capture_via_portal() -> Result<String, HostError> {
    let connection = Connection::session().await?;
    let proxy = ScreenshotProxy::new(&connection)
        .await
        .map_err(|_| HostError::PortalUnavailable)?;

    let options = build_portal_options();
    log::debug!("Calling portal screenshot with options: {:?}", options);

    let request_path = proxy.screenshot("", options).await.map_err(|e| {
        let message = e.to_string();
        if message.contains("Cancelled") || message.contains("denied") {
            HostError::PermissionDenied(message)
        } else {
            HostError::DBus(e)
        }
    })?;
    log::debug!("Screenshot request created: {:?}", request_path);

    let request_proxy = RequestProxy::builder(&connection)
        .path(request_path)?
        .build()
        .await?;
    let mut responses = request_proxy.receive_response().await?;

    let signal = responses
        .next()
        .await
        .ok_or_else(|| HostError::InvalidResponse("No Response signal received".to_string()))?;
    let args = signal
        .args()
        .map_err(|e| HostError::InvalidResponse(format!("Failed to parse response args: {}", e)))?;

    match args.response {
        0 => {
            let uri_value = args
                .results
                .get("uri")
                .ok_or_else(|| HostError::InvalidResponse("No 'uri' field in response".into()))?;
            let uri: &str = uri_value
                .downcast_ref()
                .map_err(|e| HostError::InvalidResponse(format!("URI is not a string: {}", e)))?;
            log::info!("Portal screenshot ready at {}", uri);
            Ok(uri.to_string())
        }
        1 => Err(HostError::PermissionDenied(
            "Screenshot request was cancelled".to_string(),
        )),
        code => Err(HostError::InvalidResponse(format!(
            "Portal returned error code {}",
            code
        ))),
    }
}

/// The controller captures what is on screen right now, without a picker.
fn build_portal_options() -> HashMap<String, zbus::zvariant::Value<'static>> {
    let mut options = HashMap::new();
    options.insert("modal".to_string(), false.into());
    options.insert("interactive".to_string(), false.into());
    options
}
