//! Pages that must never be captured.

use url::Url;

use super::types::CaptureError;

/// Browser-internal, extension and store pages.
pub const RESTRICTED_PREFIXES: &[&str] = &[
    "chrome://",
    "chrome-extension://",
    "chrome-search://",
    "chrome-untrusted://",
    "edge://",
    "brave://",
    "opera://",
    "vivaldi://",
    "about:",
    "moz-extension://",
    "devtools://",
    "view-source:",
    "https://chrome.google.com/webstore",
    "https://chromewebstore.google.com",
    "https://microsoftedge.microsoft.com/addons",
    "https://addons.mozilla.org",
];

/// Rejects `url` when it starts with a built-in or `extra` restricted prefix.
/// Matching ignores ASCII case.
pub fn validate_page(url: &str, extra: &[String]) -> Result<(), CaptureError> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(CaptureError::Validation(
            "No page is available to capture".to_string(),
        ));
    }

    let lowered = trimmed.to_ascii_lowercase();
    let restricted = RESTRICTED_PREFIXES
        .iter()
        .copied()
        .chain(extra.iter().map(String::as_str))
        .filter(|prefix| !prefix.trim().is_empty())
        .any(|prefix| lowered.starts_with(&prefix.trim().to_ascii_lowercase()));

    if restricted {
        let origin = describe_origin(trimmed);
        log::info!("Refusing capture of restricted page {}", origin);
        return Err(CaptureError::Validation(format!(
            "Screenshots are not allowed on {origin} pages"
        )));
    }
    Ok(())
}

/// `scheme://host` (or `scheme:` for host-less URLs) naming the rejected page.
fn describe_origin(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) if !host.is_empty() => format!("{}://{}", parsed.scheme(), host),
            _ => format!("{}:", parsed.scheme()),
        },
        Err(_) => url.split('/').next().unwrap_or(url).to_string(),
    }
}
