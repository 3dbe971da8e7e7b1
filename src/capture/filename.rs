//! Screenshot filename synthesis.

use chrono::{DateTime, Utc};
use url::Url;

use crate::config::ImageFormat;

/// Host segment used when the source URL has no usable host.
pub const FALLBACK_HOST: &str = "screenshot";

/// `ux-screenshot_{yyyy-MM-dd}_{HH-mm-ss}_{host[-port]}[_annotated|_transcribed].{ext}`
///
/// The timestamp is rendered in UTC. The host is lower-cased with `.` and `:`
/// replaced by `-`. `_annotated` wins over `_transcribed` when both texts are
/// present.
pub fn generate_filename(
    url: &str,
    timestamp: DateTime<Utc>,
    annotation_text: Option<&str>,
    transcription_text: Option<&str>,
    format: ImageFormat,
) -> String {
    let host = host_segment(url).unwrap_or_else(|| FALLBACK_HOST.to_string());

    let suffix = if has_text(annotation_text) {
        "_annotated"
    } else if has_text(transcription_text) {
        "_transcribed"
    } else {
        ""
    };

    format!(
        "ux-screenshot_{}_{}{}.{}",
        timestamp.format("%Y-%m-%d_%H-%M-%S"),
        host,
        suffix,
        format.extension()
    )
}

/// Lower-cased hostname of `url`, or `unknown`.
pub fn extract_domain(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_ascii_lowercase))
        .map(|host| host.trim_matches(['[', ']']).to_string())
        .filter(|host| !host.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn host_segment(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.trim_matches(['[', ']']).to_ascii_lowercase();
    if host.is_empty() {
        return None;
    }

    let with_port = match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host,
    };

    Some(
        with_port
            .chars()
            .map(|c| if c == '.' || c == ':' { '-' } else { c })
            .collect(),
    )
}

fn has_text(text: Option<&str>) -> bool {
    text.is_some_and(|t| !t.trim().is_empty())
}
