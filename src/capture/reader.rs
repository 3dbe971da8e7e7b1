use std::{fs, thread, time::Duration};

use crate::host::HostError;

/// Up to three seconds for the portal to flush its file.
const MAX_ATTEMPTS: usize = 60;
const ATTEMPT_DELAY_MS: u64 = 50;

/// Reads the image behind a `file://` URI returned by the portal and removes
/// the temporary file. Blocking; run it off the async runtime.
pub fn read_image_from_uri(uri: &str) -> Result<Vec<u8>, HostError> {
    let url = url::Url::parse(uri)
        .map_err(|e| HostError::InvalidResponse(format!("Invalid file URI '{}': {}", uri, e)))?;
    let path = url
        .to_file_path()
        .map_err(|_| HostError::InvalidResponse(format!("Cannot convert URI to path: {}", uri)))?;

    let mut data = Vec::new();
    for attempt in 0..MAX_ATTEMPTS {
        match fs::read(&path) {
            Ok(bytes) if !bytes.is_empty() => {
                data = bytes;
                break;
            }
            Ok(_) => log::trace!(
                "Portal file {} still empty (attempt {}/{})",
                path.display(),
                attempt + 1,
                MAX_ATTEMPTS
            ),
            Err(e) => log::trace!(
                "Portal file {} not ready (attempt {}/{}): {}",
                path.display(),
                attempt + 1,
                MAX_ATTEMPTS,
                e
            ),
        }

        if attempt + 1 == MAX_ATTEMPTS {
            return Err(HostError::InvalidResponse(format!(
                "Portal file {} not ready after {} attempts",
                path.display(),
                MAX_ATTEMPTS
            )));
        }
        thread::sleep(Duration::from_millis(ATTEMPT_DELAY_MS));
    }

    log::debug!("Read {} bytes from {}", data.len(), path.display());

    if let Err(e) = fs::remove_file(&path) {
        log::warn!("Failed to remove portal temp file {}: {}", path.display(), e);
    }

    Ok(data)
}
