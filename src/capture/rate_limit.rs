//! Cooldown between accepted captures.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use super::types::CaptureError;

pub const DEFAULT_COOLDOWN_MS: u64 = 1000;

/// Remembers the last accepted capture attempt.
///
/// Soft state: it lives as long as the owning orchestrator and [`reset`]
/// clears it.
///
/// [`reset`]: RateLimiter::reset
#[derive(Debug)]
pub struct RateLimiter {
    cooldown: Duration,
    last_capture_at: Mutex<Option<DateTime<Utc>>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN_MS)
    }
}

impl RateLimiter {
    pub fn new(cooldown_ms: u64) -> Self {
        Self {
            cooldown: Duration::milliseconds(cooldown_ms.min(i64::MAX as u64) as i64),
            last_capture_at: Mutex::new(None),
        }
    }

    /// Accepts the attempt at `now` and records it, or rejects it without
    /// touching the stored timestamp. Check and update happen under one lock,
    /// so of two racing attempts inside the cooldown exactly one wins.
    pub fn try_acquire(&self, now: DateTime<Utc>) -> Result<(), CaptureError> {
        let mut last = self
            .last_capture_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(previous) = *last {
            let elapsed = now - previous;
            // A clock that moved backwards does not block captures.
            if elapsed >= Duration::zero() && elapsed < self.cooldown {
                let retry_after_ms = (self.cooldown - elapsed).num_milliseconds().max(0) as u64;
                log::debug!("Capture rejected, {} ms of cooldown left", retry_after_ms);
                return Err(CaptureError::RateLimited { retry_after_ms });
            }
        }

        *last = Some(now);
        Ok(())
    }

    pub fn last_capture_at(&self) -> Option<DateTime<Utc>> {
        *self
            .last_capture_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn reset(&self) {
        *self
            .last_capture_at
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}
