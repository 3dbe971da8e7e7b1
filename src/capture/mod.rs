//! Click-to-capture pipeline.
//!
//! This module turns a [`CaptureRequest`] into a saved screenshot:
//! - page eligibility checks against a denylist of browser-internal pages
//! - a cooldown between accepted captures
//! - visible-area capture through a host capability (xdg-desktop-portal by default)
//! - overlay compositing and persistence through the storage manager

pub mod eligibility;
pub mod filename;
pub mod portal;
pub mod rate_limit;
pub mod types;

mod dependencies;
mod orchestrator;
mod reader;
#[cfg(test)]
mod tests;

pub use dependencies::{CaptureDependencies, PortalCapture, VisibleAreaCapture};
pub use orchestrator::{CaptureOrchestrator, CapturePolicy};
pub use rate_limit::RateLimiter;
pub use types::{CaptureError, CaptureReceipt, CaptureRequest, CaptureStatus, PageInfo};
