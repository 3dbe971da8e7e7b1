//! Click-to-capture screenshots with marker, note and transcription overlays.
//!
//! The library holds the capture-compose-persist pipeline, the message router
//! the controller answers through, and the host capability traits, so the
//! binary and tests can wire them to desktop services or mocks.

pub mod capture;
pub mod clock;
pub mod composite;
pub mod config;
pub mod controller;
pub mod draw;
pub mod host;
pub mod notification;
pub mod router;
pub mod storage;
pub mod util;

pub use config::Config;
