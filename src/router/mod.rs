//! Message routing between the controller and the surfaces that talk to it.

pub mod classify;
mod dispatch;
pub mod message;
mod service;


pub use classify::{ErrorClassification, classify_error};
pub use dispatch::{Handler, MessageRouter, decode_envelope};
pub use message::{
    ActivatePayload, CaptureMode, ErrorCategory, Message, MessageEnvelope, MessageKind, Response,
    SavePayload,
};
pub use service::{RouterError, RouterHandle, RouterService};

use crate::capture::CaptureError;
use crate::storage::StorageError;

/// Failure returned by a handler, already shaped for the requester.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerError {
    pub message: String,
    pub category: ErrorCategory,
    pub detail: Option<String>,
}

impl HandlerError {
    pub fn new(message: impl Into<String>, category: ErrorCategory) -> Self {
        Self {
            message: message.into(),
            category,
            detail: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(message, ErrorCategory::InvalidRequest)
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl From<CaptureError> for HandlerError {
    fn from(err: CaptureError) -> Self {
        let category = match &err {
            CaptureError::Validation(_) => ErrorCategory::Validation,
            CaptureError::RateLimited { .. } => ErrorCategory::RateLimited,
            CaptureError::Capture(_) => ErrorCategory::Capture,
            CaptureError::Persist(_) => ErrorCategory::Persist,
            CaptureError::Task(_) => ErrorCategory::Internal,
        };
        Self {
            message: err.to_string(),
            category,
            detail: err.detail(),
        }
    }
}

impl From<StorageError> for HandlerError {
    fn from(err: StorageError) -> Self {
        let category = match &err {
            StorageError::NotFound(_) => ErrorCategory::NotFound,
            StorageError::InvalidSnapshot(_) => ErrorCategory::InvalidRequest,
            StorageError::Download(_) | StorageError::Estimate(_) | StorageError::Store(_) => {
                ErrorCategory::Persist
            }
        };
        Self::new(err.to_string(), category)
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(err.to_string(), ErrorCategory::Internal).with_detail(format!("{err:#}"))
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("Could not encode response: {err}"), ErrorCategory::Internal)
    }
}
