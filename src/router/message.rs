//! Wire types exchanged between the controller and its surfaces.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capture::{CaptureRequest, PageInfo};
use crate::config::{IconVariant, SettingsPatch};
use crate::storage::{CompositedArtifact, SaveOptions};

/// What an activated observer should do on click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    #[default]
    Screenshot,
    Annotation,
    Transcription,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivatePayload {
    #[serde(default)]
    pub mode: CaptureMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_variant: Option<IconVariant>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePayload {
    pub artifact: CompositedArtifact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<SaveOptions>,
}

/// Every message kind with its payload shape. Tagged on the wire as
/// `{"type": "...", "payload": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    CaptureScreenshot(CaptureRequest),
    ScreenshotCaptured {
        artifact: CompositedArtifact,
    },
    ScreenshotError {
        code: String,
        message: String,
    },
    SaveScreenshot(SavePayload),
    #[serde(rename_all = "camelCase")]
    ScreenshotSaved {
        download_id: u64,
    },
    GetStorageStats,
    GetSettings,
    UpdateSettings(SettingsPatch),
    ActivateExtension(ActivatePayload),
    DeactivateExtension,
    KeepAlive,
    GetScreenshots,
    #[serde(rename_all = "camelCase")]
    GetScreenshotMetadata {
        download_id: u64,
    },
    #[serde(rename_all = "camelCase")]
    CleanupOldData {
        max_age_days: u32,
    },
    CheckStorageSpace,
    ExportData,
    ImportData(Value),
}

macro_rules! message_kinds {
    ($($kind:ident => $wire:literal),* $(,)?) => {
        /// Tag of a [`Message`], used as the dispatch key.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum MessageKind {
            $($kind),*
        }

        impl MessageKind {
            pub const ALL: &'static [MessageKind] = &[$(MessageKind::$kind),*];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(MessageKind::$kind => $wire),*
                }
            }
        }

        impl Message {
            pub fn kind(&self) -> MessageKind {
                match self {
                    $(Message::$kind { .. } => MessageKind::$kind),*
                }
            }
        }
    };
}

message_kinds! {
    CaptureScreenshot => "CAPTURE_SCREENSHOT",
    ScreenshotCaptured => "SCREENSHOT_CAPTURED",
    ScreenshotError => "SCREENSHOT_ERROR",
    SaveScreenshot => "SAVE_SCREENSHOT",
    ScreenshotSaved => "SCREENSHOT_SAVED",
    GetStorageStats => "GET_STORAGE_STATS",
    GetSettings => "GET_SETTINGS",
    UpdateSettings => "UPDATE_SETTINGS",
    ActivateExtension => "ACTIVATE_EXTENSION",
    DeactivateExtension => "DEACTIVATE_EXTENSION",
    KeepAlive => "KEEP_ALIVE",
    GetScreenshots => "GET_SCREENSHOTS",
    GetScreenshotMetadata => "GET_SCREENSHOT_METADATA",
    CleanupOldData => "CLEANUP_OLD_DATA",
    CheckStorageSpace => "CHECK_STORAGE_SPACE",
    ExportData => "EXPORT_DATA",
    ImportData => "IMPORT_DATA",
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown message type '{s}'"))
    }
}

/// The wire unit: a message plus its send time and, for observer messages,
/// the page it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    #[serde(flatten)]
    pub message: Message,
    /// Milliseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<PageInfo>,
}

impl MessageEnvelope {
    /// Envelope stamped with the current time.
    pub fn new(message: Message) -> Self {
        Self {
            message,
            timestamp: chrono::Utc::now().timestamp_millis(),
            sender: None,
        }
    }

    pub fn from_page(mut self, page: PageInfo) -> Self {
        self.sender = Some(page);
        self
    }

    pub fn kind(&self) -> MessageKind {
        self.message.kind()
    }
}

/// Broad class of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    UnknownMessage,
    ContextInvalidated,
    Validation,
    RateLimited,
    Capture,
    Persist,
    NotFound,
    InvalidRequest,
    Internal,
}

/// Reply to every dispatched envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_category: Option<ErrorCategory>,
    /// Diagnostic detail; not meant for the user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Response {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: (!data.is_null()).then_some(data),
            error: None,
            error_category: None,
            detail: None,
        }
    }

    pub fn failure(error: impl Into<String>, category: ErrorCategory) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            error_category: Some(category),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: Option<String>) -> Self {
        self.detail = detail;
        self
    }

    pub fn unknown_message(kind: &str) -> Self {
        Self::failure(
            format!("Unknown message type: {kind}"),
            ErrorCategory::UnknownMessage,
        )
    }
}
