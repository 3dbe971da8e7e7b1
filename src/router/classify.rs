//! Detection of host teardown errors.
//!
//! The host reports a torn-down receiver only through error text, so this is
//! string matching against a fixed phrase list. Keep every phrase here.

/// Lower-case phrases that mean the other side of a channel went away.
pub const CONTEXT_INVALIDATION_PHRASES: &[&str] = &[
    "extension context invalidated",
    "context invalidated",
    "could not establish connection",
    "receiving end does not exist",
    "message port closed",
    "message channel closed",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ErrorClassification {
    pub is_context_invalidation: bool,
}

/// Classifies an error message. Matching ignores case.
pub fn classify_error(message: &str) -> ErrorClassification {
    let lowered = message.to_lowercase();
    ErrorClassification {
        is_context_invalidation: CONTEXT_INVALIDATION_PHRASES
            .iter()
            .any(|phrase| lowered.contains(phrase)),
    }
}
