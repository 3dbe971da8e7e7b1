use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock};

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;

use super::classify::classify_error;
use super::message::{ErrorCategory, MessageEnvelope, MessageKind, Response};
use super::HandlerError;

/// Async handler for one message kind.
pub type Handler =
    Arc<dyn Fn(MessageEnvelope) -> BoxFuture<'static, Result<Value, HandlerError>> + Send + Sync>;

/// Maps message kinds to handlers. Holds no business state.
#[derive(Default)]
pub struct MessageRouter {
    handlers: RwLock<HashMap<MessageKind, Handler>>,
}

impl MessageRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `kind`, replacing any previous one.
    pub fn register_handler(&self, kind: MessageKind, handler: Handler) {
        let mut handlers = self
            .handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if handlers.insert(kind, handler).is_some() {
            log::debug!("Replaced handler for {}", kind);
        }
    }

    pub fn has_handler(&self, kind: MessageKind) -> bool {
        self.handler(kind).is_some()
    }

    fn handler(&self, kind: MessageKind) -> Option<Handler> {
        self.handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&kind)
            .cloned()
    }

    /// Runs the handler for `envelope`. Never fails: missing handlers,
    /// handler errors and handler panics all become failure responses.
    pub async fn dispatch(&self, envelope: MessageEnvelope) -> Response {
        let kind = envelope.kind();
        let Some(handler) = self.handler(kind) else {
            log::warn!("No handler registered for {}", kind);
            return Response::unknown_message(kind.as_str());
        };

        log::debug!("Dispatching {}", kind);
        match AssertUnwindSafe(handler(envelope)).catch_unwind().await {
            Ok(Ok(data)) => Response::ok(data),
            Ok(Err(err)) => error_response(kind, err),
            Err(_) => {
                log::error!("Handler for {} panicked", kind);
                Response::failure(
                    "Something went wrong, please try again",
                    ErrorCategory::Internal,
                )
            }
        }
    }

    /// Decodes a JSON envelope and dispatches it. Undecodable input and
    /// unknown types yield the unknown-message response.
    pub async fn dispatch_json(&self, raw: &str) -> Response {
        match decode_envelope(raw) {
            Ok(envelope) => self.dispatch(envelope).await,
            Err(response) => response,
        }
    }
}

/// Parses one wire envelope, or returns the response owed to the sender.
pub fn decode_envelope(raw: &str) -> Result<MessageEnvelope, Response> {
    let value: Value = serde_json::from_str(raw).map_err(|err| {
        log::warn!("Dropping undecodable envelope: {}", err);
        Response::unknown_message("<undecodable>").with_detail(Some(err.to_string()))
    })?;

    let type_name = value
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("<missing>")
        .to_string();
    if type_name.parse::<MessageKind>().is_err() {
        log::warn!("Unknown message type '{}'", type_name);
        return Err(Response::unknown_message(&type_name));
    }

    serde_json::from_value::<MessageEnvelope>(value).map_err(|err| {
        log::warn!("Malformed {} envelope: {}", type_name, err);
        Response::failure(
            format!("Malformed {type_name} payload"),
            ErrorCategory::InvalidRequest,
        )
        .with_detail(Some(err.to_string()))
    })
}

fn error_response(kind: MessageKind, err: HandlerError) -> Response {
    let category = if classify_error(&err.message).is_context_invalidation
        || err
            .detail
            .as_deref()
            .is_some_and(|detail| classify_error(detail).is_context_invalidation)
    {
        ErrorCategory::ContextInvalidated
    } else {
        err.category
    };

    log::debug!("{} failed ({:?}): {}", kind, category, err.message);
    Response::failure(err.message, category).with_detail(err.detail)
}
