//! Channel front-end for a [`MessageRouter`].

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use super::dispatch::MessageRouter;
use super::message::{MessageEnvelope, Response};

/// Returned when the router task is gone.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouterError {
    #[error("Could not establish connection. Receiving end does not exist.")]
    Disconnected,
}

struct Request {
    envelope: MessageEnvelope,
    reply: oneshot::Sender<Response>,
}

/// Cloneable sender half of a running router.
#[derive(Clone)]
pub struct RouterHandle {
    tx: mpsc::Sender<Request>,
}

impl RouterHandle {
    /// Sends `envelope` and waits for its response.
    pub async fn send(&self, envelope: MessageEnvelope) -> Result<Response, RouterError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request { envelope, reply })
            .await
            .map_err(|_| RouterError::Disconnected)?;
        rx.await.map_err(|_| RouterError::Disconnected)
    }
}

/// Runs dispatch for envelopes arriving on a channel.
///
/// Requests are picked up in arrival order and each runs on its own task,
/// so a slow capture does not hold back a stats query behind it.
pub struct RouterService {
    router: Arc<MessageRouter>,
    rx: mpsc::Receiver<Request>,
}

impl RouterService {
    pub fn new(router: Arc<MessageRouter>, capacity: usize) -> (Self, RouterHandle) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { router, rx }, RouterHandle { tx })
    }

    /// Serves until every [`RouterHandle`] is dropped.
    pub async fn run(mut self) {
        while let Some(Request { envelope, reply }) = self.rx.recv().await {
            let router = Arc::clone(&self.router);
            tokio::spawn(async move {
                let response = router.dispatch(envelope).await;
                if reply.send(response).is_err() {
                    log::debug!("Requester went away before the response was ready");
                }
            });
        }
        log::info!("Router channel closed");
    }
}
