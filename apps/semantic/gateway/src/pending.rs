//! In-flight searches waiting for their correlated response.

use domain_semantic::ResultEnvelope;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

type Waiters = HashMap<String, oneshot::Sender<ResultEnvelope>>;

#[derive(Clone, Default)]
pub struct PendingRequests {
    inner: Arc<Mutex<Waiters>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    fn waiters(&self) -> MutexGuard<'_, Waiters> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a waiter. Must happen before the request is published so a
    /// fast response cannot arrive ahead of it.
    ///
    /// The entry lives as long as the returned [`Waiter`].
    pub fn register(&self, request_id: &str) -> Waiter {
        let (tx, rx) = oneshot::channel();
        self.waiters().insert(request_id.to_string(), tx);
        Waiter {
            pending: self.clone(),
            request_id: request_id.to_string(),
            rx,
        }
    }

    /// Hand a response to its waiter. Returns false if nobody is waiting.
    pub fn complete(&self, request_id: &str, envelope: ResultEnvelope) -> bool {
        let waiter = self.waiters().remove(request_id);
        match waiter {
            Some(tx) => tx.send(envelope).is_ok(),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.waiters().len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters().is_empty()
    }
}

/// One registered search; dropping it unregisters the request id
pub struct Waiter {
    pending: PendingRequests,
    request_id: String,
    rx: oneshot::Receiver<ResultEnvelope>,
}

impl Waiter {
    /// Wait for the response. `None` once the entry was removed without one.
    pub async fn response(&mut self) -> Option<ResultEnvelope> {
        (&mut self.rx).await.ok()
    }
}

impl Drop for Waiter {
    fn drop(&mut self) {
        self.pending.waiters().remove(&self.request_id);
    }
}
