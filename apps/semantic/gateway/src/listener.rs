//! Background consumer for the response stream.

use domain_semantic::SearchResponse;
use std::sync::Arc;
use std::time::Duration;
use stream_worker::{MessageSource, StreamError, StreamEvent};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::pending::PendingRequests;

const READ_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// What happened to one response entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    NoWaiter,
    Uncorrelated,
    Undecodable,
}

pub struct ResponseListener {
    source: Arc<dyn MessageSource>,
    pending: PendingRequests,
}

impl ResponseListener {
    pub fn new(source: Arc<dyn MessageSource>, pending: PendingRequests) -> Self {
        Self { source, pending }
    }

    /// Consume responses until shutdown or until the source closes.
    ///
    /// Read failures are logged and retried after a short pause; an in-flight
    /// search simply times out meanwhile.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("Response listener started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let received = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                received = self.source.recv() => received,
            };

            match received {
                Ok(Some(event)) => {
                    self.dispatch(&event).await;
                    if let Err(e) = self.source.ack(&event).await {
                        warn!(stream_id = %event.stream_id, error = %e, "Failed to ack response");
                    }
                }
                Ok(None) => continue,
                Err(StreamError::Closed) => break,
                Err(e) => {
                    error!(error = %e, "Failed to read response stream");
                    tokio::time::sleep(READ_ERROR_BACKOFF).await;
                }
            }
        }

        info!("Response listener stopped");
    }

    /// Complete the waiter matching this entry, if any
    pub async fn dispatch(&self, event: &StreamEvent) -> Delivery {
        let response: SearchResponse = match serde_json::from_str(&event.payload) {
            Ok(response) => response,
            Err(e) => {
                warn!(stream_id = %event.stream_id, error = %e, "Undecodable search response");
                return Delivery::Undecodable;
            }
        };

        let Some(request_id) = response.request_id else {
            debug!(stream_id = %event.stream_id, "Search response without request_id");
            return Delivery::Uncorrelated;
        };

        if self.pending.complete(&request_id, response.results) {
            debug!(request_id = %request_id, "Search response delivered");
            Delivery::Delivered
        } else {
            debug!(request_id = %request_id, "No waiter for search response");
            Delivery::NoWaiter
        }
    }
}
