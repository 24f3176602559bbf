//! Stream consumer for Redis operations
//!
//! Reads entries one at a time from a Redis stream using a consumer group.
//! Entries left unacknowledged by a previous run of the same consumer are
//! re-read before any new entry.

use crate::config::StreamConfig;
use crate::error::StreamError;
use crate::event::{PAYLOAD_FIELD, StreamEvent};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisResult};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

type EntryFields = Option<Vec<(String, String)>>;
type StreamEntries = Vec<(String, EntryFields)>;
type ReadReply = Vec<(String, StreamEntries)>;

/// Stream consumer for Redis operations
pub struct StreamConsumer {
    redis: ConnectionManager,
    config: StreamConfig,
    /// Set once the pending list has been read back empty
    pending_drained: AtomicBool,
}

impl StreamConsumer {
    /// Create a new StreamConsumer
    ///
    /// `redis` must be a connection of its own, opened with
    /// [`connect_consumer`](crate::connect_consumer) for the same `config`.
    pub fn new(redis: ConnectionManager, config: StreamConfig) -> Self {
        Self {
            redis,
            config,
            pending_drained: AtomicBool::new(false),
        }
    }

    /// Get the stream name
    pub fn stream_name(&self) -> &str {
        &self.config.stream_name
    }

    /// Get the consumer group
    pub fn consumer_group(&self) -> &str {
        &self.config.consumer_group
    }

    /// Get the consumer ID
    pub fn consumer_id(&self) -> &str {
        &self.config.consumer_id
    }

    /// Create the consumer group if it doesn't exist.
    ///
    /// A new group starts at `$`: only entries added after the group was
    /// created are delivered.
    pub async fn ensure_consumer_group(&self) -> Result<(), StreamError> {
        let mut conn = self.redis.clone();

        let result: RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match result {
            Ok(_) => {
                info!(
                    stream = %self.config.stream_name,
                    group = %self.config.consumer_group,
                    "Created consumer group"
                );
            }
            Err(e) if e.to_string().contains("BUSYGROUP") => {
                debug!(
                    stream = %self.config.stream_name,
                    group = %self.config.consumer_group,
                    "Consumer group already exists"
                );
            }
            Err(e) => return Err(StreamError::Redis(e)),
        }

        Ok(())
    }

    /// Read the oldest entry delivered to this consumer but never acknowledged
    pub async fn read_pending(&self) -> Result<Option<StreamEvent>, StreamError> {
        let mut conn = self.redis.clone();

        let reply: ReadReply = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(&self.config.consumer_id)
            .arg("COUNT")
            .arg(1)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg("0")
            .query_async(&mut conn)
            .await?;

        Ok(self.first_event(reply).map(StreamEvent::redelivered))
    }

    /// Read the next new entry, blocking up to the configured timeout
    pub async fn read_new(&self) -> Result<Option<StreamEvent>, StreamError> {
        let mut conn = self.redis.clone();

        let mut cmd = redis::cmd("XREADGROUP");
        cmd.arg("GROUP")
            .arg(&self.config.consumer_group)
            .arg(&self.config.consumer_id);

        if let Some(timeout) = self.config.block_timeout_ms {
            cmd.arg("BLOCK").arg(timeout);
        }

        cmd.arg("COUNT")
            .arg(1)
            .arg("STREAMS")
            .arg(&self.config.stream_name)
            .arg(">");

        let reply: Option<ReadReply> = cmd.query_async(&mut conn).await?;

        Ok(reply.and_then(|r| self.first_event(r)))
    }

    /// Receive the next entry: own pending entries first, then new ones.
    ///
    /// Returns `Ok(None)` when the blocking read timed out without an entry.
    pub async fn next_event(&self) -> Result<Option<StreamEvent>, StreamError> {
        if !self.pending_drained.load(Ordering::Acquire) {
            match self.read_pending().await? {
                Some(event) => {
                    warn!(
                        stream_id = %event.stream_id,
                        stream = %self.config.stream_name,
                        age_ms = event.age_ms(),
                        "Re-reading unacknowledged entry"
                    );
                    return Ok(Some(event));
                }
                None => self.pending_drained.store(true, Ordering::Release),
            }
        }

        match self.read_new().await {
            Ok(event) => Ok(event),
            Err(e) if e.is_timeout() => {
                // The server may have delivered an entry after the client gave up;
                // it now sits in our pending list.
                debug!("Blocking read timed out on the client, rechecking pending entries");
                self.pending_drained.store(false, Ordering::Release);
                Ok(None)
            }
            Err(e) if e.is_nogroup_error() => {
                warn!(
                    stream = %self.config.stream_name,
                    group = %self.config.consumer_group,
                    "Consumer group missing, recreating"
                );
                self.ensure_consumer_group().await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Acknowledge an entry
    pub async fn ack_id(&self, stream_id: &str) -> Result<(), StreamError> {
        let mut conn = self.redis.clone();

        let _: i64 = redis::cmd("XACK")
            .arg(&self.config.stream_name)
            .arg(&self.config.consumer_group)
            .arg(stream_id)
            .query_async(&mut conn)
            .await?;

        debug!(stream_id = %stream_id, "Acknowledged entry");
        Ok(())
    }

    /// Take the first entry of an XREADGROUP reply
    fn first_event(&self, reply: ReadReply) -> Option<StreamEvent> {
        reply
            .into_iter()
            .flat_map(|(_stream, entries)| entries)
            .next()
            .map(|(stream_id, fields)| self.to_event(stream_id, fields))
    }

    /// Build an event from raw entry fields.
    ///
    /// An entry without a payload field (or one trimmed from the stream while
    /// pending) yields an empty payload, which the handler rejects as a schema
    /// error.
    fn to_event(&self, stream_id: String, fields: EntryFields) -> StreamEvent {
        let fields = fields.unwrap_or_default();
        let payload = fields
            .iter()
            .find(|(k, _)| k == PAYLOAD_FIELD)
            .map(|(_, v)| v.clone());

        match payload {
            Some(payload) => StreamEvent::new(stream_id, payload),
            None => {
                warn!(
                    stream_id = %stream_id,
                    fields = ?fields.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
                    "Missing '{}' field in entry", PAYLOAD_FIELD
                );
                StreamEvent::new(stream_id, String::new())
            }
        }
    }
}

/// Stream length and pending count for a consumer group
pub(crate) async fn stream_info(
    mut conn: ConnectionManager,
    stream_name: &str,
    consumer_group: &str,
) -> Result<StreamInfo, StreamError> {
    let length: i64 = conn.xlen(stream_name).await?;

    let pending: RedisResult<(i64, Option<String>, Option<String>, Option<Vec<(String, i64)>>)> =
        redis::cmd("XPENDING")
            .arg(stream_name)
            .arg(consumer_group)
            .query_async(&mut conn)
            .await;

    let pending_count = pending.map(|(count, _, _, _)| count).unwrap_or(0);

    Ok(StreamInfo {
        stream_name: stream_name.to_string(),
        length,
        pending_count,
        consumer_group: consumer_group.to_string(),
    })
}

/// Stream information
#[derive(Debug, Clone, serde::Serialize)]
pub struct StreamInfo {
    pub stream_name: String,
    pub length: i64,
    pub pending_count: i64,
    pub consumer_group: String,
}
