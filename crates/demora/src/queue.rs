use std::sync::Arc;
use std::time::{Duration, SystemTime};

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use crate::clock;
use crate::config::QueueOptions;
use crate::consumer::Consumer;
use crate::error::SendError;
use crate::keys::QueueKeys;
use crate::scripts::Scripts;

/// Handler invoked for each delivered payload.
///
/// Returning `true` acknowledges the message; `false` requests redelivery,
/// subject to the message's retry budget. The callback runs serially on the
/// consumer task and is never invoked concurrently for one queue handle.
pub type Callback = Arc<dyn Fn(&[u8]) -> bool + Send + Sync>;

/// Per-message overrides for a single send.
#[derive(Debug, Clone, Copy, Default)]
pub struct SendOptions {
    retry_count: Option<u32>,
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the handle's default retry count for this message.
    pub fn with_retry_count(mut self, count: u32) -> Self {
        self.retry_count = Some(count);
        self
    }

    pub(crate) fn retry_count(&self) -> Option<u32> {
        self.retry_count
    }
}

/// A handle to one logical delayed-message queue.
///
/// Producers call [`send_delay_msg`](Self::send_delay_msg) or
/// [`send_schedule_msg`](Self::send_schedule_msg) from any task; the handle
/// performs only remote writes and keeps no in-process message state.
/// [`start_consume`](Self::start_consume) spawns the single background task
/// that drives delivery. Multiple processes may hold handles to the same
/// queue name concurrently; all state transitions are atomic on the Redis
/// side.
pub struct DelayQueue {
    name: String,
    conn: ConnectionManager,
    callback: Callback,
    keys: QueueKeys,
    fetch_interval: Duration,
    max_consume_duration: Duration,
    fetch_limit: u32,
    default_retry_count: u32,
    msg_ttl: Duration,
    started: bool,
    shutdown: Option<oneshot::Sender<()>>,
}

impl DelayQueue {
    /// Create a handle for the queue `name`.
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    pub fn new(
        name: impl Into<String>,
        conn: ConnectionManager,
        callback: impl Fn(&[u8]) -> bool + Send + Sync + 'static,
    ) -> Self {
        let name = name.into();
        assert!(!name.is_empty(), "queue name is required");
        let keys = QueueKeys::new(&name);
        Self {
            name,
            conn,
            callback: Arc::new(callback),
            keys,
            fetch_interval: Duration::from_millis(QueueOptions::DEFAULT_FETCH_INTERVAL_MS),
            max_consume_duration: Duration::from_millis(
                QueueOptions::DEFAULT_MAX_CONSUME_DURATION_MS,
            ),
            fetch_limit: QueueOptions::DEFAULT_FETCH_LIMIT,
            default_retry_count: QueueOptions::DEFAULT_RETRY_COUNT,
            msg_ttl: Duration::from_millis(QueueOptions::DEFAULT_MSG_TTL_MS),
            started: false,
            shutdown: None,
        }
    }

    /// The queue name this handle was constructed with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Apply a full options block, e.g. one deserialized from a config file.
    pub fn with_options(mut self, opts: QueueOptions) -> Self {
        self.fetch_interval = Duration::from_millis(opts.fetch_interval_ms);
        self.max_consume_duration = Duration::from_millis(opts.max_consume_duration_ms);
        self.fetch_limit = opts.fetch_limit;
        self.default_retry_count = opts.default_retry_count;
        self.msg_ttl = Duration::from_millis(opts.msg_ttl_ms);
        self
    }

    /// Period of the consumer ticker.
    pub fn with_fetch_interval(mut self, interval: Duration) -> Self {
        self.fetch_interval = interval;
        self
    }

    /// Ack deadline granted to the callback. A message not acked within this
    /// window after hand-off is retried.
    pub fn with_max_consume_duration(mut self, duration: Duration) -> Self {
        self.max_consume_duration = duration;
        self
    }

    /// Max messages drained per ready/retry loop per tick.
    pub fn with_fetch_limit(mut self, limit: u32) -> Self {
        self.fetch_limit = limit;
        self
    }

    /// Retry count for messages sent without a per-message override.
    pub fn with_default_retry_count(mut self, count: u32) -> Self {
        self.default_retry_count = count;
        self
    }

    /// Extra payload TTL beyond the delivery delay.
    pub fn with_msg_ttl(mut self, ttl: Duration) -> Self {
        self.msg_ttl = ttl;
        self
    }

    /// Schedule a message for delivery at or after `deliver_at`.
    ///
    /// Returns the generated message id. A `deliver_at` in the past yields
    /// immediate delivery on the next tick.
    pub async fn send_schedule_msg(
        &self,
        payload: impl Into<Vec<u8>>,
        deliver_at: SystemTime,
    ) -> Result<String, SendError> {
        self.send_schedule_msg_with(payload, deliver_at, SendOptions::default())
            .await
    }

    /// [`send_schedule_msg`](Self::send_schedule_msg) with per-message options.
    pub async fn send_schedule_msg_with(
        &self,
        payload: impl Into<Vec<u8>>,
        deliver_at: SystemTime,
        opts: SendOptions,
    ) -> Result<String, SendError> {
        let retry_count = opts.retry_count().unwrap_or(self.default_retry_count);
        let id = Uuid::new_v4().to_string();
        let deliver_at_secs = clock::unix_seconds(deliver_at);
        let mut conn = self.conn.clone();

        // Three independent writes: payload, retry budget, pending entry.
        // A crash between them leaves no id reachable from a position key.
        let ttl_ms = payload_ttl_ms(deliver_at, SystemTime::now(), self.msg_ttl);
        let _: () = conn
            .pset_ex(self.keys.msg(&id), payload.into(), ttl_ms)
            .await
            .map_err(SendError::StorePayload)?;
        let _: () = conn
            .hset(&self.keys.retry_count, &id, retry_count)
            .await
            .map_err(SendError::StoreRetryCount)?;
        let _: () = conn
            .zadd(&self.keys.pending, &id, deliver_at_secs)
            .await
            .map_err(SendError::StorePending)?;

        debug!(queue = %self.name, msg_id = %id, deliver_at = deliver_at_secs, "message scheduled");
        Ok(id)
    }

    /// Schedule a message for delivery after `delay` from now.
    pub async fn send_delay_msg(
        &self,
        payload: impl Into<Vec<u8>>,
        delay: Duration,
    ) -> Result<String, SendError> {
        self.send_schedule_msg(payload, SystemTime::now() + delay)
            .await
    }

    /// [`send_delay_msg`](Self::send_delay_msg) with per-message options.
    pub async fn send_delay_msg_with(
        &self,
        payload: impl Into<Vec<u8>>,
        delay: Duration,
        opts: SendOptions,
    ) -> Result<String, SendError> {
        self.send_schedule_msg_with(payload, SystemTime::now() + delay, opts)
            .await
    }

    /// Spawn the background consumer task.
    ///
    /// The task runs one consumption cycle per fetch interval until
    /// [`stop_consume`](Self::stop_consume) is called or the handle is
    /// dropped. Cycle errors are logged and do not terminate the task. The
    /// returned handle resolves once the consumer has fully stopped.
    ///
    /// # Panics
    ///
    /// Panics on a second call; a handle drives at most one consumer over its
    /// lifetime.
    pub fn start_consume(&mut self) -> JoinHandle<()> {
        assert!(!self.started, "consumer already started for this handle");
        self.started = true;

        let (tx, rx) = oneshot::channel();
        self.shutdown = Some(tx);
        let consumer = Consumer {
            queue: self.name.clone(),
            keys: self.keys.clone(),
            conn: self.conn.clone(),
            callback: Arc::clone(&self.callback),
            scripts: Scripts::new(),
            fetch_interval: self.fetch_interval,
            max_consume_duration: self.max_consume_duration,
            fetch_limit: self.fetch_limit,
        };
        tokio::spawn(consumer.run(rx))
    }

    /// Signal the consumer task to stop after the in-flight cycle, if any.
    ///
    /// Idempotent; calling it without a running consumer is a no-op.
    pub fn stop_consume(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// TTL for a payload record: the remaining delivery delay plus the configured
/// extra TTL, clamped to the store's minimum of one millisecond. A deliver-at
/// so far in the past that the whole window has already elapsed still gets the
/// write (the store rejects a non-positive `PX`), so a genuine store failure
/// surfaces to the caller; the payload expires immediately and the message
/// settles through the missing-payload path.
fn payload_ttl_ms(deliver_at: SystemTime, now: SystemTime, msg_ttl: Duration) -> u64 {
    let delay_ms: i128 = match deliver_at.duration_since(now) {
        Ok(d) => d.as_millis() as i128,
        Err(e) => -(e.duration().as_millis() as i128),
    };
    let ttl_ms = delay_ms + msg_ttl.as_millis() as i128;
    ttl_ms.max(1) as u64
}
