use serde::Deserialize;

/// Tunables for a queue handle, deserializable from TOML.
///
/// Every field falls back to its documented default when absent, so a host
/// application can embed a partial `[queue]` table in its own config file.
/// The same knobs are exposed as `with_*` builder methods on
/// [`DelayQueue`](crate::DelayQueue).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueueOptions {
    /// Period of the consumer ticker in milliseconds.
    pub fetch_interval_ms: u64,
    /// Ack deadline added to the current time when a message is handed to the
    /// callback. A message not acked within this window is retried.
    pub max_consume_duration_ms: u64,
    /// Max messages drained per ready/retry loop per tick.
    pub fetch_limit: u32,
    /// Remaining retries for messages sent without a per-message override.
    pub default_retry_count: u32,
    /// Extra payload TTL beyond the delivery delay, in milliseconds. A payload
    /// that outlives this window is dropped without a delivery attempt.
    pub msg_ttl_ms: u64,
}

impl QueueOptions {
    pub const DEFAULT_FETCH_INTERVAL_MS: u64 = 1_000;
    pub const DEFAULT_MAX_CONSUME_DURATION_MS: u64 = 5_000;
    /// Effectively unbounded.
    pub const DEFAULT_FETCH_LIMIT: u32 = i32::MAX as u32;
    pub const DEFAULT_RETRY_COUNT: u32 = 3;
    /// One hour.
    pub const DEFAULT_MSG_TTL_MS: u64 = 3_600_000;
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            fetch_interval_ms: Self::DEFAULT_FETCH_INTERVAL_MS,
            max_consume_duration_ms: Self::DEFAULT_MAX_CONSUME_DURATION_MS,
            fetch_limit: Self::DEFAULT_FETCH_LIMIT,
            default_retry_count: Self::DEFAULT_RETRY_COUNT,
            msg_ttl_ms: Self::DEFAULT_MSG_TTL_MS,
        }
    }
}
