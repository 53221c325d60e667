//! Redis key derivation for a queue.
//!
//! All durable state lives under the `dp:` prefix: six fixed keys per queue
//! plus one payload key per live message. A message id appears in exactly one
//! of the position keys (`pending`, `ready`, `unack`, `retry`, `garbage`) at
//! any committed point in time.

/// Shared prefix for every key this crate writes.
const PREFIX: &str = "dp";

/// The backing keys for one queue, derived once at construction.
#[derive(Debug, Clone)]
pub(crate) struct QueueKeys {
    /// zset: member = message id, score = delivery time in unix seconds.
    pub pending: String,
    /// list: ids past their delivery time, awaiting pickup.
    pub ready: String,
    /// zset: member = message id, score = ack deadline in unix seconds.
    pub unack: String,
    /// list: ids whose ack deadline elapsed with retry budget remaining.
    pub retry: String,
    /// hash: message id -> remaining retries.
    pub retry_count: String,
    /// set: ids with exhausted budget, awaiting payload deletion.
    pub garbage: String,
    msg_prefix: String,
}

impl QueueKeys {
    pub fn new(name: &str) -> Self {
        Self {
            pending: format!("{PREFIX}:{name}:pending"),
            ready: format!("{PREFIX}:{name}:ready"),
            unack: format!("{PREFIX}:{name}:unack"),
            retry: format!("{PREFIX}:{name}:retry"),
            retry_count: format!("{PREFIX}:{name}:retry:cnt"),
            garbage: format!("{PREFIX}:{name}:garbage"),
            msg_prefix: format!("{PREFIX}:{name}:msg:"),
        }
    }

    /// Payload key for one message: `dp:<queue>:msg:<id>`.
    pub fn msg(&self, id: &str) -> String {
        format!("{}{id}", self.msg_prefix)
    }
}
