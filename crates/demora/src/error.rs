/// Errors surfaced synchronously to a producer by the `send_*` operations.
///
/// The three writes of a send are not atomic; each failure names the write
/// that aborted the sequence. An orphan payload record expires on its own and
/// an orphan retry-count entry is never read, so a partial send leaves no
/// reachable message.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("store msg failed: {0}")]
    StorePayload(#[source] redis::RedisError),

    #[error("store retry count failed: {0}")]
    StoreRetryCount(#[source] redis::RedisError),

    #[error("push to pending failed: {0}")]
    StorePending(#[source] redis::RedisError),
}

/// Errors from one consumption cycle.
///
/// The consumer task logs these and aborts the current cycle; the next tick
/// retries from the top. A payload read that finds nothing and a pop that
/// returns nothing are not errors.
#[derive(Debug, thiserror::Error)]
pub enum ConsumeError {
    #[error("pending-to-ready script failed: {0}")]
    PendingToReady(#[source] redis::RedisError),

    #[error("ready-to-unack script failed: {0}")]
    ReadyToUnack(#[source] redis::RedisError),

    #[error("unack-to-retry script failed: {0}")]
    UnackToRetry(#[source] redis::RedisError),

    #[error("garbage collect failed: {0}")]
    GarbageCollect(#[source] redis::RedisError),

    #[error("get message payload failed: {0}")]
    FetchPayload(#[source] redis::RedisError),

    #[error("remove from unack failed: {0}")]
    Ack(#[source] redis::RedisError),

    #[error("negative ack failed: {0}")]
    Nack(#[source] redis::RedisError),

    /// The pop script returned something other than nil or a message id.
    /// Indicates a store-side protocol violation.
    #[error("illegal result: {0:?}")]
    IllegalResult(redis::Value),
}
