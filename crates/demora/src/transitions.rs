//! The remote state transitions.
//!
//! Each transition is one round-trip to Redis: a script invocation where the
//! transition must observe-and-move atomically, a plain command where
//! per-command atomicity suffices. All of them are driven from the consumer
//! cycle; none keeps local state between calls.

use std::time::SystemTime;

use redis::{AsyncCommands, Value};
use tracing::debug;

use crate::clock;
use crate::consumer::{Consumer, Source};
use crate::error::ConsumeError;

impl Consumer {
    /// Move every message whose delivery time has arrived from the pending
    /// zset to the tail of the ready list.
    pub(crate) async fn pending_to_ready(&mut self) -> Result<(), ConsumeError> {
        let mut invocation = self.scripts.pending_to_ready.prepare_invoke();
        invocation
            .key(&self.keys.pending)
            .key(&self.keys.ready)
            .arg(clock::unix_now());
        let result: Result<(), _> = invocation.invoke_async(&mut self.conn).await;
        result.map_err(ConsumeError::PendingToReady)
    }

    /// Pop one id from the ready or retry list into the unack zset, scored
    /// with a fresh ack deadline. `None` means the source list is drained.
    pub(crate) async fn pop_to_unack(
        &mut self,
        source: Source,
    ) -> Result<Option<String>, ConsumeError> {
        let source_key = match source {
            Source::Ready => &self.keys.ready,
            Source::Retry => &self.keys.retry,
        };
        // Truncate the absolute deadline, not the duration: sub-second
        // consume windows still land on the next whole second.
        let deadline = clock::unix_seconds(SystemTime::now() + self.max_consume_duration);
        let mut invocation = self.scripts.pop_to_unack.prepare_invoke();
        invocation.key(source_key).key(&self.keys.unack).arg(deadline);
        let value: Value = invocation
            .invoke_async(&mut self.conn)
            .await
            .map_err(ConsumeError::ReadyToUnack)?;
        match value {
            Value::Nil => Ok(None),
            Value::BulkString(raw) => match String::from_utf8(raw) {
                Ok(id) => Ok(Some(id)),
                Err(e) => Err(ConsumeError::IllegalResult(Value::BulkString(
                    e.into_bytes(),
                ))),
            },
            Value::SimpleString(id) => Ok(Some(id)),
            other => Err(ConsumeError::IllegalResult(other)),
        }
    }

    /// Sweep the unack zset: every id past its ack deadline re-enters the
    /// retry list if budget remains, otherwise moves to the garbage set.
    pub(crate) async fn unack_to_retry(&mut self) -> Result<(), ConsumeError> {
        let mut invocation = self.scripts.unack_to_retry.prepare_invoke();
        invocation
            .key(&self.keys.unack)
            .key(&self.keys.retry_count)
            .key(&self.keys.retry)
            .key(&self.keys.garbage)
            .arg(clock::unix_now());
        let result: Result<(), _> = invocation.invoke_async(&mut self.conn).await;
        result.map_err(ConsumeError::UnackToRetry)
    }

    /// Drain the garbage set: delete the payload keys of condemned ids, then
    /// remove the ids from the set.
    ///
    /// Runs outside a script because the payload key names are not known
    /// before the members are read. Safe concurrently with the unack sweep,
    /// which only ever adds to the set.
    pub(crate) async fn garbage_collect(&mut self) -> Result<(), ConsumeError> {
        let ids: Vec<String> = self
            .conn
            .smembers(&self.keys.garbage)
            .await
            .map_err(ConsumeError::GarbageCollect)?;
        if ids.is_empty() {
            return Ok(());
        }
        let msg_keys: Vec<String> = ids.iter().map(|id| self.keys.msg(id)).collect();
        let _: i64 = self
            .conn
            .del(msg_keys)
            .await
            .map_err(ConsumeError::GarbageCollect)?;
        let _: i64 = self
            .conn
            .srem(&self.keys.garbage, &ids)
            .await
            .map_err(ConsumeError::GarbageCollect)?;
        debug!(queue = %self.queue, collected = ids.len(), "garbage collected");
        Ok(())
    }

    /// Read a message payload. `None` means the TTL elapsed and the payload
    /// is gone; callers treat that as already handled.
    pub(crate) async fn fetch_payload(&mut self, id: &str) -> Result<Option<Vec<u8>>, ConsumeError> {
        self.conn
            .get(self.keys.msg(id))
            .await
            .map_err(ConsumeError::FetchPayload)
    }

    /// Acknowledge a delivered message: drop it from unack, then clean up its
    /// payload and budget entry.
    pub(crate) async fn ack(&mut self, id: &str) -> Result<(), ConsumeError> {
        let _: i64 = self
            .conn
            .zrem(&self.keys.unack, id)
            .await
            .map_err(ConsumeError::Ack)?;
        // The payload key has a TTL and the budget entry is unreachable once
        // the id leaves the position keys; failures here are ignored.
        let _: redis::RedisResult<i64> = self.conn.del(self.keys.msg(id)).await;
        let _: redis::RedisResult<i64> = self.conn.hdel(&self.keys.retry_count, id).await;
        debug!(queue = %self.queue, msg_id = %id, "message acked");
        Ok(())
    }

    /// Negatively acknowledge a delivered message: re-score it in unack to
    /// now, so the next unack sweep reclassifies it immediately.
    pub(crate) async fn nack(&mut self, id: &str) -> Result<(), ConsumeError> {
        let _: i64 = self
            .conn
            .zadd(&self.keys.unack, id, clock::unix_now())
            .await
            .map_err(ConsumeError::Nack)?;
        debug!(queue = %self.queue, msg_id = %id, "message nacked");
        Ok(())
    }
}
