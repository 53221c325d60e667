use std::time::Duration;

use redis::aio::ConnectionManager;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::error::ConsumeError;
use crate::keys::QueueKeys;
use crate::queue::Callback;
use crate::scripts::Scripts;

/// Which list a drain loop pulls from.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Source {
    Ready,
    Retry,
}

/// The long-lived consumer state, moved into the background task by
/// `DelayQueue::start_consume`.
///
/// All mutation of queue state happens through the remote transitions in
/// `transitions.rs`; the consumer itself holds no message state.
pub(crate) struct Consumer {
    pub(crate) queue: String,
    pub(crate) keys: QueueKeys,
    pub(crate) conn: ConnectionManager,
    pub(crate) callback: Callback,
    pub(crate) scripts: Scripts,
    pub(crate) fetch_interval: Duration,
    pub(crate) max_consume_duration: Duration,
    pub(crate) fetch_limit: u32,
}

impl Consumer {
    /// Tick loop. One consumption cycle per fetch interval; cycle errors are
    /// logged and swallowed so the task survives transient store outages.
    ///
    /// Shutdown is observed only between cycles, so an in-flight cycle
    /// (including its callback) always completes. The receiver also resolves
    /// when the handle is dropped without an explicit stop.
    pub(crate) async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.fetch_interval);
        // A callback outliving the tick period must not produce a burst of
        // catch-up cycles afterwards.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(queue = %self.queue, "consumer started");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.consume().await {
                        error!(queue = %self.queue, error = %e, "consume cycle failed");
                    }
                }
            }
        }
        info!(queue = %self.queue, "consumer stopped");
    }

    /// One consumption cycle:
    /// pending→ready, ready drain, unack sweep, garbage collect, retry drain.
    ///
    /// Any error aborts the cycle; the next tick starts over from the top.
    async fn consume(&mut self) -> Result<(), ConsumeError> {
        self.pending_to_ready().await?;
        self.drain(Source::Ready).await?;
        self.unack_to_retry().await?;
        self.garbage_collect().await?;
        self.drain(Source::Retry).await?;
        Ok(())
    }

    /// Pull messages from one list until it is empty or `fetch_limit` is
    /// reached. The ready and retry drains each get a fresh counter.
    async fn drain(&mut self, source: Source) -> Result<(), ConsumeError> {
        let mut fetched = 0u32;
        while fetched < self.fetch_limit {
            let Some(id) = self.pop_to_unack(source).await? else {
                break;
            };
            fetched += 1;
            self.deliver(&id).await?;
        }
        Ok(())
    }

    /// Hand one message to the callback and settle it.
    ///
    /// A missing payload means its TTL elapsed; the message is acked without
    /// a delivery attempt so it cannot retry forever.
    async fn deliver(&mut self, id: &str) -> Result<(), ConsumeError> {
        let handled = match self.fetch_payload(id).await? {
            Some(payload) => (self.callback)(&payload),
            None => {
                debug!(queue = %self.queue, msg_id = %id, "payload expired, acking without delivery");
                true
            }
        };
        if handled {
            self.ack(id).await
        } else {
            debug!(queue = %self.queue, msg_id = %id, "callback rejected message");
            self.nack(id).await
        }
    }
}
