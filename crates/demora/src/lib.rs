//! Delayed message delivery on top of Redis.
//!
//! A producer submits a payload with a wall-clock delivery time; at or after
//! that time the payload reaches a consumer callback, with at-least-once
//! delivery, bounded retries, and eventual garbage collection. All durable
//! state lives in Redis under six keys per queue, moved between lifecycle
//! states by atomic Lua scripts — so any number of processes can produce to
//! and consume from the same queue name.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use demora::DelayQueue;
//!
//! #[tokio::main]
//! async fn main() -> redis::RedisResult<()> {
//!     let client = redis::Client::open("redis://127.0.0.1:6379/")?;
//!     let conn = redis::aio::ConnectionManager::new(client).await?;
//!
//!     let mut queue = DelayQueue::new("orders", conn, |payload: &[u8]| {
//!         println!("delivered: {}", String::from_utf8_lossy(payload));
//!         true // ack; return false to request redelivery
//!     })
//!     .with_fetch_interval(Duration::from_millis(200));
//!
//!     let _id = queue
//!         .send_delay_msg(b"hello".to_vec(), Duration::from_secs(3))
//!         .await;
//!
//!     let done = queue.start_consume();
//!     tokio::time::sleep(Duration::from_secs(5)).await;
//!     queue.stop_consume();
//!     done.await.expect("consumer task");
//!     Ok(())
//! }
//! ```

mod clock;
mod config;
mod consumer;
mod error;
mod keys;
mod queue;
mod scripts;
pub mod telemetry;
mod transitions;

pub use config::QueueOptions;
pub use error::{ConsumeError, SendError};
pub use queue::{Callback, DelayQueue, SendOptions};

/// Re-export of the Redis client crate, so hosts can construct a
/// `ConnectionManager` against the exact version this crate links.
pub use redis;
