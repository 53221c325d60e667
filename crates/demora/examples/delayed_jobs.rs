//! Delayed job delivery example.
//!
//! Schedules a handful of messages with different delays and watches them
//! arrive. Messages become visible to the consumer only once their delivery
//! time has passed, regardless of send order.
//!
//! ## Prerequisites
//!
//! A redis-server reachable at `redis://127.0.0.1:6379/` (override with
//! `REDIS_URL`). Then run:
//!
//! ```sh
//! cargo run --example delayed_jobs
//! ```

use std::time::{Duration, Instant};

use demora::DelayQueue;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    demora::telemetry::init_tracing();

    let url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/".to_string());
    let client = redis::Client::open(url)?;
    let conn = redis::aio::ConnectionManager::new(client).await?;

    let start = Instant::now();
    let mut queue = DelayQueue::new("delayed-jobs-demo", conn, move |payload: &[u8]| {
        println!(
            "  +{:.1}s  delivered: {}",
            start.elapsed().as_secs_f64(),
            String::from_utf8_lossy(payload)
        );
        true
    })
    .with_fetch_interval(Duration::from_millis(200));

    // Send in reverse delay order; arrival follows the delivery times.
    println!("Scheduling jobs with 3s, 2s, and 1s delays...");
    for delay_secs in [3u64, 2, 1] {
        queue
            .send_delay_msg(
                format!("job with {delay_secs}s delay").into_bytes(),
                Duration::from_secs(delay_secs),
            )
            .await?;
    }

    let done = queue.start_consume();
    tokio::time::sleep(Duration::from_secs(5)).await;
    queue.stop_consume();
    done.await?;

    println!("All jobs delivered.");
    Ok(())
}
