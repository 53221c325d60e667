mod helpers;

use std::time::{Duration, Instant, SystemTime};

use demora::{DelayQueue, SendOptions};
use helpers::*;

#[tokio::test]
#[ignore = "requires a running redis-server"]
async fn immediate_delivery_and_clean_state() {
    let mut conn = redis_conn().await;
    let queue_name = unique_queue("lifecycle");
    let keys = RawKeys::new(&queue_name);

    let deliveries = Deliveries::new();
    let recorder = deliveries.clone();
    let mut queue = DelayQueue::new(&queue_name, conn.clone(), move |payload: &[u8]| {
        recorder.push(payload);
        true
    })
    .with_fetch_interval(Duration::from_millis(50));

    let id = queue
        .send_delay_msg(b"A".to_vec(), Duration::ZERO)
        .await
        .expect("send");

    let done = queue.start_consume();

    assert!(
        wait_for(|| deliveries.count() == 1, Duration::from_secs(3)).await,
        "message was not delivered"
    );
    assert_eq!(deliveries.all(), vec![b"A".to_vec()]);

    // Ack runs right after the callback; once it lands, no trace of the
    // message remains.
    assert!(
        wait_settled(&conn, &keys, &id, Duration::from_secs(2)).await,
        "message was not settled by ack"
    );
    assert_state_clean(&mut conn, &keys, &id).await;

    queue.stop_consume();
    done.await.expect("consumer task");
}

#[tokio::test]
#[ignore = "requires a running redis-server"]
async fn scheduled_delivery_waits_for_its_time() {
    let conn = redis_conn().await;
    let queue_name = unique_queue("schedule");

    let deliveries = Deliveries::new();
    let recorder = deliveries.clone();
    let mut queue = DelayQueue::new(&queue_name, conn, move |payload: &[u8]| {
        recorder.push(payload);
        true
    })
    .with_fetch_interval(Duration::from_millis(50));

    let start = Instant::now();
    queue
        .send_schedule_msg(b"B".to_vec(), SystemTime::now() + Duration::from_secs(2))
        .await
        .expect("send");

    let done = queue.start_consume();

    // Not yet due. Delivery scores are whole unix seconds, so the earliest
    // possible hand-off is one second after send.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(deliveries.count(), 0, "delivered before its time");

    assert!(
        wait_for(|| deliveries.count() == 1, Duration::from_secs(4)).await,
        "message was not delivered"
    );
    assert!(
        start.elapsed() >= Duration::from_millis(950),
        "delivered too early: {:?}",
        start.elapsed()
    );
    assert_eq!(deliveries.all(), vec![b"B".to_vec()]);

    queue.stop_consume();
    done.await.expect("consumer task");
}

#[tokio::test]
#[ignore = "requires a running redis-server"]
async fn send_persists_payload_budget_and_pending_entry() {
    let mut conn = redis_conn().await;
    let queue_name = unique_queue("send");
    let keys = RawKeys::new(&queue_name);

    let queue = DelayQueue::new(&queue_name, conn.clone(), |_: &[u8]| true);

    let before = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as f64;
    let id = queue
        .send_delay_msg_with(
            b"X".to_vec(),
            Duration::from_secs(60),
            SendOptions::new().with_retry_count(5),
        )
        .await
        .expect("send");

    assert!(key_exists(&mut conn, &keys.msg(&id)).await, "payload missing");
    assert_eq!(
        hash_field(&mut conn, &keys.retry_count, &id).await.as_deref(),
        Some("5"),
        "retry budget not recorded"
    );
    let score = zset_score(&mut conn, &keys.pending, &id)
        .await
        .expect("pending entry missing");
    assert!(
        (score - (before + 60.0)).abs() < 3.0,
        "pending score {score} not near deliver-at"
    );
}

#[tokio::test]
#[ignore = "requires a running redis-server"]
async fn stop_consume_is_idempotent() {
    let conn = redis_conn().await;
    let queue_name = unique_queue("stop");

    let mut queue = DelayQueue::new(&queue_name, conn.clone(), |_: &[u8]| true);
    let done = queue.start_consume();
    queue.stop_consume();
    queue.stop_consume();
    tokio::time::timeout(Duration::from_secs(2), done)
        .await
        .expect("consumer did not stop")
        .expect("consumer task");

    // Stopping a handle that never started is a no-op.
    let mut idle = DelayQueue::new(&queue_name, conn, |_: &[u8]| true);
    idle.stop_consume();
}
