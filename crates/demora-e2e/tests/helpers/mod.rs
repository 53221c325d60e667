#![allow(dead_code)]

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Connect to the redis-server under test.
///
/// Reads `REDIS_URL`, defaulting to the conventional local instance.
pub async fn redis_conn() -> ConnectionManager {
    let url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/".to_string());
    let client = redis::Client::open(url).expect("valid redis url");
    ConnectionManager::new(client)
        .await
        .expect("connect to redis-server (is one running?)")
}

/// A queue name that cannot collide across tests or runs.
pub fn unique_queue(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

/// The persisted key layout for one queue. Spelled out independently of the
/// library so these tests pin the on-store contract.
pub struct RawKeys {
    pub pending: String,
    pub ready: String,
    pub unack: String,
    pub retry: String,
    pub retry_count: String,
    pub garbage: String,
    msg_prefix: String,
}

impl RawKeys {
    pub fn new(queue: &str) -> Self {
        Self {
            pending: format!("dp:{queue}:pending"),
            ready: format!("dp:{queue}:ready"),
            unack: format!("dp:{queue}:unack"),
            retry: format!("dp:{queue}:retry"),
            retry_count: format!("dp:{queue}:retry:cnt"),
            garbage: format!("dp:{queue}:garbage"),
            msg_prefix: format!("dp:{queue}:msg:"),
        }
    }

    pub fn msg(&self, id: &str) -> String {
        format!("{}{id}", self.msg_prefix)
    }
}

/// Records every payload handed to a callback.
#[derive(Clone, Default)]
pub struct Deliveries {
    payloads: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl Deliveries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, payload: &[u8]) {
        self.payloads.lock().unwrap().push(payload.to_vec());
    }

    pub fn count(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }

    pub fn all(&self) -> Vec<Vec<u8>> {
        self.payloads.lock().unwrap().clone()
    }
}

pub async fn zset_len(conn: &mut ConnectionManager, key: &str) -> i64 {
    conn.zcard(key).await.expect("zcard")
}

pub async fn list_len(conn: &mut ConnectionManager, key: &str) -> i64 {
    conn.llen(key).await.expect("llen")
}

pub async fn hash_field(
    conn: &mut ConnectionManager,
    key: &str,
    field: &str,
) -> Option<String> {
    conn.hget(key, field).await.expect("hget")
}

pub async fn set_members(conn: &mut ConnectionManager, key: &str) -> Vec<String> {
    conn.smembers(key).await.expect("smembers")
}

pub async fn key_exists(conn: &mut ConnectionManager, key: &str) -> bool {
    conn.exists(key).await.expect("exists")
}

pub async fn zset_score(conn: &mut ConnectionManager, key: &str, member: &str) -> Option<f64> {
    conn.zscore(key, member).await.expect("zscore")
}

/// Poll a condition until it holds or the deadline passes.
pub async fn wait_for<F>(mut cond: F, timeout: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

/// Poll an async condition until it holds or the deadline passes.
pub async fn wait_for_async<F, Fut>(mut cond: F, timeout: Duration) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

/// Wait until a message has been fully settled by ack or garbage collection.
///
/// The budget entry is the last thing an ack removes, so once it is gone the
/// payload deletion has already happened.
pub async fn wait_settled(
    conn: &ConnectionManager,
    keys: &RawKeys,
    id: &str,
    timeout: Duration,
) -> bool {
    wait_for_async(
        || {
            let mut c = conn.clone();
            let budget_key = keys.retry_count.clone();
            let msg_key = keys.msg(id);
            let msg_id = id.to_string();
            async move {
                hash_field(&mut c, &budget_key, &msg_id).await.is_none()
                    && !key_exists(&mut c, &msg_key).await
            }
        },
        timeout,
    )
    .await
}

/// Assert that no lifecycle state remains for a settled message.
pub async fn assert_state_clean(conn: &mut ConnectionManager, keys: &RawKeys, id: &str) {
    assert_eq!(zset_len(conn, &keys.pending).await, 0, "pending not empty");
    assert_eq!(list_len(conn, &keys.ready).await, 0, "ready not empty");
    assert_eq!(zset_len(conn, &keys.unack).await, 0, "unack not empty");
    assert_eq!(list_len(conn, &keys.retry).await, 0, "retry not empty");
    assert_eq!(
        hash_field(conn, &keys.retry_count, id).await,
        None,
        "retry budget entry not removed"
    );
    assert!(
        set_members(conn, &keys.garbage).await.is_empty(),
        "garbage not drained"
    );
    assert!(
        !key_exists(conn, &keys.msg(id)).await,
        "payload key not deleted"
    );
}
