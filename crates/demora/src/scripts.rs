//! Lua scripts for the atomic state transitions.
//!
//! Redis runs a script to completion without interleaving other commands on
//! the same keys, which is the only atomicity these transitions need. Key
//! names are always passed through `KEYS`; no script computes a key name
//! internally, so the payload keys (unknown before execution) are handled by
//! parking condemned ids in the garbage set and draining it outside a script.

use redis::Script;

/// KEYS[1] = pending zset, KEYS[2] = ready list. ARGV[1] = now (unix seconds).
///
/// Every id with a delivery score <= now moves to the ready list in ascending
/// score order. LPUSH in that order plus RPOP on the consumer side gives FIFO
/// within the batch.
const PENDING_TO_READY: &str = r#"
local msgs = redis.call('ZRANGEBYSCORE', KEYS[1], '0', ARGV[1])
if (#msgs == 0) then return end
local push = {'LPUSH', KEYS[2]}
for _, id in ipairs(msgs) do
    table.insert(push, id)
end
redis.call(unpack(push))
redis.call('ZREMRANGEBYSCORE', KEYS[1], '0', ARGV[1])
"#;

/// KEYS[1] = source list (ready or retry), KEYS[2] = unack zset.
/// ARGV[1] = ack deadline (unix seconds).
///
/// Pops one id and registers its deadline; nil when the source is drained.
/// One message per invocation keeps back-pressure with the caller.
const POP_TO_UNACK: &str = r#"
local id = redis.call('RPOP', KEYS[1])
if (not id) then return end
redis.call('ZADD', KEYS[2], ARGV[1], id)
return id
"#;

/// KEYS[1] = unack zset, KEYS[2] = retry-count hash, KEYS[3] = retry list,
/// KEYS[4] = garbage set. ARGV[1] = now (unix seconds).
///
/// Ids whose ack deadline elapsed either re-enter the retry list (budget
/// decremented in place) or move to the garbage set (budget spent or entry
/// missing). The per-id decision and move commit together with the final
/// sweep of the unack zset.
const UNACK_TO_RETRY: &str = r#"
local msgs = redis.call('ZRANGEBYSCORE', KEYS[1], '0', ARGV[1])
if (#msgs == 0) then return end
local counts = redis.call('HMGET', KEYS[2], unpack(msgs))
for i, count in ipairs(counts) do
    local id = msgs[i]
    local remaining = tonumber(count)
    if remaining and remaining > 0 then
        redis.call('HINCRBY', KEYS[2], id, -1)
        redis.call('LPUSH', KEYS[3], id)
    else
        redis.call('HDEL', KEYS[2], id)
        redis.call('SADD', KEYS[4], id)
    end
end
redis.call('ZREMRANGEBYSCORE', KEYS[1], '0', ARGV[1])
"#;

/// The transition scripts for one consumer, built once at startup.
///
/// `redis::Script` invokes EVALSHA and reloads on NOSCRIPT, so each body is
/// sent at most once per server restart.
pub(crate) struct Scripts {
    pub pending_to_ready: Script,
    pub pop_to_unack: Script,
    pub unack_to_retry: Script,
}

impl Scripts {
    pub fn new() -> Self {
        Self {
            pending_to_ready: Script::new(PENDING_TO_READY),
            pop_to_unack: Script::new(POP_TO_UNACK),
            unack_to_retry: Script::new(UNACK_TO_RETRY),
        }
    }
}
