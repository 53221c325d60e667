//! Wall-clock helpers.
//!
//! Delivery times and ack deadlines are scored in unix seconds; payload TTLs
//! use millisecond precision. Everything reads the system clock, which is the
//! single time source shared with other processes consuming the same queue.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in unix seconds.
pub(crate) fn unix_now() -> i64 {
    unix_seconds(SystemTime::now())
}

/// Unix seconds for an arbitrary `SystemTime`. Times before the epoch map to
/// negative values so score arithmetic stays well-defined.
pub(crate) fn unix_seconds(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}
