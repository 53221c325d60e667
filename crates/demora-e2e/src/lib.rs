//! End-to-end tests for demora live in `tests/`.
//!
//! They exercise a real redis-server and are `#[ignore]`d by default:
//!
//! ```sh
//! redis-server --daemonize yes
//! cargo test -p demora-e2e -- --ignored
//! ```
