use tracing_subscriber::EnvFilter;

/// Default filter directives when `RUST_LOG` is unset.
const DEFAULT_DIRECTIVES: &str = "info";

/// Install a tracing subscriber suitable for binaries and test harnesses that
/// embed a queue handle.
///
/// The filter comes from `RUST_LOG`, falling back to [`DEFAULT_DIRECTIVES`].
/// Debug builds log human-readable lines with event targets; release builds
/// emit JSON for log aggregation.
///
/// Unlike a process-owned bootstrap this may race with the host application:
/// installation is best-effort, and whichever subscriber registers first wins.
/// Later calls (a second test, a host with its own subscriber already set up)
/// are no-ops, and the queue's events flow into the installed subscriber
/// unchanged.
pub fn init_tracing() {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(from_env) => from_env,
        Err(_) => EnvFilter::new(DEFAULT_DIRECTIVES),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let installed = if cfg!(debug_assertions) {
        builder.try_init()
    } else {
        builder.json().try_init()
    };
    // Err here means a subscriber is already registered; keep it.
    let _ = installed;
}
