/// Development helper: initialize tracing subscriber when `RUST_LOG` is set.
///
/// Tests, benches and examples call `zbaton::dev_tracing::init_tracing()` to
/// see the `[SOCKET]`, `[REACTOR]`, `[WAITER]` and `[ENGINE]` events. This is
/// a no-op when `RUST_LOG` is not set or a global subscriber is already
/// installed.
pub fn init_tracing() {
    use std::env;

    if env::var("RUST_LOG").is_ok() {
        // Best-effort: several tests in one binary all call this.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_thread_names(true)
            .try_init();
    }
}
