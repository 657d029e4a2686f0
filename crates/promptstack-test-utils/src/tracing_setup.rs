//! Tracing initialisation for tests.
//!
//! The subscriber is installed at most once per process, so every test may
//! call these helpers.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset: engine decisions at debug,
/// everything else at warn.
const DEFAULT_TEST_FILTER: &str = "warn,promptstack_core=debug";

/// Install a subscriber that writes through the test harness and honours
/// `RUST_LOG`.
///
/// ```ignore
/// #[tokio::test]
/// async fn apply_logs_conflicts() {
///     promptstack_test_utils::init_test_tracing();
///     // ...
/// }
/// ```
pub fn init_test_tracing() {
    init_test_tracing_with(DEFAULT_TEST_FILTER);
}

/// Like [`init_test_tracing`] with an explicit fallback filter.
pub fn init_test_tracing_with(fallback: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
