//! Tracing initialisation helpers for tests.
//!
//! Call [`init_test_tracing`] at the top of any test whose rule evaluations
//! or registry transitions should show up in the test output.
//!
//! The subscriber is initialised at most once per process (idempotent), so it
//! is safe to call from every test function.

use tracing_subscriber::EnvFilter;

/// Initialise a tracing subscriber that writes to the test-harness writer
/// and respects the `RUST_LOG` environment variable (default: `warn`).
///
/// Safe to call multiple times; later calls are ignored.
///
/// # Example
///
/// ```ignore
/// #[test]
/// fn my_test() {
///     logrules_test_utils::tracing_setup::init_test_tracing();
///     // RUST_LOG=logrules_core=trace shows every cache invalidation
/// }
/// ```
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
