//! Test suite wiring and shared helpers.

mod stress;

use std::time::{Duration, Instant};

/// Poll `predicate` until it holds or `timeout` passes. Returns the final
/// verdict, so callers can assert on it directly.
pub(crate) fn wait_until(timeout: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    predicate()
}

/// Generous deadline for anything that should happen "promptly".
pub(crate) const EVENTUALLY: Duration = Duration::from_secs(5);

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
