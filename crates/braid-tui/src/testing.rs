//! Test-harness helpers.

use std::time::Duration;

use crate::error::{BraidError, Result};
use crate::time::Clock;

/// Poll `condition` until it holds or `timeout` elapses on `clock`.
///
/// On timeout the error carries the caller's source location and the
/// last snapshot from `observe`, so assertion failures show what the
/// screen actually looked like. Inject a [`crate::time::TestClock`] to
/// run without real sleeping.
#[track_caller]
pub fn wait_until(
    clock: &dyn Clock,
    timeout: Duration,
    mut condition: impl FnMut() -> bool,
    observe: impl Fn() -> Option<String>,
) -> Result<()> {
    let location = std::panic::Location::caller();
    let start = clock.now();
    loop {
        if condition() {
            return Ok(());
        }
        if clock.now().saturating_sub(start) >= timeout {
            return Err(BraidError::Timeout {
                message: format!("condition not met within {timeout:?}"),
                location: location.to_string(),
                last_snapshot: observe(),
            });
        }
        clock.park(Duration::from_millis(10));
    }
}
