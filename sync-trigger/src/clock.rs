//! Monotonic/wall-clock primitives for timing-critical scheduling.
//!
//! [`spin_until`] is the only wait primitive used on the hot path of the pulse emitter and
//! the trigger client's final trial: a thread sleep can oversleep by a millisecond or more
//! depending on the OS scheduler, which is already larger than the timing budget this crate
//! is trying to hold onto.

use std::sync::OnceLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

static MONO_EPOCH: OnceLock<Instant> = OnceLock::new();

fn mono_epoch() -> Instant {
    *MONO_EPOCH.get_or_init(Instant::now)
}

/// Seconds since the UNIX epoch, as measured by the system wall clock.
pub fn wall_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before UNIX epoch")
        .as_secs_f64()
}

/// Seconds since an arbitrary, process-lifetime origin, as measured by a monotonic clock.
///
/// Only differences between two `mono_now()` calls are meaningful; the absolute value has
/// no relationship to wall-clock time.
pub fn mono_now() -> f64 {
    mono_epoch().elapsed().as_secs_f64()
}

/// Busy-waits until `mono_now() >= deadline`.
///
/// Returns immediately if `deadline` is already in the past. Never sleeps: on most
/// platforms a sleep's wakeup latency is itself larger than the precision this crate is
/// trying to hold onto.
pub fn spin_until(deadline: f64) {
    while mono_now() < deadline {
        std::hint::spin_loop();
    }
}
