//! Monotonic time source.
//!
//! All timers in the engine are expressed as offsets from an arbitrary origin
//! returned by [`Clock::now`]. Production code uses [`SystemClock`] (or a
//! `performance.now()` clock on the web); tests drive a [`ManualClock`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

/// A monotonic clock.
pub trait Clock {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;
}

/// Wall-clock backed by [`std::time::Instant`].
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: std::time::Instant,
}

#[cfg(not(target_arch = "wasm32"))]
impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Manually advanced clock for tests and simulations.
///
/// Clones share the same underlying time, so a test can keep one handle and
/// hand another to the controller.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        *self.now.lock() += delta;
    }

    /// Moves the clock forward by `ms` milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Jumps to an absolute time. Never moves backwards.
    pub fn set(&self, now: Duration) {
        let mut guard = self.now.lock();
        if now > *guard {
            *guard = now;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}
