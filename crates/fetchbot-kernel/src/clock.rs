//! [`Clock`] – monotonic time source for the poll loop and the dispatcher.
//!
//! Both the 200 ms poll cadence and the `Returning` elapsed-time measurement
//! go through this trait so tests can simulate minutes of driving instantly.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Monotonic time measured from an arbitrary per-clock origin.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;

    /// Block the calling thread for `period`.
    fn sleep(&self, period: Duration);
}

/// Wall-clock implementation backed by [`Instant`] and [`std::thread::sleep`].
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, period: Duration) {
        std::thread::sleep(period);
    }
}

/// Test clock: time only moves when advanced, and `sleep` advances it
/// instead of blocking.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use fetchbot_kernel::clock::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// clock.sleep(Duration::from_millis(200));
/// clock.advance(Duration::from_secs(1));
/// assert_eq!(clock.now(), Duration::from_millis(1200));
/// ```
#[derive(Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sleep(&self, period: Duration) {
        self.advance(period);
    }
}
