//! Deterministic clock for driving `bacnet-core`'s timer methods in tests.
//!
//! Every stateful module in `bacnet-core` takes elapsed time as an explicit
//! parameter rather than reading a clock, so tests never need a real one —
//! but the driver loop above them does, and `FakeClock` stands in for
//! [`bacnet_core::env::SystemClock`] there: `now()` only moves when a test
//! calls [`FakeClock::advance`].

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bacnet_core::env::Clock;

/// Shared, manually-advanced monotonic clock.
#[derive(Debug, Clone, Default)]
pub struct FakeClock(Arc<Mutex<Duration>>);

impl FakeClock {
    /// Creates a clock starting at `Duration::ZERO`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut now = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        *now += delta;
    }
}

impl Clock for FakeClock {
    type Instant = Duration;

    fn now(&self) -> Duration {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
