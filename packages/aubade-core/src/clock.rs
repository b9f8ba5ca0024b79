//! Time source abstraction for the scheduler and monitor loops.
//!
//! Every wait in the library goes through [`Clock`] so that multi-day
//! schedule scenarios can run in milliseconds under test.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use parking_lot::Mutex;

/// Source of "now" and of delay, injected into every waiting loop.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Returns the current local wall-clock time.
    fn now(&self) -> NaiveDateTime;

    /// Suspends the caller for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Production clock backed by the OS clock and the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Deterministic clock for tests.
///
/// `sleep` advances the held instant and returns immediately, so loops that
/// sleep in bounded slices converge without real delay.
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward without sleeping.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock();
        *now += chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero());
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock()
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(duration);
        // Yield so concurrent tasks observe the new time before the caller
        // re-reads the clock.
        tokio::task::yield_now().await;
    }
}
