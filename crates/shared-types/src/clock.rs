//! The `Clock` collaborator: monotonic time plus wall-clock time.
//!
//! Every timing-sensitive component (pool expiry, consensus round pacing,
//! phase deadlines) takes an `Arc<dyn Clock>` by constructor injection
//! instead of calling `SystemTime::now()`/`Instant::now()` directly, so
//! tests can supply a [`FixedClock`].

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Wall-clock plus monotonic time source.
pub trait Clock: Send + Sync {
    /// Unix timestamp in seconds.
    fn now_wall(&self) -> i64;
    /// A monotonic instant, for measuring elapsed durations / deadlines.
    fn now_monotonic(&self) -> Instant;
}

/// The real system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_wall(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time is after the epoch")
            .as_secs() as i64
    }

    fn now_monotonic(&self) -> Instant {
        Instant::now()
    }
}

/// A clock with a settable wall-clock value, for deterministic tests.
/// `now_monotonic` still advances in real time, since `Instant` cannot be
/// forged, but most tests only assert on wall-clock-derived behaviour.
pub struct FixedClock {
    wall: AtomicI64,
    epoch: Instant,
}

impl FixedClock {
    /// Build a clock pinned at `wall` seconds since the Unix epoch.
    pub fn new(wall: i64) -> Self {
        Self {
            wall: AtomicI64::new(wall),
            epoch: Instant::now(),
        }
    }

    /// Move the wall-clock value forward (or backward) by `delta` seconds.
    pub fn advance(&self, delta: i64) {
        self.wall.fetch_add(delta, Ordering::SeqCst);
    }

    /// Overwrite the wall-clock value.
    pub fn set(&self, wall: i64) {
        self.wall.store(wall, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_wall(&self) -> i64 {
        self.wall.load(Ordering::SeqCst)
    }

    fn now_monotonic(&self) -> Instant {
        self.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let c = FixedClock::new(1000);
        assert_eq!(c.now_wall(), 1000);
        c.advance(10);
        assert_eq!(c.now_wall(), 1010);
    }
}
