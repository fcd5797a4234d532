//! Monotonic microsecond clock used by the timing engine

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Source of monotonic time in microseconds.
///
/// Readings start above zero: zero is reserved as the "unset" timestamp in
/// the tempo and debounce state.
pub trait Clock: Send + Sync {
    fn now_us(&self) -> u64;
}

/// Clock anchored at creation time
#[derive(Clone)]
pub struct MonotonicClock {
    start_instant: Instant,
}

impl MonotonicClock {
    /// Offset added to every reading so the first one is never zero
    const EPOCH_OFFSET_US: u64 = 1;

    pub fn new() -> Self {
        Self {
            start_instant: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_us(&self) -> u64 {
        self.start_instant.elapsed().as_micros() as u64 + Self::EPOCH_OFFSET_US
    }
}

/// Clock moved by hand, for tests and replays
#[derive(Default)]
pub struct ManualClock {
    now_us: AtomicU64,
}

impl ManualClock {
    pub fn new(start_us: u64) -> Self {
        Self {
            now_us: AtomicU64::new(start_us),
        }
    }

    pub fn set_us(&self, now_us: u64) {
        self.now_us.store(now_us, Ordering::Relaxed);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.now_us.fetch_add(ms * 1_000, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_us(&self) -> u64 {
        self.now_us.load(Ordering::Relaxed)
    }
}
