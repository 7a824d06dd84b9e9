//! Wall-clock timestamps and the sleeping primitive the scheduler runs on.

use std::thread;
use std::time::{Duration, Instant};

const MICROS_PER_SEC: u32 = 1_000_000;

/// A point in time split into whole seconds and a sub-second remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Timestamp {
    secs: u64,
    micros: u32,
}

impl Timestamp {
    /// `micros` at or above one second carries into `secs`.
    #[must_use]
    pub const fn new(secs: u64, micros: u32) -> Self {
        Self {
            secs: secs + (micros / MICROS_PER_SEC) as u64,
            micros: micros % MICROS_PER_SEC,
        }
    }

    #[must_use]
    pub fn from_duration(elapsed: Duration) -> Self {
        Self::new(elapsed.as_secs(), elapsed.subsec_micros())
    }

    #[must_use]
    pub const fn secs(&self) -> u64 {
        self.secs
    }

    #[must_use]
    pub const fn subsec_micros(&self) -> u32 {
        self.micros
    }

    /// Microseconds from `start` to `self`, borrowing a second when the
    /// sub-second part of `self` is smaller. Never negative: a `start` in
    /// the future yields zero.
    #[must_use]
    pub const fn micros_since(&self, start: Timestamp) -> u64 {
        if self.secs < start.secs || (self.secs == start.secs && self.micros <= start.micros) {
            return 0;
        }
        let mut secs = self.secs - start.secs;
        let micros = if self.micros >= start.micros {
            self.micros - start.micros
        } else {
            secs -= 1;
            self.micros + MICROS_PER_SEC - start.micros
        };
        secs * MICROS_PER_SEC as u64 + micros as u64
    }
}

/// Source of time and of blocking sleeps.
pub trait Clock {
    fn now(&self) -> Timestamp;
    fn sleep(&self, duration: Duration);
}

/// Real clock backed by [`Instant`], so timestamps never run backwards.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_duration(self.origin.elapsed())
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}
