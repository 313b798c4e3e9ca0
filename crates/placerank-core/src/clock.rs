//! Time sources for visit timestamps and frecency aging.
//!
//! All times are microseconds since the Unix epoch. The service reads the
//! clock through the `Clock` trait so tests can pin and advance time.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub const MICROS_PER_DAY: i64 = 24 * 60 * 60 * 1_000_000;

pub trait Clock: Send + Sync {
    fn now_micros(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    // u128 micros fits in i64 until year 294247
    #[allow(clippy::cast_possible_truncation)]
    fn now_micros(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as i64)
            .unwrap_or(0)
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    #[must_use]
    pub fn new(now_micros: i64) -> Self {
        Self {
            now: AtomicI64::new(now_micros),
        }
    }

    pub fn set(&self, now_micros: i64) {
        self.now.store(now_micros, Ordering::SeqCst);
    }

    pub fn advance(&self, micros: i64) {
        self.now.fetch_add(micros, Ordering::SeqCst);
    }

    pub fn advance_days(&self, days: i64) {
        self.advance(days * MICROS_PER_DAY);
    }
}

impl Clock for ManualClock {
    fn now_micros(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Issues strictly increasing default visit times.
///
/// Reads the clock and bumps past the last issued value when the clock has not
/// moved (or moved backwards), so a batch of defaulted visits never ties.
#[derive(Debug, Default)]
pub(crate) struct VisitTimeSequence {
    last: i64,
}

impl VisitTimeSequence {
    pub(crate) fn next(&mut self, clock: &dyn Clock) -> i64 {
        let now = clock.now_micros();
        self.last = if now > self.last { now } else { self.last + 1 };
        self.last
    }
}

/// Age in whole days, clamped at zero for visits in the future
pub(crate) fn age_in_days(visit_time: i64, now: i64) -> i64 {
    now.saturating_sub(visit_time).max(0) / MICROS_PER_DAY
}
