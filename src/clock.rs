use crate::types::Timestamp;
use core::cell::Cell;
use std::time::Instant;

/// Source of event timestamps for one analysis run.
///
/// A fresh clock is created (via `Default`) every time the recorder is reset,
/// so timestamps of independent runs never share an origin.
pub trait Clock {
    /// Current reading in nanoseconds. Readings never decrease.
    fn now(&self) -> Timestamp;
}

/// Wall clock measuring nanoseconds since the run started.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        Timestamp::try_from(self.origin.elapsed().as_nanos()).unwrap_or(Timestamp::MAX)
    }
}

/// Deterministic clock that advances by one tick per reading.
///
/// Every event of a run gets a distinct timestamp, so each segment lasts
/// exactly one tick between adjacent events. Useful for reproducible graphs.
#[derive(Debug, Default)]
pub struct LogicalClock {
    ticks: Cell<Timestamp>,
}

impl Clock for LogicalClock {
    fn now(&self) -> Timestamp {
        let next = self.ticks.get() + 1;
        self.ticks.set(next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_clock_ticks_strictly() {
        let clock = LogicalClock::default();
        assert_eq!(clock.now(), 1);
        assert_eq!(clock.now(), 2);
        assert_eq!(clock.now(), 3);
    }

    #[test]
    fn monotonic_clock_never_goes_back() {
        let clock = MonotonicClock::default();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
