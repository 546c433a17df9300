use crate::clock::{Clock, LogicalClock, MonotonicClock};
use core::fmt::Debug;

/// Configuration entry-point for instantiating an analyzer.
///
/// A concrete `Config` binds the clock that timestamps recorded events. Task
/// bodies are generic over it, so the same workload can be analyzed with wall
/// time or with deterministic ticks.
pub trait Config: Debug + Sized + 'static {
    /// Clock used by the recorder; recreated on every reset.
    type Clock: Clock + Default + Debug;
}

/// Measures real elapsed nanoseconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConfig;

impl Config for DefaultConfig {
    type Clock = MonotonicClock;
}

/// Stamps events with a logical tick counter for reproducible graphs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogicalConfig;

impl Config for LogicalConfig {
    type Clock = LogicalClock;
}
