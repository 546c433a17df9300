//! Fork/join discipline checker and causal graph reconstruction.
//!
//! This crate runs recursive fork/join workloads under instrumentation. It:
//! - Enforces the task protocol: every task is consumed by exactly one of a
//!   direct `compute` or a `fork` followed by `join`, and any other sequence of
//!   calls is reported as a `ProtocolViolation`.
//! - Records a timestamped event log of entries, exits, forks, joins and
//!   in-line computes.
//! - Rebuilds from that log a DAG of execution segments joined by causal
//!   edges, and derives work, critical path and speedup from it.
//!
//! Nothing runs in parallel: `fork` only records, and the forked body runs
//! later on the same call stack inside `join`. The analysis therefore reflects
//! the *call structure* of the workload, which is what bounds the parallelism
//! it could achieve on a real pool.
//!
//! Key modules:
//! - `task`: the `Task` trait, implemented by workloads, and the `TaskHandle`
//!   state machine wrapped around every task.
//! - `scope`: the execution context passed to task bodies, and the simulated
//!   `ForkJoinPool`.
//! - `recorder`: the per-run event log and counters.
//! - `graph`: segment graph construction, metrics, and DOT export.
//! - `analyzer`: the `analyze` entry point and its `AnalysisResult`.
//! - `config` and `clock`: bind the timestamp source of a run.
//!
//! Quick start:
//! 1. Implement `Task<C>` for your recursive work. In `compute`, create
//!    children with `scope.task(..)`, then `fork`/`join` or `compute` them.
//! 2. Call `analyze(|scope| ..)`, constructing the root task and passing it
//!    to `scope.pool().invoke(..)`.
//! 3. Inspect the returned `AnalysisResult`: counts, the compute ratio,
//!    `all_forked_tasks_joined`, and the metrics of its `graph()`.
//!
//! Every run owns its recorder, so analyses on different threads never
//! interfere, and task handles cannot migrate between threads.

/// The analysis entry point.
///
/// Resets the recorder, runs the workload, and freezes the log into an
/// immutable `AnalysisResult`.
pub mod analyzer;
/// Timestamp sources: a wall clock and a deterministic tick counter.
pub mod clock;
/// Public interface to configure an analysis.
///
/// Exposes the `Config` trait which binds the clock of a run.
pub mod config;
/// Event records, the sole input of graph reconstruction.
pub mod event;
/// Segment graph reconstruction, metrics, and DOT rendering.
///
/// Builds the causal DAG from an event log (segment extraction, exclusion of
/// time spent waiting on in-line calls, edge synthesis), and computes work,
/// critical path and speedup over it.
pub mod graph;
/// Per-run mutable event log, identities and counters.
pub mod recorder;
/// Execution context passed to task bodies, and the simulated pool.
pub mod scope;
/// Task definitions and the instrumented handle state machine.
///
/// Defines the `Task` trait (the recursive body), `TaskHandle` with its
/// `fork`/`join`/`compute` operations, and `ProtocolViolation`.
pub mod task;
/// Core identifiers and map aliases used across the crate.
pub mod types;

pub use crate::{
    analyzer::{AnalysisResult, AnalyzeError, Analyzer, analyze},
    config::{Config, DefaultConfig, LogicalConfig},
    graph::{DotStyle, Graph, Metrics},
    scope::{ForkJoinPool, Scope},
    task::{Lifecycle, Operation, ProtocolViolation, Task, TaskHandle},
    types::TaskId,
};
