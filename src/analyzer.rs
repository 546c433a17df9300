use crate::{
    config::{Config, DefaultConfig},
    event::Event,
    graph::{Graph, GraphError},
    recorder::{CategoryStats, Recorder, compute_ratio},
    scope::Scope,
    task::ProtocolViolation,
    types::{Category, IndexMap},
};
use thiserror::Error;
use tracing::debug;

/// Error returned by an analysis run.
///
/// Keeps bugs in the analyzed workload apart from failures of the analyzer
/// itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnalyzeError {
    /// The workload broke the fork/join protocol.
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),
    /// The recorded log could not be turned into a graph.
    #[error("graph reconstruction failed: {0}")]
    Graph(#[from] GraphError),
}

/// Runs workloads and turns their recorded behavior into `AnalysisResult`s.
///
/// An analyzer owns one recorder and can be reused; every run starts from a
/// clean log, fresh task identities, and a fresh clock.
#[must_use]
#[derive(Debug, Default)]
pub struct Analyzer<C: Config> {
    recorder: Recorder<C>,
}

impl<C: Config> Analyzer<C> {
    /// Create an analyzer with an empty recorder.
    pub fn new() -> Self {
        Self {
            recorder: Recorder::new(),
        }
    }

    /// Run `workload` and analyze everything it did.
    ///
    /// The workload receives the driver scope, from which it creates tasks
    /// and reaches the simulated pool.
    ///
    /// # Errors
    /// - `AnalyzeError::Protocol` for the first protocol violation of the run,
    ///   including one the workload chose to ignore.
    /// - `AnalyzeError::Graph` if the graph builder fails on the log.
    pub fn run<F>(&mut self, workload: F) -> Result<AnalysisResult, AnalyzeError>
    where
        F: FnOnce(Scope<'_, C>) -> Result<(), ProtocolViolation>,
    {
        self.recorder.reset();
        debug!("starting fork/join analysis");
        let outcome = workload(Scope::new(&self.recorder, None));
        // The latch holds the earliest violation; a workload that swallowed it
        // may go on to return a later one.
        let pending = self.recorder.take_violation();
        if let Some(violation) = pending.or(outcome.err()) {
            self.recorder.reset();
            return Err(violation.into());
        }
        let result = self.recorder.freeze()?;
        debug!(
            tasks = result.task_count,
            compute_ratio = result.compute_ratio(),
            pool_invokes = result.pool_invokes,
            "fork/join analysis finished"
        );
        Ok(result)
    }
}

/// Analyze `workload` with wall-clock timestamps.
///
/// Shorthand for `Analyzer::<DefaultConfig>::new().run(workload)`.
///
/// # Errors
/// See `Analyzer::run`.
pub fn analyze<F>(workload: F) -> Result<AnalysisResult, AnalyzeError>
where
    F: FnOnce(Scope<'_, DefaultConfig>) -> Result<(), ProtocolViolation>,
{
    Analyzer::<DefaultConfig>::new().run(workload)
}

/// Immutable outcome of one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub(crate) graph: Graph,
    pub(crate) task_count: u64,
    pub(crate) per_category: IndexMap<Category, CategoryStats>,
    pub(crate) forks: u64,
    pub(crate) computes: u64,
    pub(crate) pool_invokes: u64,
    pub(crate) unjoined_forks: u64,
    pub(crate) events: Vec<Event>,
}

impl AnalysisResult {
    /// The reconstructed segment graph.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Number of tasks constructed.
    #[must_use]
    pub fn task_count(&self) -> u64 {
        self.task_count
    }

    /// Counters per task category, in order of first construction.
    #[must_use]
    pub fn per_category(&self) -> &IndexMap<Category, CategoryStats> {
        &self.per_category
    }

    /// Tasks constructed per category.
    pub fn category_counts(&self) -> impl Iterator<Item = (Category, u64)> + '_ {
        self.per_category
            .iter()
            .map(|(&category, stats)| (category, stats.tasks))
    }

    /// Compute ratio per category.
    pub fn category_compute_ratios(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        self.per_category
            .iter()
            .map(|(&category, stats)| (category, stats.compute_ratio()))
    }

    /// Share of split points resolved by in-line computation instead of
    /// forking: `computes / (computes + forks)`, `1.0` when neither happened.
    #[must_use]
    pub fn compute_ratio(&self) -> f64 {
        compute_ratio(self.computes, self.forks)
    }

    /// Total `fork` calls.
    #[must_use]
    pub fn forks(&self) -> u64 {
        self.forks
    }

    /// Total in-line `compute` calls.
    #[must_use]
    pub fn computes(&self) -> u64 {
        self.computes
    }

    /// Top-level `ForkJoinPool::invoke` calls.
    #[must_use]
    pub fn pool_invokes(&self) -> u64 {
        self.pool_invokes
    }

    /// Forked tasks that were dropped instead of joined.
    #[must_use]
    pub fn unjoined_forks(&self) -> u64 {
        self.unjoined_forks
    }

    /// The full event log in emission order.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Whether the run funnels into a single final segment.
    ///
    /// Trivially true when no task was constructed.
    #[must_use]
    pub fn all_forked_tasks_joined(&self) -> bool {
        self.task_count == 0 || self.graph.final_segment_count() == 1
    }
}
