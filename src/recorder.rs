use crate::{
    analyzer::AnalysisResult,
    clock::Clock,
    config::Config,
    event::{Event, EventKind},
    graph::{Graph, GraphError},
    task::ProtocolViolation,
    types::{Category, IndexMap, TaskId},
};
use core::cell::RefCell;
use tracing::{debug, trace};

/// Counters kept for every task category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryStats {
    /// Tasks constructed.
    pub tasks: u64,
    /// Tasks of this category that were forked.
    pub forks: u64,
    /// Tasks of this category that were computed in-line.
    pub computes: u64,
}

impl CategoryStats {
    /// Share of split points resolved by in-line computation.
    #[must_use]
    pub fn compute_ratio(&self) -> f64 {
        compute_ratio(self.computes, self.forks)
    }
}

/// `computes / (computes + forks)`, or `1.0` when neither happened.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn compute_ratio(computes: u64, forks: u64) -> f64 {
    let total = computes + forks;
    if total == 0 {
        1.0
    } else {
        computes as f64 / total as f64
    }
}

/// Mutable event log of one analysis run.
///
/// The log lives behind a `RefCell`, which keeps the recorder (and every task
/// handle borrowing it) on the thread that runs the analysis.
#[derive(Debug)]
pub struct Recorder<C: Config> {
    state: RefCell<RecorderState<C>>,
}

#[derive(Debug)]
struct RecorderState<C: Config> {
    clock: C::Clock,
    /// Category of every allocated task, indexed by `TaskId`.
    categories: Vec<Category>,
    per_category: IndexMap<Category, CategoryStats>,
    events: Vec<Event>,
    forks: u64,
    computes: u64,
    pool_invokes: u64,
    unjoined_forks: u64,
    /// Whether the driver closure has an `Enter` without a matching `Exit`.
    driver_open: bool,
    /// First violation raised during the run, even if the workload ignored it.
    violation: Option<ProtocolViolation>,
}

impl<C: Config> Default for RecorderState<C> {
    fn default() -> Self {
        Self {
            clock: C::Clock::default(),
            categories: Vec::new(),
            per_category: IndexMap::default(),
            events: Vec::new(),
            forks: 0,
            computes: 0,
            pool_invokes: 0,
            unjoined_forks: 0,
            driver_open: false,
            violation: None,
        }
    }
}

impl<C: Config> Default for Recorder<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Config> Recorder<C> {
    /// Create an empty recorder with a fresh clock.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RefCell::new(RecorderState::default()),
        }
    }

    /// Drop every recorded event and counter and restart the clock.
    pub fn reset(&mut self) {
        *self.state.get_mut() = RecorderState::default();
    }

    /// Allocate the next task identity under `category`.
    pub fn new_task_id(&self, category: Category) -> TaskId {
        let mut state = self.state.borrow_mut();
        let id = TaskId::from(state.categories.len() as u64);
        state.categories.push(category);
        state.per_category.entry(category).or_default().tasks += 1;
        id
    }

    /// Timestamp and append an event attributed to `task`.
    ///
    /// The driver closure is bracketed like a task body: its first event is
    /// preceded by a driver `Enter`, and `freeze` closes it with an `Exit`.
    /// Runs whose driver only hands tasks to the pool log no driver events.
    pub fn record(&self, task: Option<TaskId>, kind: EventKind) {
        let mut state = self.state.borrow_mut();
        if task.is_none() {
            let opening = !state.driver_open;
            state.driver_open = kind != EventKind::Exit;
            if opening && kind != EventKind::Enter {
                state.push(None, EventKind::Enter);
            }
        }
        state.push(task, kind);
    }

    pub(crate) fn record_pool_invoke(&self) {
        self.state.borrow_mut().pool_invokes += 1;
    }

    pub(crate) fn record_unjoined_fork(&self) {
        self.state.borrow_mut().unjoined_forks += 1;
    }

    /// Remember `violation` unless an earlier one is already pending.
    pub(crate) fn note_violation(&self, violation: ProtocolViolation) {
        self.state.borrow_mut().violation.get_or_insert(violation);
    }

    pub(crate) fn has_violation(&self) -> bool {
        self.state.borrow().violation.is_some()
    }

    pub(crate) fn take_violation(&mut self) -> Option<ProtocolViolation> {
        self.state.get_mut().violation.take()
    }

    /// Number of events recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.borrow().events.len()
    }

    /// Whether nothing has been recorded since the last reset.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build the graph and move the recorded state into an immutable result.
    ///
    /// Leaves the recorder empty.
    ///
    /// # Errors
    /// If the graph builder cannot construct any segment from the log.
    pub fn freeze(&mut self) -> Result<AnalysisResult, GraphError> {
        let state = self.state.get_mut();
        if state.driver_open {
            state.push(None, EventKind::Exit);
        }
        let RecorderState {
            clock: _,
            categories,
            per_category,
            events,
            forks,
            computes,
            pool_invokes,
            unjoined_forks,
            driver_open: _,
            violation: _,
        } = core::mem::take(state);
        let graph = Graph::build(&events)?;
        debug!(
            tasks = categories.len(),
            events = events.len(),
            segments = graph.segments().len(),
            edges = graph.edges().len(),
            "froze event log"
        );
        Ok(AnalysisResult {
            graph,
            task_count: categories.len() as u64,
            per_category,
            forks,
            computes,
            pool_invokes,
            unjoined_forks,
            events,
        })
    }
}

impl<C: Config> RecorderState<C> {
    fn push(&mut self, task: Option<TaskId>, kind: EventKind) {
        let event = Event::new(self.clock.now(), task, kind);
        trace!(%event, "recorded");
        match kind {
            EventKind::Fork(child) => {
                self.forks += 1;
                if let Some(stats) = self.category_of(child) {
                    stats.forks += 1;
                }
            }
            EventKind::ComputeStart(child) => {
                self.computes += 1;
                if let Some(stats) = self.category_of(child) {
                    stats.computes += 1;
                }
            }
            EventKind::Enter | EventKind::Exit | EventKind::ComputeEnd(_) | EventKind::Join(_) => {}
        }
        self.events.push(event);
    }

    fn category_of(&mut self, task: TaskId) -> Option<&mut CategoryStats> {
        let category = *self.categories.get(task.index())?;
        Some(self.per_category.entry(category).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogicalConfig;

    #[test]
    fn counts_forks_and_computes_per_category() {
        let mut recorder = Recorder::<LogicalConfig>::new();
        let root = recorder.new_task_id("root");
        let left = recorder.new_task_id("leaf");
        let right = recorder.new_task_id("leaf");
        assert_eq!(
            [root, left, right].map(TaskId::get),
            [0, 1, 2],
            "ids are dense and ordered"
        );

        recorder.record(Some(root), EventKind::Enter);
        recorder.record(Some(root), EventKind::Fork(left));
        recorder.record(Some(root), EventKind::ComputeStart(right));
        recorder.record(Some(right), EventKind::Enter);
        recorder.record(Some(right), EventKind::Exit);
        recorder.record(Some(root), EventKind::ComputeEnd(right));
        recorder.record(Some(left), EventKind::Enter);
        recorder.record(Some(left), EventKind::Exit);
        recorder.record(Some(root), EventKind::Join(left));
        recorder.record(Some(root), EventKind::Exit);
        assert_eq!(recorder.len(), 10);

        let result = recorder.freeze().unwrap();
        assert!(recorder.is_empty());
        assert_eq!(result.task_count(), 3);
        assert_eq!(
            result.per_category().get("leaf"),
            Some(&CategoryStats {
                tasks: 2,
                forks: 1,
                computes: 1
            })
        );
        assert_eq!(result.per_category()["root"].compute_ratio(), 1.0);
        assert!((result.compute_ratio() - 0.5).abs() < f64::EPSILON);
        assert!(result.all_forked_tasks_joined());
    }

    #[test]
    fn reset_restarts_identities_and_clock() {
        let mut recorder = Recorder::<LogicalConfig>::new();
        let first = recorder.new_task_id("a");
        recorder.record(Some(first), EventKind::Enter);
        recorder.record_pool_invoke();

        recorder.reset();
        assert!(recorder.is_empty());
        let again = recorder.new_task_id("b");
        assert_eq!(again, first);
        recorder.record(Some(again), EventKind::Enter);
        recorder.record(Some(again), EventKind::Exit);

        let result = recorder.freeze().unwrap();
        assert_eq!(result.pool_invokes(), 0);
        assert_eq!(result.events()[0].timestamp, 1);
        assert!(!result.per_category().contains_key("a"));
    }

    #[test]
    fn driver_events_are_bracketed() {
        use EventKind::*;
        let mut recorder = Recorder::<LogicalConfig>::new();
        let task = recorder.new_task_id("leaf");
        recorder.record(None, ComputeStart(task));
        recorder.record(Some(task), Enter);
        recorder.record(Some(task), Exit);
        recorder.record(None, ComputeEnd(task));
        assert_eq!(recorder.len(), 5, "driver enter inserted before its first event");

        let result = recorder.freeze().unwrap();
        let log: Vec<_> = result.events().iter().map(|e| (e.task, e.kind)).collect();
        assert_eq!(
            log,
            [
                (None, Enter),
                (None, ComputeStart(task)),
                (Some(task), Enter),
                (Some(task), Exit),
                (None, ComputeEnd(task)),
                (None, Exit),
            ]
        );
        assert_eq!(result.graph().final_segment_count(), 1);
        assert!(result.all_forked_tasks_joined());
    }

    #[test]
    fn ratio_defaults_to_sequential() {
        assert_eq!(compute_ratio(0, 0), 1.0);
        assert_eq!(compute_ratio(0, 4), 0.0);
        assert!((compute_ratio(1, 3) - 0.25).abs() < f64::EPSILON);
    }
}
