use crate::{
    event::{Event, EventKind},
    graph::{Edge, EdgeKind, Graph, Segment, SegmentId},
    types::{HashMap, IndexMap, TaskId, Timestamp},
};
use core::ops::Range;
use thiserror::Error;
use tracing::{debug, trace};

/// Error kind for graph reconstruction failures.
///
/// Indicates a defect in the builder rather than in the analyzed workload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GraphError {
    /// The log holds events but none of them bound a segment.
    #[error("no active segments could be constructed from {events} event(s)")]
    NoSegments {
        /// Number of events in the log.
        events: usize,
    },
}

/// Half-open span `[start, end)` during which a task waited on an in-line
/// call into a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct WaitInterval {
    start: Timestamp,
    end: Timestamp,
}

pub(super) fn build(events: &[Event]) -> Result<Graph, GraphError> {
    // Phase 1: Group events by the task they are attributed to, the driver
    // closure counting as one more task, and order each group by timestamp.
    // Grouping breaks log adjacency, so timestamps (not log positions) are the
    // sort key. The sort is stable, which keeps equal timestamps in emission
    // order.
    let per_task = group_by_task(events);
    if per_task.is_empty() {
        return Ok(Graph::default());
    }

    // Phase 2: Cut every task's timeline into active segments, skipping
    // zero-length spans and spans covered by a wait on an in-line call. Each
    // task's segments are stored contiguously; `ranges` remembers where.
    let mut segments = Vec::new();
    let mut ranges = HashMap::<Option<TaskId>, Range<usize>>::default();
    for (&task, task_events) in &per_task {
        let waits = wait_intervals(task_events);
        let first = segments.len();
        let mut ordinal = 0;
        for pair in task_events.windows(2) {
            let (t0, t1) = (pair[0].timestamp, pair[1].timestamp);
            if t1 <= t0 || overlaps_wait(t0, t1, &waits) {
                continue;
            }
            segments.push(Segment {
                task,
                ordinal,
                start: t0,
                end: t1,
            });
            ordinal += 1;
        }
        if segments.len() > first {
            ranges.insert(task, first..segments.len());
        }
    }

    let Some(root) = segments
        .iter()
        .enumerate()
        .min_by_key(|(_, segment)| segment.start)
        .map(|(idx, _)| SegmentId(idx))
    else {
        return Err(GraphError::NoSegments {
            events: per_task.values().map(Vec::len).sum(),
        });
    };

    // Phase 3: Sequential edges inside every task.
    let mut edges = Vec::new();
    for range in ranges.values() {
        for idx in range.start..range.end - 1 {
            edges.push(Edge {
                from: SegmentId(idx),
                to: SegmentId(idx + 1),
                kind: EdgeKind::Sequential,
            });
        }
    }
    // Keep the edge list in segment order regardless of map iteration order.
    edges.sort_unstable_by_key(|edge| edge.from);

    // Phase 4: Causal edges across tasks, snapped to the nearest active
    // segments. Either endpoint may be missing (e.g. a task whose body left no
    // measurable segment); such edges are dropped.
    let view = SegmentView {
        segments: &segments,
        ranges: &ranges,
    };
    for event in events {
        let (parent, at) = (event.task, event.timestamp);
        let (kind, from, to) = match event.kind {
            EventKind::Fork(child) => (
                EdgeKind::Fork,
                view.last_ending_at_or_before(parent, at),
                view.first(Some(child)),
            ),
            EventKind::Join(child) => (
                EdgeKind::Join,
                view.last(Some(child)),
                view.first_starting_at_or_after(parent, at),
            ),
            EventKind::ComputeStart(child) => (
                EdgeKind::Compute,
                view.last_ending_at_or_before(parent, at),
                view.first(Some(child)),
            ),
            EventKind::ComputeEnd(child) => (
                EdgeKind::Return,
                view.last(Some(child)),
                view.first_starting_at_or_after(parent, at),
            ),
            EventKind::Enter | EventKind::Exit => continue,
        };
        match (from, to) {
            (Some(from), Some(to)) => edges.push(Edge { from, to, kind }),
            _ => trace!(%event, %kind, "omitting edge without both endpoints"),
        }
    }

    let mut successors = vec![Vec::new(); segments.len()];
    for edge in &edges {
        successors[edge.from.index()].push(edge.to);
    }

    debug!(
        tasks = per_task.len(),
        segments = segments.len(),
        edges = edges.len(),
        "built segment graph"
    );
    Ok(Graph {
        segments,
        edges,
        successors,
        root: Some(root),
    })
}

fn group_by_task(events: &[Event]) -> IndexMap<Option<TaskId>, Vec<&Event>> {
    let mut per_task = IndexMap::<Option<TaskId>, Vec<&Event>>::default();
    for event in events {
        per_task.entry(event.task).or_default().push(event);
    }
    for task_events in per_task.values_mut() {
        task_events.sort_by_key(|event| event.timestamp);
    }
    per_task
}

/// Pair every `ComputeStart(child)` with the matching `ComputeEnd(child)`.
///
/// A per-child stack tolerates nested and unbalanced patterns; unmatched ends
/// are ignored.
fn wait_intervals(task_events: &[&Event]) -> Vec<WaitInterval> {
    let mut open = HashMap::<TaskId, Vec<Timestamp>>::default();
    let mut waits = Vec::new();
    for event in task_events {
        match event.kind {
            EventKind::ComputeStart(child) => open.entry(child).or_default().push(event.timestamp),
            EventKind::ComputeEnd(child) => {
                let Some(start) = open.get_mut(&child).and_then(Vec::pop) else {
                    continue;
                };
                if event.timestamp > start {
                    waits.push(WaitInterval {
                        start,
                        end: event.timestamp,
                    });
                }
            }
            EventKind::Enter | EventKind::Exit | EventKind::Fork(_) | EventKind::Join(_) => {}
        }
    }
    waits.sort_by_key(|wait| wait.start);
    waits
}

/// Whether `[t0, t1)` overlaps any of the waits, which are sorted by start.
fn overlaps_wait(t0: Timestamp, t1: Timestamp, waits: &[WaitInterval]) -> bool {
    // Start from the last wait beginning at or before `t0`; earlier waits end
    // before it because a task cannot wait on two calls at once.
    let from = waits
        .partition_point(|wait| wait.start <= t0)
        .saturating_sub(1);
    waits[from..]
        .iter()
        .take_while(|wait| wait.start < t1)
        .any(|wait| wait.end > t0)
}

/// Lookups over the contiguous, time-ordered segment run of every task.
struct SegmentView<'a> {
    segments: &'a [Segment],
    ranges: &'a HashMap<Option<TaskId>, Range<usize>>,
}

impl SegmentView<'_> {
    fn range(&self, task: Option<TaskId>) -> Range<usize> {
        self.ranges.get(&task).cloned().unwrap_or_default()
    }

    fn first(&self, task: Option<TaskId>) -> Option<SegmentId> {
        self.range(task).next().map(SegmentId)
    }

    fn last(&self, task: Option<TaskId>) -> Option<SegmentId> {
        self.range(task).next_back().map(SegmentId)
    }

    // Segments of one task are disjoint and sorted, so both `start` and `end`
    // increase along a range.

    fn last_ending_at_or_before(&self, task: Option<TaskId>, at: Timestamp) -> Option<SegmentId> {
        let range = self.range(task);
        let count = self.segments[range.clone()].partition_point(|segment| segment.end <= at);
        count.checked_sub(1).map(|offset| SegmentId(range.start + offset))
    }

    fn first_starting_at_or_after(
        &self,
        task: Option<TaskId>,
        at: Timestamp,
    ) -> Option<SegmentId> {
        let range = self.range(task);
        let offset = self.segments[range.clone()].partition_point(|segment| segment.start < at);
        (offset < range.len()).then(|| SegmentId(range.start + offset))
    }
}
