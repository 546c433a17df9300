mod build;
mod dot;
mod metrics;

/// Error returned by `Graph::build` when the event log cannot be turned into
/// a segment graph.
pub use crate::graph::build::GraphError;
pub use crate::graph::{dot::Dot, dot::DotStyle, metrics::Metrics};
use crate::{
    event::{Actor, Event},
    types::{TaskId, Timestamp},
};
use derive_more::{Display, From, Into};

/// Index of a segment inside its `Graph`.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
#[repr(transparent)]
pub struct SegmentId(usize);

impl SegmentId {
    /// Position of the segment in `Graph::segments`.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Active, non-blocked execution interval `[start, end)` of one task, or of
/// the driver closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Segment {
    task: Option<TaskId>,
    ordinal: u32,
    start: Timestamp,
    end: Timestamp,
}

impl Segment {
    /// Task that was running during the interval; `None` for the driver.
    #[must_use]
    pub const fn task(&self) -> Option<TaskId> {
        self.task
    }

    /// Position of the segment among its task's segments.
    #[must_use]
    pub const fn ordinal(&self) -> u32 {
        self.ordinal
    }

    /// Timestamp of the event opening the interval.
    #[must_use]
    pub const fn start(&self) -> Timestamp {
        self.start
    }

    /// Timestamp of the event closing the interval.
    #[must_use]
    pub const fn end(&self) -> Timestamp {
        self.end
    }

    /// Length of the interval. Always positive.
    #[must_use]
    pub const fn duration(&self) -> Timestamp {
        self.end - self.start
    }
}

impl core::fmt::Display for Segment {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}_{}", Actor(self.task), self.ordinal)
    }
}

/// Why one segment has to finish before another may begin.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Successive segments of the same task.
    #[display("sequential")]
    Sequential,
    /// A task calling another task's body in-line.
    #[display("compute")]
    Compute,
    /// An in-line call returning; the caller's next segment depends on it.
    #[display("return")]
    Return,
    /// A child handed off as an independent unit of work.
    #[display("fork")]
    Fork,
    /// A parent waiting for a forked child to finish.
    #[display("join")]
    Join,
}

/// Directed causal relation: `to` cannot begin before `from` ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    /// Segment that must finish first.
    pub from: SegmentId,
    /// Segment that depends on it.
    pub to: SegmentId,
    /// Reason the edge exists.
    pub kind: EdgeKind,
}

/// Causal DAG of execution segments reconstructed from an event log.
///
/// Every edge points forward in time (`to` starts no earlier than `from`
/// ends), so the graph is acyclic by construction.
#[must_use]
#[derive(Debug, Clone, Default)]
pub struct Graph {
    segments: Vec<Segment>,
    edges: Vec<Edge>,
    /// Outgoing adjacency, indexed by `SegmentId`.
    successors: Vec<Vec<SegmentId>>,
    root: Option<SegmentId>,
}

impl Graph {
    /// Reconstruct the segment graph of a recorded run.
    ///
    /// Pure function of `events`. The driver closure is treated as one more
    /// task: its events delimit segments labelled `driver_<n>`, which link the
    /// tasks it computes, forks and joins directly.
    ///
    /// # Errors
    /// If events exist but none of them delimit a measurable segment.
    pub fn build(events: &[Event]) -> Result<Self, GraphError> {
        build::build(events)
    }

    /// All segments, grouped by task in order of first appearance.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// All causal edges.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// The segment with the earliest start, `None` for an empty graph.
    #[must_use]
    pub fn root(&self) -> Option<SegmentId> {
        self.root
    }

    /// Look up a segment by identifier.
    #[must_use]
    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(id.index())
    }

    /// Segments that directly depend on `id`.
    #[must_use]
    pub fn successors(&self, id: SegmentId) -> &[SegmentId] {
        self.successors.get(id.index()).map_or(&[], Vec::as_slice)
    }

    /// Whether no segment could be reconstructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}
