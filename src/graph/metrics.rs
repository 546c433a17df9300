use crate::{
    graph::{Graph, SegmentId},
    types::Timestamp,
};

/// Snapshot of every derived metric of a graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    /// Number of segments, at least 1.
    pub structural_work: u64,
    /// Total segment time in clock units.
    pub empirical_work: Timestamp,
    /// Segments on the longest causal chain.
    pub structural_critical_path: u64,
    /// Time along the longest causal chain.
    pub empirical_critical_path: Timestamp,
    /// `structural_work / structural_critical_path`.
    pub structural_speedup: f64,
    /// `empirical_work / empirical_critical_path`.
    pub empirical_speedup: f64,
    /// Segments without outgoing edges.
    pub final_segment_count: usize,
}

impl Graph {
    /// Compute all metrics at once.
    pub fn metrics(&self) -> Metrics {
        let order = self.topological_order();
        let structural_critical_path = self.longest_path(&order, |_| 1);
        let empirical_critical_path = self.longest_path(&order, |id| self.duration(id));
        Metrics {
            structural_work: self.structural_work(),
            empirical_work: self.empirical_work(),
            structural_critical_path,
            empirical_critical_path,
            structural_speedup: self.speedup(self.structural_work(), structural_critical_path),
            empirical_speedup: self.speedup(self.empirical_work(), empirical_critical_path),
            final_segment_count: self.final_segment_count(),
        }
    }

    /// Number of segments; never below 1 so it can be divided by.
    #[must_use]
    pub fn structural_work(&self) -> u64 {
        (self.segments.len() as u64).max(1)
    }

    /// Sum of segment durations.
    #[must_use]
    pub fn empirical_work(&self) -> Timestamp {
        self.segments.iter().map(|segment| segment.duration()).sum()
    }

    /// Number of segments on the longest chain from the root; 0 when empty.
    #[must_use]
    pub fn structural_critical_path(&self) -> u64 {
        self.longest_path(&self.topological_order(), |_| 1)
    }

    /// Duration of the longest chain from the root; 0 when empty.
    #[must_use]
    pub fn empirical_critical_path(&self) -> Timestamp {
        self.longest_path(&self.topological_order(), |id| self.duration(id))
    }

    /// Ideal parallel speedup counting every segment as one unit of work.
    ///
    /// `1.0` for the empty graph.
    #[must_use]
    pub fn structural_speedup(&self) -> f64 {
        self.speedup(self.structural_work(), self.structural_critical_path())
    }

    /// Ideal parallel speedup weighting segments by measured duration.
    ///
    /// `1.0` for the empty graph.
    #[must_use]
    pub fn empirical_speedup(&self) -> f64 {
        self.speedup(self.empirical_work(), self.empirical_critical_path())
    }

    /// Segments nothing depends on.
    ///
    /// A fully joined fork/join run funnels into exactly one such segment; a
    /// forked task that was never joined leaves its own dangling end.
    #[must_use]
    pub fn final_segment_count(&self) -> usize {
        self.successors.iter().filter(|out| out.is_empty()).count()
    }

    #[allow(clippy::cast_precision_loss)]
    fn speedup(&self, work: u64, critical_path: u64) -> f64 {
        if self.is_empty() || critical_path == 0 {
            return 1.0;
        }
        work as f64 / critical_path as f64
    }

    fn duration(&self, id: SegmentId) -> Timestamp {
        self.segments[id.index()].duration()
    }

    /// Longest weighted path starting at the root, relaxing in `order`.
    fn longest_path(&self, order: &[SegmentId], weight: impl Fn(SegmentId) -> u64) -> u64 {
        // dist[v] = heaviest chain of predecessors ending right before v.
        let mut dist = vec![0u64; self.segments.len()];
        let mut best = 0;
        for &node in order {
            let reach = dist[node.index()] + weight(node);
            for &succ in self.successors(node) {
                let slot = &mut dist[succ.index()];
                *slot = (*slot).max(reach);
            }
            best = best.max(reach);
        }
        best
    }

    /// Reverse depth-first post-order over the segments reachable from the
    /// root.
    ///
    /// Iterative, so deep recursion trees cannot overflow the stack.
    pub(crate) fn topological_order(&self) -> Vec<SegmentId> {
        let Some(root) = self.root else {
            return Vec::new();
        };
        let mut seen = vec![false; self.segments.len()];
        let mut order = Vec::with_capacity(self.segments.len());
        // (node, index of the next successor to visit)
        let mut stack = vec![(root, 0usize)];
        seen[root.index()] = true;
        while let Some(top) = stack.last_mut() {
            let (node, cursor) = *top;
            if let Some(&succ) = self.successors(node).get(cursor) {
                top.1 += 1;
                if !seen[succ.index()] {
                    seen[succ.index()] = true;
                    stack.push((succ, 0));
                }
            } else {
                order.push(node);
                stack.pop();
            }
        }
        order.reverse();
        order
    }
}
