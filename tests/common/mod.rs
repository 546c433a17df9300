#![allow(dead_code)]

use fjg::{Config, Graph, ProtocolViolation, Scope, Task};
use proptest::test_runner::Config as ProptestConfig;
use std::sync::Once;

static INIT_LOGGING: Once = Once::new();

/// Route `tracing` output through the test harness; the first call wins.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}

/// Proptest settings shared by the property suites.
///
/// `FJG_PROPTEST_CASES` overrides the number of cases.
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    let cases = std::env::var("FJG_PROPTEST_CASES")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(cases);
    let mut config = ProptestConfig::with_cases(cases);
    config.max_shrink_iters = 1024;
    config
}

pub const THRESHOLD: usize = 1000;

/// How a `DotProduct` above the threshold treats its two halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    /// Fork left, compute right, join left.
    ForkComputeJoin,
    /// Compute right, then fork and immediately join left.
    ComputeForkJoin,
    /// Fork both, join right then left.
    ForkForkJoin,
    /// Fork left, compute right, never join left.
    ForkComputeDangling,
    /// Fork both, join both, then join left again.
    JoinTwice,
    // Illegal sequences below.
    ForkTwice,
    ComputeForked,
    ForkJoined,
    ComputeJoined,
    ForkComputed,
    JoinComputed,
    ComputeTwice,
    JoinUnforked,
}

/// Recursive dot product of two equally long slices.
#[derive(Debug, Clone, Copy)]
pub struct DotProduct<'a> {
    pub a: &'a [i64],
    pub b: &'a [i64],
    pub split: Split,
}

impl<'a> DotProduct<'a> {
    pub fn new(a: &'a [i64], b: &'a [i64], split: Split) -> Self {
        Self { a, b, split }
    }

    fn halves(self) -> (Self, Self) {
        let mid = self.a.len() / 2;
        let (al, ar) = self.a.split_at(mid);
        let (bl, br) = self.b.split_at(mid);
        (
            Self::new(al, bl, self.split),
            Self::new(ar, br, self.split),
        )
    }
}

impl<C: Config> Task<C> for DotProduct<'_> {
    type Output = i64;

    fn compute(self, scope: Scope<'_, C>) -> Result<i64, ProtocolViolation> {
        if self.a.len() <= THRESHOLD {
            return Ok(self.a.iter().zip(self.b).map(|(x, y)| x * y).sum());
        }
        let (lhs, rhs) = self.halves();
        let mut left = scope.task(lhs);
        let mut right = scope.task(rhs);
        match self.split {
            Split::ForkComputeJoin => {
                left.fork()?;
                let r = right.compute()?;
                let l = left.join()?;
                Ok(l + r)
            }
            Split::ComputeForkJoin => {
                let r = right.compute()?;
                left.fork()?;
                let l = left.join()?;
                Ok(l + r)
            }
            Split::ForkForkJoin => {
                left.fork()?;
                right.fork()?;
                let r = right.join()?;
                let l = left.join()?;
                Ok(l + r)
            }
            Split::ForkComputeDangling => {
                left.fork()?;
                right.compute()
            }
            Split::JoinTwice => {
                left.fork()?;
                right.fork()?;
                let l = left.join()?;
                let r = right.join()?;
                assert_eq!(left.join()?, l);
                Ok(l + r)
            }
            Split::ForkTwice => {
                left.fork()?;
                left.fork()?;
                right.fork()?;
                Ok(right.join()? + left.join()?)
            }
            Split::ComputeForked => {
                left.fork()?;
                left.compute()?;
                Ok(5)
            }
            Split::ForkJoined => {
                left.fork()?;
                right.compute()?;
                left.join()?;
                left.fork()?;
                Ok(5)
            }
            Split::ComputeJoined => {
                left.fork()?;
                right.compute()?;
                left.join()?;
                left.compute()?;
                Ok(5)
            }
            Split::ForkComputed => {
                left.compute()?;
                right.fork()?;
                left.fork()?;
                Ok(5)
            }
            Split::JoinComputed => {
                left.compute()?;
                right.fork()?;
                left.join()?;
                Ok(5)
            }
            Split::ComputeTwice => {
                left.compute()?;
                left.compute()?;
                Ok(5)
            }
            Split::JoinUnforked => {
                left.join()?;
                Ok(5)
            }
        }
    }
}

/// `0, 1, .., n - 1` twice over.
pub fn vectors(n: usize) -> (Vec<i64>, Vec<i64>) {
    let a: Vec<i64> = (0..n as i64).collect();
    (a.clone(), a)
}

/// Sum of squares `0² + .. + (n - 1)²`.
pub fn expected_dot(n: usize) -> i64 {
    let n = n as i64;
    (n - 1) * n * (2 * n - 1) / 6
}

/// Number of segments reachable from the root along graph edges.
pub fn reachable_segments(graph: &Graph) -> usize {
    let mut seen = vec![false; graph.segments().len()];
    let mut stack: Vec<_> = graph.root().into_iter().collect();
    let mut count = 0;
    while let Some(id) = stack.pop() {
        if std::mem::replace(&mut seen[id.index()], true) {
            continue;
        }
        count += 1;
        stack.extend_from_slice(graph.successors(id));
    }
    count
}
