use derive_more::{Display, From, Into};
use indexmap::IndexMap as _IndexMap;
use rustc_hash::FxBuildHasher;
use std::collections::HashMap as _HashMap;

/// Unique identifier of a task within one analysis run.
///
/// Identities are handed out in construction order starting from zero, so
/// they double as dense indexes into per-task tables.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
#[repr(transparent)]
pub struct TaskId(u64);

impl TaskId {
    /// Raw numeric value of the identity.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    pub(crate) fn index(self) -> usize {
        usize::try_from(self.0).unwrap_or(usize::MAX)
    }
}

/// Nanoseconds elapsed on the run's clock.
pub type Timestamp = u64;

/// Name under which tasks of one type are counted.
pub type Category = &'static str;

pub(crate) type HashMap<K, V> = _HashMap<K, V, FxBuildHasher>;
/// `IndexMap` type with fast hasher.
pub type IndexMap<K, V> = _IndexMap<K, V, FxBuildHasher>;
