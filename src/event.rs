use crate::types::{TaskId, Timestamp};
use core::fmt;

/// What happened at a point of the run.
///
/// Variants carrying a `TaskId` name the *child* task; the event itself is
/// attributed to the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The attributed task started running its body.
    Enter,
    /// The attributed task finished running its body.
    Exit,
    /// The attributed task called the child's body in-line.
    ComputeStart(TaskId),
    /// The in-line call into the child returned.
    ComputeEnd(TaskId),
    /// The child was handed off as an independent unit of work.
    Fork(TaskId),
    /// The attributed task waited for the forked child to complete.
    Join(TaskId),
}

impl EventKind {
    /// The other task this event refers to, if any.
    #[must_use]
    pub fn child(self) -> Option<TaskId> {
        match self {
            Self::Enter | Self::Exit => None,
            Self::ComputeStart(child)
            | Self::ComputeEnd(child)
            | Self::Fork(child)
            | Self::Join(child) => Some(child),
        }
    }
}

/// Immutable record of a single step of the analyzed execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Event {
    /// Reading of the run's clock when the event was recorded.
    pub timestamp: Timestamp,
    /// Task the event is attributed to; `None` for the driver closure.
    pub task: Option<TaskId>,
    /// What happened.
    pub kind: EventKind,
}

impl Event {
    /// Create an event attributed to `task`.
    #[must_use]
    pub const fn new(timestamp: Timestamp, task: Option<TaskId>, kind: EventKind) -> Self {
        Self {
            timestamp,
            task,
            kind,
        }
    }
}

/// Renders a task identity, or `driver` for the driver closure.
pub(crate) struct Actor(pub(crate) Option<TaskId>);

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(id) => write!(f, "{id}"),
            None => f.write_str("driver"),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            timestamp,
            task,
            kind,
        } = *self;
        let task = Actor(task);
        match kind {
            EventKind::Enter => write!(f, "{timestamp} entered {task}"),
            EventKind::Exit => write!(f, "{timestamp} exited {task}"),
            EventKind::ComputeStart(child) => {
                write!(f, "{timestamp} compute from {task} into {child}")
            }
            EventKind::ComputeEnd(child) => {
                write!(f, "{timestamp} compute from {task} into {child} finished")
            }
            EventKind::Fork(child) => write!(f, "{timestamp} forked {child} from {task}"),
            EventKind::Join(child) => write!(f, "{timestamp} joined {child} back to {task}"),
        }
    }
}
