use crate::{
    config::Config,
    event::EventKind,
    recorder::Recorder,
    scope::Scope,
    types::{Category, TaskId},
};
use core::{fmt, mem};
use derive_more::Display;
use thiserror::Error;
use tracing::warn;

/// A single unit of recursive fork/join work.
///
/// `compute` is the task's body. It runs at most once, either in-line through
/// `TaskHandle::compute`, or later through `TaskHandle::join` after a fork.
/// Inside, the body builds child tasks with `Scope::task` and drives them
/// through their handles, propagating violations with `?`.
pub trait Task<C: Config>: Sized {
    /// Result produced by the body; cached by `join`.
    type Output: Clone;
    /// Run the body.
    ///
    /// # Errors
    /// Whatever protocol violation a child handle reported.
    fn compute(self, scope: Scope<'_, C>) -> Result<Self::Output, ProtocolViolation>;
    /// Name under which tasks of this type are counted.
    #[must_use]
    fn category() -> Category {
        core::any::type_name::<Self>()
    }
}

/// Operation attempted on a task handle.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `TaskHandle::fork`.
    #[display("fork")]
    Fork,
    /// `TaskHandle::join`.
    #[display("join")]
    Join,
    /// `TaskHandle::compute`.
    #[display("compute")]
    Compute,
    /// `ForkJoinPool::invoke`.
    #[display("invoke")]
    Invoke,
}

/// Observable lifecycle state of a task handle.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Constructed; neither forked nor computed.
    #[display("never forked")]
    Created,
    /// Forked and awaiting its join.
    #[display("already forked")]
    Forked,
    /// Run in-line (or invoked by a pool).
    #[display("already computed")]
    Computed,
    /// Forked and joined; holds the cached result.
    #[display("already joined")]
    Joined,
    /// Its body failed part-way; the handle is unusable.
    #[display("poisoned by a failed execution")]
    Poisoned,
}

/// Illegal use of the fork/join/compute protocol by the analyzed code.
///
/// Raised at the offending call and propagated unchanged out of `analyze`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("cannot {operation} task {task}: {state}")]
pub struct ProtocolViolation {
    /// Task whose handle was misused.
    pub task: TaskId,
    /// What was attempted.
    pub operation: Operation,
    /// State the handle was in.
    pub state: Lifecycle,
}

enum TaskState<C: Config, T: Task<C>> {
    Created(T),
    Forked(T),
    Computed,
    Joined(T::Output),
    Poisoned,
}

impl<C: Config, T: Task<C>> TaskState<C, T> {
    fn lifecycle(&self) -> Lifecycle {
        match self {
            Self::Created(_) => Lifecycle::Created,
            Self::Forked(_) => Lifecycle::Forked,
            Self::Computed => Lifecycle::Computed,
            Self::Joined(_) => Lifecycle::Joined,
            Self::Poisoned => Lifecycle::Poisoned,
        }
    }
}

/// Instrumented handle around a task body.
///
/// Each handle is consumed by exactly one of: a direct `compute`, a `fork`
/// followed by `join`, or a top-level `ForkJoinPool::invoke`. Every other
/// sequence of calls yields a `ProtocolViolation`. Joining twice is allowed
/// and returns the cached result.
///
/// A handle that is forked but never joined is executed when it is dropped,
/// the way a real pool eventually runs every forked task; its segments then
/// dangle at the end of the graph. Once any violation has been raised in the
/// run, dropped handles are discarded without running.
#[must_use]
pub struct TaskHandle<'r, C: Config, T: Task<C>> {
    id: TaskId,
    /// Task whose scope created the handle; `None` for the driver.
    parent: Option<TaskId>,
    recorder: &'r Recorder<C>,
    state: TaskState<C, T>,
}

impl<C: Config, T: Task<C>> fmt::Debug for TaskHandle<'_, C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("category", &T::category())
            .field("state", &self.lifecycle())
            .finish_non_exhaustive()
    }
}

impl<'r, C: Config, T: Task<C>> TaskHandle<'r, C, T> {
    pub(crate) fn new(recorder: &'r Recorder<C>, parent: Option<TaskId>, body: T) -> Self {
        Self {
            id: recorder.new_task_id(T::category()),
            parent,
            recorder,
            state: TaskState::Created(body),
        }
    }

    /// Identity assigned at construction.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.state.lifecycle()
    }

    /// Hand the task off as an independent unit of work to be joined later.
    ///
    /// # Errors
    /// Unless the handle is freshly created.
    pub fn fork(&mut self) -> Result<&mut Self, ProtocolViolation> {
        match mem::replace(&mut self.state, TaskState::Poisoned) {
            TaskState::Created(body) => {
                self.recorder.record(self.parent, EventKind::Fork(self.id));
                self.state = TaskState::Forked(body);
                Ok(self)
            }
            state @ (TaskState::Forked(_)
            | TaskState::Computed
            | TaskState::Joined(_)
            | TaskState::Poisoned) => Err(self.reject(Operation::Fork, state)),
        }
    }

    /// Complete a forked task and return its result.
    ///
    /// The body runs on the first join only; later joins return the cached
    /// result without recording anything.
    ///
    /// # Errors
    /// If the handle was never forked, was computed in-line, or its body
    /// reported a violation.
    pub fn join(&mut self) -> Result<T::Output, ProtocolViolation> {
        match mem::replace(&mut self.state, TaskState::Poisoned) {
            TaskState::Joined(output) => {
                self.state = TaskState::Joined(output.clone());
                Ok(output)
            }
            TaskState::Forked(body) => {
                let output = self.execute(body)?;
                self.recorder.record(self.parent, EventKind::Join(self.id));
                self.state = TaskState::Joined(output.clone());
                Ok(output)
            }
            state @ (TaskState::Created(_) | TaskState::Computed | TaskState::Poisoned) => {
                Err(self.reject(Operation::Join, state))
            }
        }
    }

    /// Run the body in-line as a nested call of the parent.
    ///
    /// # Errors
    /// Unless the handle is freshly created, or if the body reported a
    /// violation.
    pub fn compute(&mut self) -> Result<T::Output, ProtocolViolation> {
        match mem::replace(&mut self.state, TaskState::Poisoned) {
            TaskState::Created(body) => {
                self.recorder
                    .record(self.parent, EventKind::ComputeStart(self.id));
                let output = self.execute(body)?;
                self.recorder
                    .record(self.parent, EventKind::ComputeEnd(self.id));
                self.state = TaskState::Computed;
                Ok(output)
            }
            state @ (TaskState::Forked(_)
            | TaskState::Computed
            | TaskState::Joined(_)
            | TaskState::Poisoned) => Err(self.reject(Operation::Compute, state)),
        }
    }

    /// Top-level execution on behalf of a pool, without compute events.
    pub(crate) fn invoke(&mut self) -> Result<T::Output, ProtocolViolation> {
        match mem::replace(&mut self.state, TaskState::Poisoned) {
            TaskState::Created(body) => {
                let output = self.execute(body)?;
                self.state = TaskState::Computed;
                Ok(output)
            }
            state @ (TaskState::Forked(_)
            | TaskState::Computed
            | TaskState::Joined(_)
            | TaskState::Poisoned) => Err(self.reject(Operation::Invoke, state)),
        }
    }

    fn execute(&self, body: T) -> Result<T::Output, ProtocolViolation> {
        self.recorder.record(Some(self.id), EventKind::Enter);
        let output = body.compute(Scope::new(self.recorder, Some(self.id)))?;
        self.recorder.record(Some(self.id), EventKind::Exit);
        Ok(output)
    }

    /// Put `state` back and describe the illegal transition.
    fn reject(&mut self, operation: Operation, state: TaskState<C, T>) -> ProtocolViolation {
        let violation = ProtocolViolation {
            task: self.id,
            operation,
            state: state.lifecycle(),
        };
        self.state = state;
        warn!(%violation, "fork/join protocol violation");
        self.recorder.note_violation(violation.clone());
        violation
    }
}

impl<C: Config, T: Task<C>> Drop for TaskHandle<'_, C, T> {
    fn drop(&mut self) {
        if std::thread::panicking() || self.recorder.has_violation() {
            return;
        }
        let TaskState::Forked(body) = mem::replace(&mut self.state, TaskState::Poisoned) else {
            return;
        };
        warn!(task = %self.id, "forked task dropped without join; running it now");
        self.recorder.record_unjoined_fork();
        if let Err(violation) = self.execute(body) {
            self.recorder.note_violation(violation);
        }
    }
}
