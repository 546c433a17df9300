use crate::{
    config::Config,
    recorder::Recorder,
    task::{ProtocolViolation, Task, TaskHandle},
    types::TaskId,
};
use derive_more::Debug;

/// Execution context handed to the driver closure and to every task body.
///
/// Carries the recorder of the run and the identity of the task currently
/// executing. Running a task body hands it a new scope naming that task, and
/// the caller's scope is untouched, so the "current task" follows the call
/// stack without any shared mutable pointer.
#[derive(Debug)]
pub struct Scope<'r, C: Config> {
    #[debug(skip)]
    recorder: &'r Recorder<C>,
    current: Option<TaskId>,
}

impl<C: Config> Clone for Scope<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: Config> Copy for Scope<'_, C> {}

impl<'r, C: Config> Scope<'r, C> {
    pub(crate) fn new(recorder: &'r Recorder<C>, current: Option<TaskId>) -> Self {
        Self { recorder, current }
    }

    /// Task whose body is running; `None` in the driver closure.
    #[must_use]
    pub fn current(&self) -> Option<TaskId> {
        self.current
    }

    /// Wrap `body` in a fresh handle whose parent is the current task.
    ///
    /// Allocates the next task identity of the run.
    pub fn task<T: Task<C>>(&self, body: T) -> TaskHandle<'r, C, T> {
        TaskHandle::new(self.recorder, self.current, body)
    }

    /// The run's simulated pool.
    #[must_use]
    pub fn pool(&self) -> ForkJoinPool<'r, C> {
        ForkJoinPool {
            recorder: self.recorder,
        }
    }
}

/// Stand-in for a fork/join thread pool.
///
/// Invoking a task runs it to completion on the calling thread; no worker
/// threads exist.
#[derive(Debug)]
pub struct ForkJoinPool<'r, C: Config> {
    #[debug(skip)]
    recorder: &'r Recorder<C>,
}

impl<'r, C: Config> ForkJoinPool<'r, C> {
    /// Run a freshly created task at top level and return its result.
    ///
    /// # Errors
    /// If the handle was already forked or computed, or if the task reported
    /// a violation.
    pub fn invoke<T: Task<C>>(
        &self,
        mut task: TaskHandle<'r, C, T>,
    ) -> Result<T::Output, ProtocolViolation> {
        self.recorder.record_pool_invoke();
        task.invoke()
    }
}
