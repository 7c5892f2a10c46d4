//! Task lifecycle shared by continuous and finite tasks.

use crate::error::TaskResult;

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Idle,
    Running,
    /// Only reachable by finite tasks.
    Finished,
}

/// A startable, stoppable unit of robot behaviour.
///
/// Tasks are shared handles; all operations take `&self`.
pub trait Task {
    fn name(&self) -> &str;

    fn state(&self) -> TaskState;

    /// Install this task's controller and begin running.
    ///
    /// # Errors
    ///
    /// [`TaskError::AlreadyRunning`](crate::TaskError::AlreadyRunning) if the
    /// task is running, or the error from building or installing its
    /// controller. A task that fails to start is left idle.
    fn start(&self) -> TaskResult<()>;

    /// Stop the task and restore the default controller.
    ///
    /// Safe to call at any time, including before natural completion and on
    /// a task that is not running.
    fn end(&self);

    fn is_running(&self) -> bool {
        self.state() == TaskState::Running
    }
}
