//! Error types for task lifecycle operations.

use td_component::ComponentError;
use td_controls::ControlError;
use thiserror::Error;

/// Result type for task operations.
pub type TaskResult<T> = Result<T, TaskError>;

/// Errors raised when constructing or starting a task.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TaskError {
    /// `start` was called on a task that is already running.
    #[error("Task '{name}' is already running")]
    AlreadyRunning { name: String },

    /// The task's controller could not be built.
    #[error(transparent)]
    Control(#[from] ControlError),

    /// The task's controller could not be installed.
    #[error(transparent)]
    Component(#[from] ComponentError),
}
