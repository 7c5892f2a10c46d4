//! Tasks that run until stopped.

use std::cell::{Cell, RefCell};

use tracing::debug;

use crate::error::{TaskError, TaskResult};
use crate::task::{Task, TaskState};

/// Behaviour of a continuous task.
pub trait ContinuousBody {
    fn on_start(&mut self) -> TaskResult<()>;
    fn on_end(&mut self);
}

/// Idle → Running on start, Running → Idle on end. No terminal state.
pub struct ContinuousTask<B> {
    name: String,
    state: Cell<TaskState>,
    body: RefCell<B>,
}

impl<B: ContinuousBody> ContinuousTask<B> {
    pub fn new(name: impl Into<String>, body: B) -> Self {
        Self {
            name: name.into(),
            state: Cell::new(TaskState::Idle),
            body: RefCell::new(body),
        }
    }
}

impl<B: ContinuousBody> Task for ContinuousTask<B> {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> TaskState {
        self.state.get()
    }

    fn start(&self) -> TaskResult<()> {
        if self.is_running() {
            return Err(TaskError::AlreadyRunning {
                name: self.name.clone(),
            });
        }
        self.body.borrow_mut().on_start()?;
        self.state.set(TaskState::Running);
        debug!(task = %self.name, "continuous task started");
        Ok(())
    }

    fn end(&self) {
        if self.state.replace(TaskState::Idle) == TaskState::Running {
            self.body.borrow_mut().on_end();
            debug!(task = %self.name, "continuous task ended");
        }
    }
}
