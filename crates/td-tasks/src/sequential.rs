//! Sequential composition of two finite tasks.

use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, error};

use crate::error::TaskResult;
use crate::finite::{FiniteBody, FiniteTask, Finisher};
use crate::task::{Task, TaskState};

/// Which child of a [`SequentialTask`] is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Stopped,
    RunningFirst,
    RunningSecond,
}

struct SequentialBody {
    first: FiniteTask,
    second: FiniteTask,
    phase: Rc<Cell<Phase>>,
}

impl FiniteBody for SequentialBody {
    fn on_start(&mut self, finisher: Finisher) -> TaskResult<()> {
        self.phase.set(Phase::RunningFirst);

        let phase = Rc::clone(&self.phase);
        let second = self.second.clone();
        // Left queued on `first` if this start fails; the stale run is ignored.
        self.first.on_finished(move || {
            if !finisher.is_current() || phase.get() != Phase::RunningFirst {
                return;
            }
            phase.set(Phase::RunningSecond);

            let done = Rc::clone(&phase);
            second.on_finished(move || {
                if finisher.is_current() && done.get() == Phase::RunningSecond {
                    done.set(Phase::Stopped);
                    finisher.finish();
                }
            });
            if let Err(err) = second.start() {
                // The sequence stays running until ended from outside.
                error!(task = %second.name(), "failed to start second task: {err}");
                phase.set(Phase::Stopped);
            }
        });

        if let Err(err) = self.first.start() {
            self.phase.set(Phase::Stopped);
            return Err(err);
        }
        Ok(())
    }

    fn on_end(&mut self) {
        match self.phase.replace(Phase::Stopped) {
            Phase::RunningFirst => self.first.end(),
            Phase::RunningSecond => self.second.end(),
            Phase::Stopped => {}
        }
    }
}

/// Runs `first`, then `second`, and finishes when `second` finishes.
///
/// Longer chains nest: `a.then(&b).then(&c)`.
#[derive(Clone)]
pub struct SequentialTask {
    task: FiniteTask,
    phase: Rc<Cell<Phase>>,
}

impl SequentialTask {
    pub fn new(first: FiniteTask, second: FiniteTask) -> Self {
        let phase = Rc::new(Cell::new(Phase::Stopped));
        let name = format!("{} then {}", first.name(), second.name());
        debug!(task = %name, "sequence built");
        let task = FiniteTask::new(
            name,
            SequentialBody {
                first,
                second,
                phase: Rc::clone(&phase),
            },
        );
        Self { task, phase }
    }

    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    /// The sequence as a plain finite task, for nesting or listeners.
    pub fn task(&self) -> &FiniteTask {
        &self.task
    }

    pub fn then(&self, next: &FiniteTask) -> SequentialTask {
        self.task.then(next)
    }

    pub fn on_finished(&self, listener: impl FnOnce() + 'static) {
        self.task.on_finished(listener);
    }
}

impl Task for SequentialTask {
    fn name(&self) -> &str {
        self.task.name()
    }

    fn state(&self) -> TaskState {
        self.task.state()
    }

    fn start(&self) -> TaskResult<()> {
        self.task.start()
    }

    fn end(&self) {
        self.task.end();
    }
}
