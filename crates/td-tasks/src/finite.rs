//! Tasks that finish on their own.
//!
//! A [`FiniteTask`] hands its body a [`Finisher`] on every start. The body
//! typically moves it into a controller check, which calls
//! [`Finisher::finish`] once the completion condition holds. Finishing moves
//! the task to [`TaskState::Finished`], notifies the completion listeners,
//! and then runs the body's end hook.
//!
//! A finisher only acts on the run it was issued for: finishing twice is a
//! no-op, and a finisher left over from a cancelled or earlier run is
//! ignored.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::error::{TaskError, TaskResult};
use crate::sequential::SequentialTask;
use crate::task::{Task, TaskState};

/// Behaviour of a finite task.
pub trait FiniteBody {
    fn on_start(&mut self, finisher: Finisher) -> TaskResult<()>;
    fn on_end(&mut self);
}

type Listener = Box<dyn FnOnce()>;

struct FiniteCore {
    name: String,
    state: Cell<TaskState>,
    run: Cell<u64>,
    listeners: RefCell<Vec<Listener>>,
    /// Set when a run finishes while `on_start` still holds the body.
    end_deferred: Cell<bool>,
    body: RefCell<Box<dyn FiniteBody>>,
}

/// Shared handle to a finite task.
#[derive(Clone)]
pub struct FiniteTask {
    core: Rc<FiniteCore>,
}

/// Run-scoped completion handle.
#[derive(Clone)]
pub struct Finisher {
    core: Weak<FiniteCore>,
    run: u64,
}

impl Finisher {
    /// Mark the run as finished. Idempotent.
    pub fn finish(&self) {
        if let Some(core) = self.core.upgrade() {
            FiniteTask { core }.finish_run(self.run);
        }
    }

    /// True while the run this finisher belongs to is still running.
    pub fn is_current(&self) -> bool {
        self.core.upgrade().is_some_and(|core| {
            core.run.get() == self.run && core.state.get() == TaskState::Running
        })
    }
}

impl fmt::Debug for Finisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Finisher").field("run", &self.run).finish()
    }
}

impl FiniteTask {
    pub fn new(name: impl Into<String>, body: impl FiniteBody + 'static) -> Self {
        Self {
            core: Rc::new(FiniteCore {
                name: name.into(),
                state: Cell::new(TaskState::Idle),
                run: Cell::new(0),
                listeners: RefCell::new(Vec::new()),
                end_deferred: Cell::new(false),
                body: RefCell::new(Box::new(body)),
            }),
        }
    }

    /// Register a listener for the current run, or the next one if idle.
    ///
    /// Listeners are called once, in registration order, when the run
    /// finishes. A cancelled run drops its listeners without calling them.
    pub fn on_finished(&self, listener: impl FnOnce() + 'static) {
        self.core.listeners.borrow_mut().push(Box::new(listener));
    }

    /// Run `self`, then `next`.
    pub fn then(&self, next: &FiniteTask) -> SequentialTask {
        SequentialTask::new(self.clone(), next.clone())
    }

    pub fn ptr_eq(&self, other: &FiniteTask) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }

    fn finish_run(&self, run: u64) {
        let core = &self.core;
        if core.run.get() != run || core.state.get() != TaskState::Running {
            return;
        }
        core.state.set(TaskState::Finished);
        debug!(task = %core.name, "finite task finished");

        let listeners = std::mem::take(&mut *core.listeners.borrow_mut());
        for listener in listeners {
            listener();
        }

        // A listener may already have restarted this task.
        if core.run.get() != run {
            return;
        }
        match core.body.try_borrow_mut() {
            Ok(mut body) => body.on_end(),
            Err(_) => core.end_deferred.set(true),
        }
    }
}

impl Task for FiniteTask {
    fn name(&self) -> &str {
        &self.core.name
    }

    fn state(&self) -> TaskState {
        self.core.state.get()
    }

    fn start(&self) -> TaskResult<()> {
        let core = &self.core;
        if core.state.get() == TaskState::Running {
            return Err(TaskError::AlreadyRunning {
                name: core.name.clone(),
            });
        }
        let run = core.run.get() + 1;
        core.run.set(run);
        core.state.set(TaskState::Running);
        debug!(task = %core.name, run, "finite task started");

        let finisher = Finisher {
            core: Rc::downgrade(core),
            run,
        };
        let started = core.body.borrow_mut().on_start(finisher);
        if let Err(err) = started {
            core.end_deferred.set(false);
            if core.run.get() == run && core.state.get() == TaskState::Running {
                core.state.set(TaskState::Idle);
            }
            return Err(err);
        }
        if core.end_deferred.replace(false) {
            core.body.borrow_mut().on_end();
        }
        Ok(())
    }

    fn end(&self) {
        let core = &self.core;
        match core.state.replace(TaskState::Idle) {
            TaskState::Running => {
                core.run.set(core.run.get() + 1);
                core.listeners.borrow_mut().clear();
                core.body.borrow_mut().on_end();
                debug!(task = %core.name, "finite task cancelled");
            }
            TaskState::Idle | TaskState::Finished => {}
        }
    }
}

impl fmt::Debug for FiniteTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FiniteTask")
            .field("name", &self.core.name)
            .field("state", &self.core.state.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Body that hands its finisher out to the test.
    struct Manual {
        finisher: Rc<RefCell<Option<Finisher>>>,
        ends: Rc<Cell<u32>>,
        finish_immediately: bool,
    }

    impl FiniteBody for Manual {
        fn on_start(&mut self, finisher: Finisher) -> TaskResult<()> {
            if self.finish_immediately {
                finisher.finish();
            }
            *self.finisher.borrow_mut() = Some(finisher);
            Ok(())
        }

        fn on_end(&mut self) {
            self.ends.set(self.ends.get() + 1);
        }
    }

    fn manual(finish_immediately: bool) -> (FiniteTask, Rc<RefCell<Option<Finisher>>>, Rc<Cell<u32>>) {
        let finisher = Rc::new(RefCell::new(None));
        let ends = Rc::new(Cell::new(0));
        let task = FiniteTask::new(
            "manual",
            Manual {
                finisher: Rc::clone(&finisher),
                ends: Rc::clone(&ends),
                finish_immediately,
            },
        );
        (task, finisher, ends)
    }

    #[test]
    fn finish_notifies_once_then_ends() {
        let (task, finisher, ends) = manual(false);
        let notified = Rc::new(Cell::new(0));
        let seen_ends = Rc::new(Cell::new(u32::MAX));
        let (n, e, obs) = (Rc::clone(&notified), Rc::clone(&ends), Rc::clone(&seen_ends));
        task.on_finished(move || {
            n.set(n.get() + 1);
            obs.set(e.get());
        });

        task.start().unwrap();
        let f = finisher.borrow().clone().unwrap();
        assert!(f.is_current());
        f.finish();
        f.finish();

        assert_eq!(task.state(), TaskState::Finished);
        assert_eq!(notified.get(), 1);
        assert_eq!(ends.get(), 1);
        // Listeners run before the end hook.
        assert_eq!(seen_ends.get(), 0);
        assert!(!f.is_current());
    }

    #[test]
    fn restart_while_running_is_rejected() {
        let (task, _, _) = manual(false);
        task.start().unwrap();
        assert_eq!(
            task.start().unwrap_err(),
            TaskError::AlreadyRunning {
                name: "manual".into()
            }
        );
    }

    #[test]
    fn stale_finisher_is_ignored() {
        let (task, finisher, ends) = manual(false);
        task.start().unwrap();
        let stale = finisher.borrow().clone().unwrap();
        task.end();
        assert_eq!(ends.get(), 1);

        task.start().unwrap();
        stale.finish();
        assert!(task.is_running());
        assert_eq!(ends.get(), 1);
    }

    #[test]
    fn cancel_drops_listeners() {
        let (task, finisher, _) = manual(false);
        let notified = Rc::new(Cell::new(false));
        let n = Rc::clone(&notified);
        task.on_finished(move || n.set(true));
        task.start().unwrap();
        task.end();

        task.start().unwrap();
        finisher.borrow().clone().unwrap().finish();
        assert!(!notified.get());
    }

    #[test]
    fn finishing_inside_start_defers_end_hook() {
        let (task, _, ends) = manual(true);
        task.start().unwrap();
        assert_eq!(task.state(), TaskState::Finished);
        assert_eq!(ends.get(), 1);
    }
}
