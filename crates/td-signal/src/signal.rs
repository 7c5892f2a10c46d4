//! Pull-only signals: "the current value of X right now".

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::periodic::PeriodicSignal;

/// A zero-argument value producer with no history.
///
/// Constant signals return the same value on every read. Variable signals
/// re-read their source on every call, so two reads in the same instant may
/// differ only for them.
pub struct Signal<T> {
    source: Source<T>,
}

enum Source<T> {
    Constant(T),
    Variable(Rc<dyn Fn() -> T>),
}

impl<T: Clone> Clone for Signal<T> {
    fn clone(&self) -> Self {
        let source = match &self.source {
            Source::Constant(v) => Source::Constant(v.clone()),
            Source::Variable(read) => Source::Variable(Rc::clone(read)),
        };
        Self { source }
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Signal that always yields `value`.
    pub fn constant(value: T) -> Self {
        Self {
            source: Source::Constant(value),
        }
    }

    /// Signal that calls `read` on every access.
    pub fn variable(read: impl Fn() -> T + 'static) -> Self {
        Self {
            source: Source::Variable(Rc::new(read)),
        }
    }

    /// Read the current value.
    pub fn get(&self) -> T {
        match &self.source {
            Source::Constant(v) => v.clone(),
            Source::Variable(read) => read(),
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.source, Source::Constant(_))
    }

    /// Derived signal applying `f` to every read.
    pub fn map<U: Clone + 'static>(&self, f: impl Fn(T) -> U + 'static) -> Signal<U> {
        let parent = self.clone();
        Signal::variable(move || f(parent.get()))
    }

    /// Pair this signal with `other`; equal to `(self.get(), other.get())` at any instant.
    pub fn zip<U: Clone + 'static>(&self, other: &Signal<U>) -> Signal<(T, U)> {
        let (a, b) = (self.clone(), other.clone());
        Signal::variable(move || (a.get(), b.get()))
    }

    /// Periodic node sampling this signal once per tick.
    pub fn to_periodic(&self) -> PeriodicSignal<T> {
        PeriodicSignal::from_signal(self)
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Source::Constant(v) => f.debug_tuple("Signal::Constant").field(v).finish(),
            Source::Variable(_) => f.write_str("Signal::Variable"),
        }
    }
}

/// A settable value exposed as a variable [`Signal`].
///
/// Used for hot-reloadable properties and for sensor readings fed in from
/// outside the graph.
pub struct Var<T> {
    cell: Rc<RefCell<T>>,
}

impl<T> Clone for Var<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T: Clone + 'static> Var<T> {
    pub fn new(value: T) -> Self {
        Self {
            cell: Rc::new(RefCell::new(value)),
        }
    }

    pub fn get(&self) -> T {
        self.cell.borrow().clone()
    }

    pub fn set(&self, value: T) {
        *self.cell.borrow_mut() = value;
    }

    /// Modify the value in place.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.cell.borrow_mut());
    }

    /// Variable signal reading the current contents.
    pub fn signal(&self) -> Signal<T> {
        let cell = Rc::clone(&self.cell);
        Signal::variable(move || cell.borrow().clone())
    }
}

impl<T: fmt::Debug> fmt::Debug for Var<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Var").field(&self.cell.borrow()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn constant_is_stable() {
        let sig = Signal::constant(2.5);
        assert!(sig.is_constant());
        assert_eq!(sig.get(), 2.5);
        assert_eq!(sig.get(), 2.5);
    }

    #[test]
    fn variable_rereads_source() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let sig = Signal::variable(move || {
            counter.set(counter.get() + 1);
            counter.get()
        });
        assert!(!sig.is_constant());
        assert_eq!(sig.get(), 1);
        assert_eq!(sig.get(), 2);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn var_updates_are_visible_through_signal() {
        let var = Var::new(1.0);
        let doubled = var.signal().map(|v| v * 2.0);
        assert_eq!(doubled.get(), 2.0);
        var.set(3.0);
        assert_eq!(doubled.get(), 6.0);
        var.update(|v| *v += 1.0);
        assert_eq!(doubled.get(), 8.0);
    }

    #[test]
    fn zip_pairs_current_values() {
        let a = Var::new(1);
        let b = Signal::constant("b");
        let zipped = a.signal().zip(&b);
        assert_eq!(zipped.get(), (1, "b"));
        a.set(7);
        assert_eq!(zipped.get(), (7, "b"));
    }
}
