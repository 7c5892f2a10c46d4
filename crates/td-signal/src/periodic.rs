//! Periodic signal nodes: memoized per-tick evaluation and tick-source ownership.
//!
//! A [`PeriodicSignal`] is a node in a pull-based dataflow graph. Each node
//! remembers the last value it computed together with the [`TickToken`] of the
//! pass that requested it. Reading a node twice with the same token returns the
//! memoized value, which keeps diamond-shaped graphs consistent: a shared
//! ancestor read through two branches in one tick is computed exactly once.
//!
//! A graph may be driven by at most one owner (a component) at a time.
//! Attaching walks the node and all of its ancestors.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use td_core::{IdAllocator, OwnerId, SignalId, Time};
use tracing::warn;

use crate::error::{SignalError, SignalResult};
use crate::signal::Signal;
use crate::token::TickToken;

static SIGNAL_IDS: IdAllocator = IdAllocator::new();

pub(crate) type Compute<T> = Box<dyn FnMut(Time, TickToken) -> T>;
pub(crate) type Check<T> = Box<dyn Fn(&T)>;

/// Type-erased view of a node used for ownership bookkeeping.
pub(crate) trait TickSource {
    fn id(&self) -> SignalId;
    fn check_claim(&self, owner: OwnerId, visited: &mut HashSet<SignalId>) -> SignalResult<()>;
    fn claim(&self, owner: OwnerId, visited: &mut HashSet<SignalId>);
    fn release(&self, owner: OwnerId, visited: &mut HashSet<SignalId>);
}

struct Memo<T> {
    token: TickToken,
    value: T,
}

struct Node<T> {
    id: SignalId,
    parents: Vec<Rc<dyn TickSource>>,
    compute: RefCell<Compute<T>>,
    check: Option<Check<T>>,
    memo: RefCell<Option<Memo<T>>>,
    owner: Cell<Option<OwnerId>>,
}

impl<T> TickSource for Node<T> {
    fn id(&self) -> SignalId {
        self.id
    }

    fn check_claim(&self, owner: OwnerId, visited: &mut HashSet<SignalId>) -> SignalResult<()> {
        if !visited.insert(self.id) {
            return Ok(());
        }
        if let Some(current) = self.owner.get() {
            if current != owner {
                return Err(SignalError::OwnershipConflict {
                    node: self.id,
                    current,
                    requested: owner,
                });
            }
        }
        for parent in &self.parents {
            parent.check_claim(owner, visited)?;
        }
        Ok(())
    }

    fn claim(&self, owner: OwnerId, visited: &mut HashSet<SignalId>) {
        if !visited.insert(self.id) {
            return;
        }
        self.owner.set(Some(owner));
        for parent in &self.parents {
            parent.claim(owner, visited);
        }
    }

    fn release(&self, owner: OwnerId, visited: &mut HashSet<SignalId>) {
        if !visited.insert(self.id) {
            return;
        }
        if self.owner.get() == Some(owner) {
            self.owner.set(None);
        }
        for parent in &self.parents {
            parent.release(owner, visited);
        }
    }
}

/// A typed node in a periodic dataflow graph.
///
/// Cloning is cheap and yields another handle to the same node.
pub struct PeriodicSignal<T> {
    node: Rc<Node<T>>,
}

impl<T> Clone for PeriodicSignal<T> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<T: Clone + 'static> PeriodicSignal<T> {
    pub(crate) fn from_parts(
        parents: Vec<Rc<dyn TickSource>>,
        compute: Compute<T>,
        check: Option<Check<T>>,
    ) -> Self {
        Self {
            node: Rc::new(Node {
                id: SIGNAL_IDS.allocate(),
                parents,
                compute: RefCell::new(compute),
                check,
                memo: RefCell::new(None),
                owner: Cell::new(None),
            }),
        }
    }

    /// Source node yielding `value` on every tick.
    pub fn constant(value: T) -> Self {
        Self::from_parts(Vec::new(), Box::new(move |_, _| value.clone()), None)
    }

    /// Source node sampling `signal` once per tick.
    pub fn from_signal(signal: &Signal<T>) -> Self {
        let signal = signal.clone();
        Self::from_parts(Vec::new(), Box::new(move |_, _| signal.get()), None)
    }

    pub(crate) fn as_source(&self) -> Rc<dyn TickSource> {
        let node: Rc<Node<T>> = Rc::clone(&self.node);
        node
    }

    /// Diagnostic id of this node.
    pub fn id(&self) -> SignalId {
        self.node.id
    }

    /// Owner currently driving this node, if any.
    pub fn tick_owner(&self) -> Option<OwnerId> {
        self.node.owner.get()
    }

    /// True if both handles refer to the same node.
    pub fn ptr_eq(&self, other: &PeriodicSignal<T>) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }

    /// Claim this node and all of its ancestors for `owner`.
    ///
    /// Nothing is claimed if any node in the chain is already driven by a
    /// different owner. Attaching the same owner twice is a no-op.
    pub fn attach_tick_source(&self, owner: OwnerId) -> SignalResult<()> {
        let mut visited = HashSet::new();
        if let Err(err) = self.node.check_claim(owner, &mut visited) {
            warn!(signal = %self.node.id, %owner, "tick source conflict: {err}");
            return Err(err);
        }
        visited.clear();
        self.node.claim(owner, &mut visited);
        Ok(())
    }

    /// Release this node and its ancestors, but only where `owner` holds them.
    pub fn detach_tick_source(&self, owner: OwnerId) {
        let mut visited = HashSet::new();
        self.node.release(owner, &mut visited);
    }

    /// Value of this node for the pass identified by `token`.
    ///
    /// The first request for a token computes (pulling parents with the same
    /// token), memoizes, then runs the check callback. Later requests with the
    /// same token return the memoized value and skip the check.
    pub fn current_value(&self, dt: Time, token: TickToken) -> T {
        if let Some(memo) = self.node.memo.borrow().as_ref() {
            if memo.token == token {
                return memo.value.clone();
            }
        }

        let value = {
            let mut compute = self.node.compute.borrow_mut();
            (compute.as_mut())(dt, token)
        };

        *self.node.memo.borrow_mut() = Some(Memo {
            token,
            value: value.clone(),
        });

        if let Some(check) = &self.node.check {
            check(&value);
        }

        value
    }
}

impl<T> fmt::Debug for PeriodicSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeriodicSignal")
            .field("id", &self.node.id)
            .field("owner", &self.node.owner.get())
            .field("parents", &self.node.parents.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use td_core::{IdAllocator, s};

    static OWNERS: IdAllocator = IdAllocator::new();

    #[test]
    fn constant_node_yields_value() {
        let node = PeriodicSignal::constant(4.0);
        assert_eq!(node.current_value(s(0.01), TickToken::mint()), 4.0);
    }

    #[test]
    fn memo_hit_skips_recompute() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let node = Signal::variable(move || {
            counter.set(counter.get() + 1);
            counter.get()
        })
        .to_periodic();

        let token = TickToken::mint();
        assert_eq!(node.current_value(s(0.01), token), 1);
        assert_eq!(node.current_value(s(0.01), token), 1);
        assert_eq!(calls.get(), 1);

        assert_eq!(node.current_value(s(0.01), TickToken::mint()), 2);
    }

    #[test]
    fn second_owner_is_rejected() {
        let a = OWNERS.allocate();
        let b = OWNERS.allocate();
        let source = PeriodicSignal::constant(1.0);
        let derived = source.map(|v| v + 1.0);

        derived.attach_tick_source(a).unwrap();
        assert_eq!(source.tick_owner(), Some(a));
        derived.attach_tick_source(a).unwrap();

        let err = source.attach_tick_source(b).unwrap_err();
        assert!(matches!(err, SignalError::OwnershipConflict { .. }));
        assert_eq!(source.tick_owner(), Some(a));
    }

    #[test]
    fn failed_attach_claims_nothing() {
        let a = OWNERS.allocate();
        let b = OWNERS.allocate();
        let shared = PeriodicSignal::constant(1.0);
        let fresh = PeriodicSignal::constant(2.0);
        let zipped = fresh.zip(&shared);

        shared.attach_tick_source(a).unwrap();
        assert!(zipped.attach_tick_source(b).is_err());
        assert_eq!(zipped.tick_owner(), None);
        assert_eq!(fresh.tick_owner(), None);
    }

    #[test]
    fn detach_only_by_matching_owner() {
        let a = OWNERS.allocate();
        let b = OWNERS.allocate();
        let source = PeriodicSignal::constant(1.0);
        let derived = source.map(|v| v * 2.0);
        derived.attach_tick_source(a).unwrap();

        derived.detach_tick_source(b);
        assert_eq!(derived.tick_owner(), Some(a));
        assert_eq!(source.tick_owner(), Some(a));

        derived.detach_tick_source(a);
        assert_eq!(derived.tick_owner(), None);
        assert_eq!(source.tick_owner(), None);

        derived.attach_tick_source(b).unwrap();
        assert_eq!(source.tick_owner(), Some(b));
    }
}
