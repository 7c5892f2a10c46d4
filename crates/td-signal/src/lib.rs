//! Signal graph primitives for TickDrive.
//!
//! Two kinds of value producers live here:
//!
//! - [`Signal`]: a pull-only "current value of X" with no history. Cheap to
//!   read any number of times; used for sensors and hot-reloadable settings.
//! - [`PeriodicSignal`]: a node in a memoized dataflow graph, evaluated once
//!   per tick by whoever owns it. Stateful operators (windows, derivatives,
//!   integrals) are only available here, because they need exactly one
//!   evaluation per tick.
//!
//! Every evaluation pass carries a [`TickToken`]. Nodes cache the last value
//! per token, so a node read through several branches in one pass is computed
//! once and all readers agree.

pub mod error;
pub mod periodic;
pub mod signal;
pub mod token;

mod combinators;

pub use error::{SignalError, SignalResult};
pub use periodic::PeriodicSignal;
pub use signal::{Signal, Var};
pub use token::TickToken;
