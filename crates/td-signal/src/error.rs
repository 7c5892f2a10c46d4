//! Error types for signal graph operations.

use td_core::{OwnerId, SignalId};
use thiserror::Error;

/// Result type for signal graph operations.
pub type SignalResult<T> = Result<T, SignalError>;

/// Errors that can occur while wiring a signal graph to a tick source.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SignalError {
    /// A node in the graph is already driven by a different owner.
    #[error("Signal {node} is already ticked by owner {current}, cannot attach owner {requested}")]
    OwnershipConflict {
        node: SignalId,
        current: OwnerId,
        requested: OwnerId,
    },
}
