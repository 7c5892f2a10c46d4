//! Error types for component scheduling.

use td_signal::SignalError;
use thiserror::Error;

/// Result type for component operations.
pub type ComponentResult<T> = Result<T, ComponentError>;

/// Errors that can occur while configuring or rewiring a component.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ComponentError {
    /// Installing a controller collided with another tick source.
    #[error(transparent)]
    Signal(#[from] SignalError),

    /// Invalid argument provided to a component or clock.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}
