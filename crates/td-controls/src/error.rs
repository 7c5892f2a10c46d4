//! Error types for control system operations.

use td_component::ComponentError;
use td_core::TdError;
use thiserror::Error;

/// Result type for control system operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors that can occur while building or installing a controller.
///
/// Evaluating a control law never fails; these are raised when a controller
/// is constructed from bad parameters or cannot be installed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid argument provided to a control function.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Drivetrain properties are out of range.
    #[error("Invalid properties: {what}")]
    InvalidProperties { what: String },

    #[error(transparent)]
    Numeric(#[from] TdError),

    /// The controller could not be installed on its component.
    #[error(transparent)]
    Component(#[from] ComponentError),
}
