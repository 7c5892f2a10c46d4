//! Task state machine for TickDrive.
//!
//! Tasks decide which controller graph is installed on a drivetrain
//! component:
//! - [`ContinuousTask`]: installs on start, restores the default on end
//! - [`FiniteTask`]: additionally finishes on its own, notifying listeners
//!   exactly once per run
//! - [`SequentialTask`]: runs two finite tasks back to back, nestable
//!
//! [`drive`] holds the stock drivetrain tasks built on `td-controls`.

pub mod continuous;
pub mod drive;
pub mod error;
pub mod finite;
pub mod sequential;
pub mod task;

pub use continuous::{ContinuousBody, ContinuousTask};
pub use drive::{
    DriveDistance, DriveOpenLoop, DriveVelocity, DriveWithTrapezoidalProfile, FollowWaypoints,
    RotateByAngle, TrackTurnOffset, Wait,
};
pub use error::{TaskError, TaskResult};
pub use finite::{FiniteBody, FiniteTask, Finisher};
pub use sequential::{Phase, SequentialTask};
pub use task::{Task, TaskState};
