//! Control laws and drivetrain control modes for TickDrive.
//!
//! Everything here is a factory for [`td_signal::PeriodicSignal`] graphs:
//! - [`pid`]: the PID law over typed quantities
//! - [`unicycle`]: open-loop, velocity, position, latency-compensated,
//!   profiled and pure-pursuit modes for unicycle drivetrains, plus the
//!   [`UnicycleDrive`] abstraction and a two-sided implementation
//!
//! Building a controller may fail on bad parameters ([`ControlError`]);
//! evaluating one never does.

pub mod error;
pub mod pid;
pub mod unicycle;

pub use error::{ControlError, ControlResult};
pub use pid::{Gain, PidConfig, pid};
pub use unicycle::drive::{TwoSidedDrive, TwoSidedSignal, UnicycleDrive};
pub use unicycle::modes::{
    PositionControl, continuous_turn_position_control, forward_position_control,
    forward_position_tracking, open_loop, turn_position_control, turn_position_tracking,
    velocity_control,
};
pub use unicycle::profile::{ProfileControl, TrapezoidalProfile, trapezoidal_profile_control};
pub use unicycle::pursuit::{
    AxisError, Point, Pose, PursuitControl, curvature, lookahead_point, pure_pursuit_control,
    xy_position,
};
pub use unicycle::{
    ForwardPositionHardware, TurnPositionHardware, UnicycleHardware, UnicycleProperties,
    UnicycleSensors, UnicycleSignal, UnicycleVelocity, VelocitySensors,
};
