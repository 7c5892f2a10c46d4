//! Trapezoidal motion profile, recomputed from live state every tick.

use td_core::{Accel, Length, Scalar, Time, Velocity, ensure_finite};
use td_signal::{PeriodicSignal, Signal};
use tracing::debug;

use crate::error::{ControlError, ControlResult};

use super::{ForwardPositionHardware, UnicycleProperties, UnicycleVelocity};

/// Accelerate to a cruising velocity, hold, then decelerate so the robot
/// reaches `distance` at `final_velocity`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrapezoidalProfile {
    pub cruising_velocity: Velocity,
    pub final_velocity: Velocity,
    pub acceleration: Accel,
    /// Signed travel relative to the position when the controller is built.
    pub distance: Length,
    pub tolerance: Length,
}

impl TrapezoidalProfile {
    /// Checks the profile's shape and that it stays inside the drive's
    /// velocity and acceleration limits.
    pub fn validate(&self, limits: &UnicycleProperties) -> ControlResult<()> {
        let cruise = ensure_finite(self.cruising_velocity.base_value(), "cruising velocity")?;
        let last = ensure_finite(self.final_velocity.base_value(), "final velocity")?;
        let accel = ensure_finite(self.acceleration.base_value(), "acceleration")?;
        ensure_finite(self.distance.base_value(), "distance")?;
        let tolerance = ensure_finite(self.tolerance.base_value(), "tolerance")?;

        if cruise <= 0.0 {
            return Err(ControlError::InvalidArg {
                what: "cruising velocity must be positive",
            });
        }
        if self.cruising_velocity > limits.max_forward_velocity {
            return Err(ControlError::InvalidArg {
                what: "cruising velocity exceeds max forward velocity",
            });
        }
        if accel <= 0.0 {
            return Err(ControlError::InvalidArg {
                what: "acceleration must be positive",
            });
        }
        if self.acceleration > limits.max_acceleration {
            return Err(ControlError::InvalidArg {
                what: "acceleration exceeds max acceleration",
            });
        }
        if !(0.0..=cruise).contains(&last) {
            return Err(ControlError::InvalidArg {
                what: "final velocity must be between zero and the cruising velocity",
            });
        }
        if tolerance < 0.0 {
            return Err(ControlError::InvalidArg {
                what: "tolerance must be non-negative",
            });
        }
        Ok(())
    }

    /// Velocity setpoint for the current state.
    ///
    /// The magnitude is the smallest of the cruising velocity, the current
    /// speed plus one step of acceleration, and the speed from which the
    /// robot can still brake to the final velocity within `remaining`. The
    /// sign follows `remaining`.
    pub fn setpoint(&self, remaining: Length, current: Velocity, dt: Time) -> Velocity {
        let accel = self.acceleration.base_value();
        let d = remaining.base_value();
        let vf = self.final_velocity.base_value();

        let ramp_up = current.base_value().abs() + accel * dt.base_value();
        let ramp_down = (vf * vf + 2.0 * accel * d.abs()).sqrt();
        let speed = self.cruising_velocity.base_value().min(ramp_up).min(ramp_down);
        Velocity::from_base(remaining.sign() * speed)
    }

    pub fn within_tolerance(&self, remaining: Length) -> bool {
        remaining.magnitude() <= self.tolerance
    }
}

/// Profiled forward motion: a velocity setpoint to feed the drive's velocity
/// loop, and the remaining distance.
pub struct ProfileControl {
    pub velocity: PeriodicSignal<UnicycleVelocity>,
    pub error: PeriodicSignal<Length>,
}

/// Build a profiled forward move starting from the current position.
///
/// # Errors
///
/// Rejects the profile before building anything if it fails
/// [`TrapezoidalProfile::validate`] against the current drive limits.
pub fn trapezoidal_profile_control(
    hardware: &impl ForwardPositionHardware,
    properties: &Signal<UnicycleProperties>,
    profile: TrapezoidalProfile,
) -> ControlResult<ProfileControl> {
    profile.validate(&properties.get())?;

    let position = hardware.forward_position();
    let target = position.get() + profile.distance;
    debug!(
        distance_m = profile.distance.value,
        cruise_mps = profile.cruising_velocity.value,
        target_m = target.value,
        "trapezoidal profile armed"
    );
    let remaining = position.to_periodic().map(move |p| target - p);
    let velocity = remaining
        .zip(&hardware.forward_velocity().to_periodic())
        .map_with_dt(move |(d, v), dt| {
            UnicycleVelocity::new(profile.setpoint(d, v, dt), Scalar::zero())
        });
    Ok(ProfileControl {
        velocity,
        error: remaining,
    })
}
