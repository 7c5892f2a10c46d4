//! Unicycle drivetrain model: forward and turn axes, decoupled from the
//! physical actuator layout.
//!
//! Hardware is described by capability traits. Every unicycle exposes
//! velocity feedback; position feedback on either axis is an extra
//! capability, so a mode that needs turn position only accepts hardware that
//! implements [`TurnPositionHardware`].

pub mod drive;
pub mod modes;
pub mod profile;
pub mod pursuit;

use std::ops::Add;

use td_core::{
    Accel, Angle, AngularVelocity, Length, Ratio, Scalar, Velocity, ensure_finite, unitless,
};
use td_signal::Signal;

use crate::error::{ControlError, ControlResult};
use crate::pid::PidConfig;

/// Open-loop command: fraction of full output on each axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnicycleSignal {
    pub forward: Ratio,
    pub turn: Ratio,
}

impl UnicycleSignal {
    pub fn new(forward: Ratio, turn: Ratio) -> Self {
        Self { forward, turn }
    }

    pub fn zero() -> Self {
        Self::new(unitless(0.0), unitless(0.0))
    }
}

impl Add for UnicycleSignal {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.forward + rhs.forward, self.turn + rhs.turn)
    }
}

/// Physical velocity on each axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnicycleVelocity {
    pub forward: Velocity,
    pub turn: AngularVelocity,
}

impl UnicycleVelocity {
    pub fn new(forward: Velocity, turn: AngularVelocity) -> Self {
        Self { forward, turn }
    }

    pub fn zero() -> Self {
        Self::new(Velocity::zero(), AngularVelocity::zero())
    }
}

/// Tunable drivetrain properties. Supplied as a live signal so they can be
/// changed between ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct UnicycleProperties {
    pub max_forward_velocity: Velocity,
    pub max_turn_velocity: AngularVelocity,
    pub max_acceleration: Accel,
    pub default_lookahead: Length,
    /// Feedforward is supplied by the velocity mode itself.
    pub forward_velocity_gains: PidConfig<Velocity>,
    pub turn_velocity_gains: PidConfig<AngularVelocity>,
    pub forward_position_gains: PidConfig<Length>,
    pub turn_position_gains: PidConfig<Angle>,
}

impl UnicycleProperties {
    pub fn validate(&self) -> ControlResult<()> {
        positive(self.max_forward_velocity, "max forward velocity")?;
        positive(self.max_turn_velocity, "max turn velocity")?;
        positive(self.max_acceleration, "max acceleration")?;
        positive(self.default_lookahead, "default lookahead")?;
        self.forward_velocity_gains.validate()?;
        self.turn_velocity_gains.validate()?;
        self.forward_position_gains.validate()?;
        self.turn_position_gains.validate()?;
        Ok(())
    }
}

fn positive<T: Scalar>(value: T, what: &'static str) -> ControlResult<()> {
    let v = ensure_finite(value.base_value(), what)?;
    if v <= 0.0 {
        return Err(ControlError::InvalidProperties {
            what: format!("{what} must be positive, got {v}"),
        });
    }
    Ok(())
}

/// Velocity feedback, available on every unicycle.
pub trait UnicycleHardware {
    fn forward_velocity(&self) -> Signal<Velocity>;
    fn turn_velocity(&self) -> Signal<AngularVelocity>;
}

/// Hardware with forward distance feedback (e.g. averaged wheel encoders).
pub trait ForwardPositionHardware: UnicycleHardware {
    fn forward_position(&self) -> Signal<Length>;
}

/// Hardware with heading feedback (e.g. a gyro).
pub trait TurnPositionHardware: UnicycleHardware {
    fn turn_position(&self) -> Signal<Angle>;
}

/// Full sensor set: velocity and position on both axes.
#[derive(Debug, Clone)]
pub struct UnicycleSensors {
    pub forward_velocity: Signal<Velocity>,
    pub turn_velocity: Signal<AngularVelocity>,
    pub forward_position: Signal<Length>,
    pub turn_position: Signal<Angle>,
}

impl UnicycleHardware for UnicycleSensors {
    fn forward_velocity(&self) -> Signal<Velocity> {
        self.forward_velocity.clone()
    }

    fn turn_velocity(&self) -> Signal<AngularVelocity> {
        self.turn_velocity.clone()
    }
}

impl ForwardPositionHardware for UnicycleSensors {
    fn forward_position(&self) -> Signal<Length> {
        self.forward_position.clone()
    }
}

impl TurnPositionHardware for UnicycleSensors {
    fn turn_position(&self) -> Signal<Angle> {
        self.turn_position.clone()
    }
}

/// Velocity-only sensor set.
#[derive(Debug, Clone)]
pub struct VelocitySensors {
    pub forward_velocity: Signal<Velocity>,
    pub turn_velocity: Signal<AngularVelocity>,
}

impl UnicycleHardware for VelocitySensors {
    fn forward_velocity(&self) -> Signal<Velocity> {
        self.forward_velocity.clone()
    }

    fn turn_velocity(&self) -> Signal<AngularVelocity> {
        self.turn_velocity.clone()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::pid::Gain;
    use td_core::{deg, dps, m, mps, mps2, percent};

    /// Properties used across unit tests: position gains of 100% per 10 m and
    /// 100% per 10 degrees, velocity loops with no feedback gains.
    pub(crate) fn properties() -> UnicycleProperties {
        UnicycleProperties {
            max_forward_velocity: mps(2.0),
            max_turn_velocity: dps(180.0),
            max_acceleration: mps2(1.0),
            default_lookahead: m(0.5),
            forward_velocity_gains: PidConfig::zero(),
            turn_velocity_gains: PidConfig::zero(),
            forward_position_gains: PidConfig::proportional(Gain::new(percent(100.0), m(10.0))),
            turn_position_gains: PidConfig::proportional(Gain::new(percent(100.0), deg(10.0))),
        }
    }
}
