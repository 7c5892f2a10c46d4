//! Drivetrains: lowering unicycle commands onto actuator layouts.

use std::time::Duration;

use td_component::{Actuator, Clock, Component};
use td_core::{Ratio, Scalar, unitless};
use td_signal::{PeriodicSignal, Signal};

use crate::error::ControlResult;

use super::modes::velocity_control;
use super::{UnicycleHardware, UnicycleProperties, UnicycleSignal, UnicycleVelocity};

/// A drivetrain that accepts unicycle commands.
///
/// Concrete drivetrains own the conversion from the unicycle representation
/// to their own actuator representation.
pub trait UnicycleDrive {
    type Hardware: UnicycleHardware;
    type Output: Clone + 'static;

    fn hardware(&self) -> &Self::Hardware;
    fn properties(&self) -> &Signal<UnicycleProperties>;
    fn component(&self) -> &Component<Self::Output>;

    /// Convert an open-loop unicycle controller to this drivetrain's output.
    fn lower_level_open_loop(
        &self,
        command: &PeriodicSignal<UnicycleSignal>,
    ) -> PeriodicSignal<Self::Output>;

    /// Close the velocity loop, then lower the result as open loop.
    fn lower_level_velocity_control(
        &self,
        target: &PeriodicSignal<UnicycleVelocity>,
    ) -> PeriodicSignal<Self::Output> {
        self.lower_level_open_loop(&velocity_control(
            self.hardware(),
            self.properties(),
            target,
        ))
    }
}

/// Left/right output for a skid-steer or tank drivetrain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoSidedSignal {
    pub left: Ratio,
    pub right: Ratio,
}

impl TwoSidedSignal {
    pub fn zero() -> Self {
        Self {
            left: unitless(0.0),
            right: unitless(0.0),
        }
    }

    pub fn to_unicycle(self) -> UnicycleSignal {
        UnicycleSignal::new(
            (self.left + self.right).scale(0.5),
            (self.right - self.left).scale(0.5),
        )
    }
}

impl From<UnicycleSignal> for TwoSidedSignal {
    /// Positive turn speeds up the right side.
    fn from(signal: UnicycleSignal) -> Self {
        Self {
            left: signal.forward - signal.turn,
            right: signal.forward + signal.turn,
        }
    }
}

/// Two-sided drivetrain driven by a single component.
pub struct TwoSidedDrive<H> {
    hardware: H,
    properties: Signal<UnicycleProperties>,
    component: Component<TwoSidedSignal>,
}

impl<H: UnicycleHardware> TwoSidedDrive<H> {
    /// Build the drive and its component. Properties are validated once here;
    /// later changes to the signal are trusted.
    pub fn new(
        name: impl Into<String>,
        hardware: H,
        properties: Signal<UnicycleProperties>,
        period: Duration,
        actuator: impl Actuator<TwoSidedSignal> + 'static,
        clock: &dyn Clock,
    ) -> ControlResult<Self> {
        properties.get().validate()?;
        let component = Component::new(
            name,
            period,
            PeriodicSignal::constant(TwoSidedSignal::zero()),
            actuator,
            clock,
        )?;
        Ok(Self {
            hardware,
            properties,
            component,
        })
    }
}

impl<H: UnicycleHardware> UnicycleDrive for TwoSidedDrive<H> {
    type Hardware = H;
    type Output = TwoSidedSignal;

    fn hardware(&self) -> &H {
        &self.hardware
    }

    fn properties(&self) -> &Signal<UnicycleProperties> {
        &self.properties
    }

    fn component(&self) -> &Component<TwoSidedSignal> {
        &self.component
    }

    fn lower_level_open_loop(
        &self,
        command: &PeriodicSignal<UnicycleSignal>,
    ) -> PeriodicSignal<TwoSidedSignal> {
        command.map(TwoSidedSignal::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unicycle::VelocitySensors;
    use crate::unicycle::fixtures::properties;
    use std::cell::RefCell;
    use std::rc::Rc;
    use td_component::ManualClock;
    use td_core::{dps, mps, percent};

    #[test]
    fn unicycle_to_two_sided_and_back() {
        let cmd = UnicycleSignal::new(percent(50.0), percent(20.0));
        let sides = TwoSidedSignal::from(cmd);
        assert!((sides.left.value - 0.3).abs() < 1e-12);
        assert!((sides.right.value - 0.7).abs() < 1e-12);

        let back = sides.to_unicycle();
        assert!((back.forward.value - 0.5).abs() < 1e-12);
        assert!((back.turn.value - 0.2).abs() < 1e-12);
    }

    #[test]
    fn velocity_control_lowers_to_sides() {
        let clock = ManualClock::new();
        let applied = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&applied);
        let drive = TwoSidedDrive::new(
            "drive",
            VelocitySensors {
                forward_velocity: Signal::constant(mps(0.0)),
                turn_velocity: Signal::constant(dps(0.0)),
            },
            Signal::constant(properties()),
            Duration::from_millis(20),
            move |s: &TwoSidedSignal| sink.borrow_mut().push(*s),
            &clock,
        )
        .unwrap();

        let target = PeriodicSignal::constant(UnicycleVelocity::new(mps(1.0), dps(0.0)));
        drive
            .component()
            .set_controller(drive.lower_level_velocity_control(&target))
            .unwrap();
        clock.advance(Duration::from_millis(20));

        let last = *applied.borrow().last().unwrap();
        assert!((last.left.value - 0.5).abs() < 1e-12);
        assert!((last.right.value - 0.5).abs() < 1e-12);
    }

    #[test]
    fn invalid_properties_rejected_at_construction() {
        let clock = ManualClock::new();
        let mut props = properties();
        props.max_turn_velocity = dps(-1.0);
        let result = TwoSidedDrive::new(
            "drive",
            VelocitySensors {
                forward_velocity: Signal::constant(mps(0.0)),
                turn_velocity: Signal::constant(dps(0.0)),
            },
            Signal::constant(props),
            Duration::from_millis(20),
            |_: &TwoSidedSignal| {},
            &clock,
        );
        assert!(result.is_err());
    }
}
