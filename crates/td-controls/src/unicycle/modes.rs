//! Control modes expressed as periodic signal factories.
//!
//! Every mode reads hardware signals and a live properties signal, and
//! returns a controller graph. Modes producing an open-loop
//! [`UnicycleSignal`] are lowered with
//! [`UnicycleDrive::lower_level_open_loop`](super::drive::UnicycleDrive::lower_level_open_loop);
//! modes producing a [`UnicycleVelocity`] go through the drive's velocity
//! loop.

use std::collections::VecDeque;

use td_core::{
    Angle, Length, Ratio, Scalar, Time, TimeCalculus, inverse_lerp, lerp, percent, unitless,
};
use td_signal::{PeriodicSignal, Signal};

use crate::error::{ControlError, ControlResult};
use crate::pid::{Gain, PidConfig, pid};

use super::{
    ForwardPositionHardware, TurnPositionHardware, UnicycleHardware, UnicycleProperties,
    UnicycleSignal, UnicycleVelocity,
};

/// Position controller plus a live view of the remaining error.
pub struct PositionControl<E> {
    pub control: PeriodicSignal<UnicycleSignal>,
    /// `target - position`, read on demand.
    pub error: E,
}

/// Open loop: commands pass through unchanged.
pub fn open_loop(command: &Signal<UnicycleSignal>) -> PeriodicSignal<UnicycleSignal> {
    command.to_periodic()
}

/// Closed-loop velocity control on both axes.
///
/// Each axis gets feedforward `target / max velocity` plus PID correction
/// from the velocity gains; the axes are independent.
pub fn velocity_control(
    hardware: &impl UnicycleHardware,
    properties: &Signal<UnicycleProperties>,
    target: &PeriodicSignal<UnicycleVelocity>,
) -> PeriodicSignal<UnicycleSignal> {
    let forward = pid(
        &hardware.forward_velocity().to_periodic(),
        &target.map(|t| t.forward),
        &properties.map(|p| {
            p.forward_velocity_gains
                .with_feedforward(Gain::new(percent(100.0), p.max_forward_velocity))
        }),
    );
    let turn = pid(
        &hardware.turn_velocity().to_periodic(),
        &target.map(|t| t.turn),
        &properties.map(|p| {
            p.turn_velocity_gains
                .with_feedforward(Gain::new(percent(100.0), p.max_turn_velocity))
        }),
    );
    forward
        .zip(&turn)
        .map(|(forward, turn)| UnicycleSignal::new(forward, turn))
}

/// Drive the forward axis to the absolute position `target`.
pub fn forward_position_control(
    hardware: &impl ForwardPositionHardware,
    properties: &Signal<UnicycleProperties>,
    target: Length,
) -> PositionControl<Signal<Length>> {
    let position = hardware.forward_position();
    let forward = pid(
        &position.to_periodic(),
        &PeriodicSignal::constant(target),
        &properties.map(|p| p.forward_position_gains),
    );
    PositionControl {
        control: forward.map(|f| UnicycleSignal::new(f, unitless(0.0))),
        error: position.map(move |p| target - p),
    }
}

/// Drive the turn axis to the absolute heading `target`.
pub fn turn_position_control(
    hardware: &impl TurnPositionHardware,
    properties: &Signal<UnicycleProperties>,
    target: Angle,
) -> PositionControl<Signal<Angle>> {
    let heading = hardware.turn_position();
    let turn = pid(
        &heading.to_periodic(),
        &PeriodicSignal::constant(target),
        &properties.map(|p| p.turn_position_gains),
    );
    PositionControl {
        control: turn.map(|t| UnicycleSignal::new(unitless(0.0), t)),
        error: heading.map(move |h| target - h),
    }
}

/// Forward position control towards a moving target.
pub fn forward_position_tracking(
    hardware: &impl ForwardPositionHardware,
    properties: &Signal<UnicycleProperties>,
    target: &PeriodicSignal<Length>,
) -> PositionControl<PeriodicSignal<Length>> {
    let (forward, error) = tracking_loop(
        hardware.forward_position().to_periodic(),
        target,
        properties.map(|p| p.forward_position_gains),
    );
    PositionControl {
        control: forward.map(|f| UnicycleSignal::new(f, unitless(0.0))),
        error,
    }
}

/// Turn position control towards a moving target.
pub fn turn_position_tracking(
    hardware: &impl TurnPositionHardware,
    properties: &Signal<UnicycleProperties>,
    target: &PeriodicSignal<Angle>,
) -> PositionControl<PeriodicSignal<Angle>> {
    let (turn, error) = tracking_loop(
        hardware.turn_position().to_periodic(),
        target,
        properties.map(|p| p.turn_position_gains),
    );
    PositionControl {
        control: turn.map(|t| UnicycleSignal::new(unitless(0.0), t)),
        error,
    }
}

fn tracking_loop<T: TimeCalculus>(
    measurement: PeriodicSignal<T>,
    target: &PeriodicSignal<T>,
    gains: Signal<PidConfig<T>>,
) -> (PeriodicSignal<Ratio>, PeriodicSignal<T>) {
    let error = target.zip(&measurement).map(|(t, m)| t - m);
    (pid(&measurement, target, &gains), error)
}

/// Latency-compensated heading control.
///
/// `offset` carries a heading offset together with the time it was measured
/// (for example a vision target angle and its capture timestamp). The node
/// keeps the last `history` `(heading, time)` samples, looks up where the
/// robot was pointing when the offset was measured, and targets that heading
/// plus the offset. Returns the controller and the live remaining error.
pub fn continuous_turn_position_control(
    hardware: &impl TurnPositionHardware,
    properties: &Signal<UnicycleProperties>,
    offset: &Signal<(Angle, Time)>,
    now: &Signal<Time>,
    history: usize,
) -> ControlResult<PositionControl<PeriodicSignal<Angle>>> {
    if history == 0 {
        return Err(ControlError::InvalidArg {
            what: "heading history must hold at least one sample",
        });
    }
    let samples = hardware.turn_position().zip(now).to_periodic();
    let heading = samples.map(|(heading, _)| heading);
    let target = samples
        .map(Some)
        .sliding(history, None)
        .zip(&offset.to_periodic())
        .map(|(window, (offset, measured_at))| {
            heading_at(&window, measured_at).map_or(offset, |past| past + offset)
        });

    let (turn, error) = tracking_loop(heading, &target, properties.map(|p| p.turn_position_gains));
    Ok(PositionControl {
        control: turn.map(|t| UnicycleSignal::new(unitless(0.0), t)),
        error,
    })
}

/// Heading at `at`, interpolated between the bracketing samples and held at
/// the ends of the window.
fn heading_at(window: &VecDeque<Option<(Angle, Time)>>, at: Time) -> Option<Angle> {
    let samples: Vec<(Angle, Time)> = window.iter().flatten().copied().collect();
    let (oldest, newest) = (samples.first()?, samples.last()?);
    if at <= oldest.1 {
        return Some(oldest.0);
    }
    if at >= newest.1 {
        return Some(newest.0);
    }
    samples.windows(2).find_map(|pair| {
        let ((a, ta), (b, tb)) = (pair[0], pair[1]);
        (ta <= at && at <= tb).then(|| {
            let frac = inverse_lerp(ta.base_value(), tb.base_value(), at.base_value());
            Angle::from_base(lerp(a.base_value(), b.base_value(), frac))
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unicycle::fixtures::properties;
    use crate::unicycle::{UnicycleSensors, VelocitySensors};
    use td_core::{AngularVelocity, Velocity, deg, dps, m, mps, s};
    use td_signal::{TickToken, Var};

    struct Rig {
        forward_velocity: Var<Velocity>,
        turn_velocity: Var<AngularVelocity>,
        forward_position: Var<Length>,
        turn_position: Var<Angle>,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                forward_velocity: Var::new(mps(0.0)),
                turn_velocity: Var::new(dps(0.0)),
                forward_position: Var::new(m(0.0)),
                turn_position: Var::new(deg(0.0)),
            }
        }

        fn sensors(&self) -> UnicycleSensors {
            UnicycleSensors {
                forward_velocity: self.forward_velocity.signal(),
                turn_velocity: self.turn_velocity.signal(),
                forward_position: self.forward_position.signal(),
                turn_position: self.turn_position.signal(),
            }
        }
    }

    fn tick<T: Clone + 'static>(node: &PeriodicSignal<T>) -> T {
        node.current_value(s(0.02), TickToken::mint())
    }

    #[test]
    fn open_loop_passes_through() {
        let cmd = UnicycleSignal::new(percent(30.0), percent(-10.0));
        let node = open_loop(&Signal::constant(cmd));
        assert_eq!(tick(&node), cmd);
    }

    #[test]
    fn forward_position_at_target_is_zero() {
        let rig = Rig::new();
        rig.forward_position.set(m(3.0));
        let mode = forward_position_control(&rig.sensors(), &Signal::constant(properties()), m(3.0));
        assert_eq!(tick(&mode.control).forward.value, 0.0);
        assert_eq!(mode.error.get().value, 0.0);
    }

    #[test]
    fn forward_position_five_ahead_is_half() {
        let rig = Rig::new();
        let mode = forward_position_control(&rig.sensors(), &Signal::constant(properties()), m(5.0));
        let out = tick(&mode.control);
        assert!((out.forward.value - 0.5).abs() < 1e-12);
        assert_eq!(out.turn.value, 0.0);
        assert!((mode.error.get().value - 5.0).abs() < 1e-12);
    }

    #[test]
    fn velocity_feedforward_only() {
        let rig = Rig::new();
        rig.forward_velocity.set(mps(0.3));
        let sensors = VelocitySensors {
            forward_velocity: rig.forward_velocity.signal(),
            turn_velocity: rig.turn_velocity.signal(),
        };
        let target = PeriodicSignal::constant(UnicycleVelocity::new(mps(1.0), dps(-90.0)));
        let node = velocity_control(&sensors, &Signal::constant(properties()), &target);
        let out = tick(&node);
        assert!((out.forward.value - 0.5).abs() < 1e-12);
        assert!((out.turn.value + 0.5).abs() < 1e-12);
    }

    #[test]
    fn tracking_error_follows_target() {
        let rig = Rig::new();
        let target = Var::new(deg(4.0));
        let mode = turn_position_tracking(
            &rig.sensors(),
            &Signal::constant(properties()),
            &target.signal().to_periodic(),
        );
        let token = TickToken::mint();
        let out = mode.control.current_value(s(0.02), token);
        assert!((out.turn.value - 0.4).abs() < 1e-9);
        assert!((mode.error.current_value(s(0.02), token).value - deg(4.0).value).abs() < 1e-12);
    }

    #[test]
    fn heading_interpolates_within_window() {
        let window: VecDeque<_> = [
            None,
            Some((deg(0.0), s(0.0))),
            Some((deg(10.0), s(1.0))),
        ]
        .into_iter()
        .collect();
        let mid = heading_at(&window, s(0.25)).unwrap();
        assert!((mid.value - deg(2.5).value).abs() < 1e-12);
        assert_eq!(heading_at(&window, s(-1.0)).unwrap(), deg(0.0));
        assert_eq!(heading_at(&window, s(5.0)).unwrap(), deg(10.0));
        assert!(heading_at(&VecDeque::from([None, None]), s(0.0)).is_none());
    }

    #[test]
    fn continuous_turn_compensates_latency() {
        let rig = Rig::new();
        let now = Var::new(s(0.0));
        // Target was 5 degrees right of where we pointed at t = 0.
        let offset = Signal::constant((deg(5.0), s(0.0)));
        let mode = continuous_turn_position_control(
            &rig.sensors(),
            &Signal::constant(properties()),
            &offset,
            &now.signal(),
            10,
        )
        .unwrap();

        tick(&mode.control);
        // The robot has since turned 2 degrees; only 3 remain.
        rig.turn_position.set(deg(2.0));
        now.set(s(0.02));
        let token = TickToken::mint();
        let out = mode.control.current_value(s(0.02), token);
        let error = mode.error.current_value(s(0.02), token);
        assert!((error.value - deg(3.0).value).abs() < 1e-12);
        assert!((out.turn.value - 0.3).abs() < 1e-9);
    }

    #[test]
    fn continuous_turn_rejects_empty_history() {
        let rig = Rig::new();
        let result = continuous_turn_position_control(
            &rig.sensors(),
            &Signal::constant(properties()),
            &Signal::constant((deg(0.0), s(0.0))),
            &Signal::constant(s(0.0)),
            0,
        );
        assert!(result.is_err());
    }
}
