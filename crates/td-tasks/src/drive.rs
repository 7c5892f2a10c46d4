//! Drivetrain tasks built on the unicycle control modes.
//!
//! Each task installs one controller on its drive's component when started
//! and releases it when it ends. Releasing only restores the default
//! controller if this task's controller is still the active one, so a task
//! started from a completion listener is never clobbered by the task that
//! just finished.

use std::rc::Rc;
use std::time::Duration;

use td_component::{Clock, Component, SampleConfig, Subscription};
use td_controls::{
    ControlError, ForwardPositionHardware, Point, Pose, TrapezoidalProfile, TurnPositionHardware,
    UnicycleDrive, UnicycleSignal, UnicycleVelocity, continuous_turn_position_control,
    forward_position_control, open_loop, pure_pursuit_control, trapezoidal_profile_control,
    turn_position_control,
};
use td_core::{Angle, Length, Ratio, Scalar, Time, ensure_finite};
use td_signal::{PeriodicSignal, Signal};
use tracing::{debug, warn};

use crate::continuous::ContinuousBody;
use crate::error::TaskResult;
use crate::finite::{FiniteBody, Finisher};

/// The controller a task has installed, if any.
struct ControllerSlot<O> {
    installed: Option<(Component<O>, PeriodicSignal<O>)>,
}

impl<O: Clone + 'static> ControllerSlot<O> {
    fn new() -> Self {
        Self { installed: None }
    }

    fn install(&mut self, component: &Component<O>, controller: PeriodicSignal<O>) -> TaskResult<()> {
        component.set_controller(controller.clone())?;
        self.installed = Some((component.clone(), controller));
        Ok(())
    }

    fn release(&mut self) {
        if let Some((component, controller)) = self.installed.take() {
            match component.release(&controller) {
                Ok(true) => debug!(component = %component.name(), "default controller restored"),
                Ok(false) => {}
                Err(err) => warn!(component = %component.name(), "failed to restore default: {err}"),
            }
        }
    }
}

fn non_negative<T: Scalar>(value: T, what: &'static str) -> TaskResult<()> {
    let v = ensure_finite(value.base_value(), what).map_err(ControlError::from)?;
    if v < 0.0 {
        return Err(ControlError::InvalidArg { what }.into());
    }
    Ok(())
}

/// Teleoperation: forwards a live open-loop command.
pub struct DriveOpenLoop<D: UnicycleDrive> {
    drive: Rc<D>,
    command: Signal<UnicycleSignal>,
    slot: ControllerSlot<D::Output>,
}

impl<D: UnicycleDrive> DriveOpenLoop<D> {
    pub fn new(drive: Rc<D>, command: Signal<UnicycleSignal>) -> Self {
        Self {
            drive,
            command,
            slot: ControllerSlot::new(),
        }
    }
}

impl<D: UnicycleDrive> ContinuousBody for DriveOpenLoop<D> {
    fn on_start(&mut self) -> TaskResult<()> {
        let controller = self.drive.lower_level_open_loop(&open_loop(&self.command));
        self.slot.install(self.drive.component(), controller)
    }

    fn on_end(&mut self) {
        self.slot.release();
    }
}

/// Closed-loop velocity following a live target.
pub struct DriveVelocity<D: UnicycleDrive> {
    drive: Rc<D>,
    target: Signal<UnicycleVelocity>,
    slot: ControllerSlot<D::Output>,
}

impl<D: UnicycleDrive> DriveVelocity<D> {
    pub fn new(drive: Rc<D>, target: Signal<UnicycleVelocity>) -> Self {
        Self {
            drive,
            target,
            slot: ControllerSlot::new(),
        }
    }
}

impl<D: UnicycleDrive> ContinuousBody for DriveVelocity<D> {
    fn on_start(&mut self) -> TaskResult<()> {
        let controller = self
            .drive
            .lower_level_velocity_control(&self.target.to_periodic());
        self.slot.install(self.drive.component(), controller)
    }

    fn on_end(&mut self) {
        self.slot.release();
    }
}

/// Keep the heading on a latency-compensated target offset.
pub struct TrackTurnOffset<D: UnicycleDrive> {
    drive: Rc<D>,
    offset: Signal<(Angle, Time)>,
    now: Signal<Time>,
    history: usize,
    slot: ControllerSlot<D::Output>,
}

impl<D: UnicycleDrive> TrackTurnOffset<D>
where
    D::Hardware: TurnPositionHardware,
{
    /// `history` is the number of past heading samples kept for latency
    /// lookup; it must be positive.
    pub fn new(
        drive: Rc<D>,
        offset: Signal<(Angle, Time)>,
        now: Signal<Time>,
        history: usize,
    ) -> TaskResult<Self> {
        if history == 0 {
            return Err(ControlError::InvalidArg {
                what: "heading history must hold at least one sample",
            }
            .into());
        }
        Ok(Self {
            drive,
            offset,
            now,
            history,
            slot: ControllerSlot::new(),
        })
    }
}

impl<D: UnicycleDrive> ContinuousBody for TrackTurnOffset<D>
where
    D::Hardware: TurnPositionHardware,
{
    fn on_start(&mut self) -> TaskResult<()> {
        let mode = continuous_turn_position_control(
            self.drive.hardware(),
            self.drive.properties(),
            &self.offset,
            &self.now,
            self.history,
        )?;
        let controller = self.drive.lower_level_open_loop(&mode.control);
        self.slot.install(self.drive.component(), controller)
    }

    fn on_end(&mut self) {
        self.slot.release();
    }
}

/// Drive forward by a relative distance and stop within `tolerance`.
pub struct DriveDistance<D: UnicycleDrive> {
    drive: Rc<D>,
    distance: Length,
    tolerance: Length,
    slot: ControllerSlot<D::Output>,
}

impl<D: UnicycleDrive> DriveDistance<D>
where
    D::Hardware: ForwardPositionHardware,
{
    pub fn new(drive: Rc<D>, distance: Length, tolerance: Length) -> TaskResult<Self> {
        ensure_finite(distance.base_value(), "distance").map_err(ControlError::from)?;
        non_negative(tolerance, "distance tolerance must be non-negative")?;
        Ok(Self {
            drive,
            distance,
            tolerance,
            slot: ControllerSlot::new(),
        })
    }
}

impl<D: UnicycleDrive> FiniteBody for DriveDistance<D>
where
    D::Hardware: ForwardPositionHardware,
{
    fn on_start(&mut self, finisher: Finisher) -> TaskResult<()> {
        let hardware = self.drive.hardware();
        let target = hardware.forward_position().get() + self.distance;
        let mode = forward_position_control(hardware, self.drive.properties(), target);

        let (error, tolerance) = (mode.error, self.tolerance);
        let controller = self
            .drive
            .lower_level_open_loop(&mode.control)
            .with_check(move |_| {
                if error.get().magnitude() <= tolerance {
                    finisher.finish();
                }
            });
        self.slot.install(self.drive.component(), controller)
    }

    fn on_end(&mut self) {
        self.slot.release();
    }
}

/// Turn by a relative angle and stop within `tolerance`.
pub struct RotateByAngle<D: UnicycleDrive> {
    drive: Rc<D>,
    angle: Angle,
    tolerance: Angle,
    slot: ControllerSlot<D::Output>,
}

impl<D: UnicycleDrive> RotateByAngle<D>
where
    D::Hardware: TurnPositionHardware,
{
    pub fn new(drive: Rc<D>, angle: Angle, tolerance: Angle) -> TaskResult<Self> {
        ensure_finite(angle.base_value(), "angle").map_err(ControlError::from)?;
        non_negative(tolerance, "angle tolerance must be non-negative")?;
        Ok(Self {
            drive,
            angle,
            tolerance,
            slot: ControllerSlot::new(),
        })
    }
}

impl<D: UnicycleDrive> FiniteBody for RotateByAngle<D>
where
    D::Hardware: TurnPositionHardware,
{
    fn on_start(&mut self, finisher: Finisher) -> TaskResult<()> {
        let hardware = self.drive.hardware();
        let target = hardware.turn_position().get() + self.angle;
        let mode = turn_position_control(hardware, self.drive.properties(), target);

        let (error, tolerance) = (mode.error, self.tolerance);
        let controller = self
            .drive
            .lower_level_open_loop(&mode.control)
            .with_check(move |_| {
                if error.get().magnitude() <= tolerance {
                    finisher.finish();
                }
            });
        self.slot.install(self.drive.component(), controller)
    }

    fn on_end(&mut self) {
        self.slot.release();
    }
}

/// Profiled forward move through the drive's velocity loop.
pub struct DriveWithTrapezoidalProfile<D: UnicycleDrive> {
    drive: Rc<D>,
    profile: TrapezoidalProfile,
    slot: ControllerSlot<D::Output>,
}

impl<D: UnicycleDrive> DriveWithTrapezoidalProfile<D>
where
    D::Hardware: ForwardPositionHardware,
{
    /// Rejects a profile that exceeds the drive's max forward velocity or
    /// max acceleration, before anything is installed.
    pub fn new(drive: Rc<D>, profile: TrapezoidalProfile) -> TaskResult<Self> {
        profile.validate(&drive.properties().get())?;
        Ok(Self {
            drive,
            profile,
            slot: ControllerSlot::new(),
        })
    }
}

impl<D: UnicycleDrive> FiniteBody for DriveWithTrapezoidalProfile<D>
where
    D::Hardware: ForwardPositionHardware,
{
    fn on_start(&mut self, finisher: Finisher) -> TaskResult<()> {
        let control = trapezoidal_profile_control(
            self.drive.hardware(),
            self.drive.properties(),
            self.profile,
        )?;
        let profile = self.profile;
        let setpoint = control
            .velocity
            .zip(&control.error)
            .with_check(move |(_, remaining)| {
                if profile.within_tolerance(*remaining) {
                    finisher.finish();
                }
            })
            .map(|(velocity, _)| velocity);
        let controller = self.drive.lower_level_velocity_control(&setpoint);
        self.slot.install(self.drive.component(), controller)
    }

    fn on_end(&mut self) {
        self.slot.release();
    }
}

/// Pure-pursuit along waypoints until every axis is within `tolerance` of the
/// last one.
pub struct FollowWaypoints<D: UnicycleDrive> {
    drive: Rc<D>,
    waypoints: Vec<Point>,
    start: Signal<Pose>,
    tolerance: Length,
    max_output: Ratio,
    slot: ControllerSlot<D::Output>,
}

impl<D: UnicycleDrive> FollowWaypoints<D> {
    /// `start` is read once per run to seed dead reckoning.
    pub fn new(
        drive: Rc<D>,
        waypoints: Vec<Point>,
        start: Signal<Pose>,
        tolerance: Length,
        max_output: Ratio,
    ) -> TaskResult<Self> {
        if waypoints.is_empty() {
            return Err(ControlError::InvalidArg {
                what: "pure pursuit needs at least one waypoint",
            }
            .into());
        }
        non_negative(tolerance, "waypoint tolerance must be non-negative")?;
        if !(max_output.base_value() > 0.0 && max_output.base_value().is_finite()) {
            return Err(ControlError::InvalidArg {
                what: "max output must be positive",
            }
            .into());
        }
        Ok(Self {
            drive,
            waypoints,
            start,
            tolerance,
            max_output,
            slot: ControllerSlot::new(),
        })
    }
}

impl<D: UnicycleDrive> FiniteBody for FollowWaypoints<D> {
    fn on_start(&mut self, finisher: Finisher) -> TaskResult<()> {
        let pursuit = pure_pursuit_control(
            self.drive.hardware(),
            self.drive.properties(),
            &self.waypoints,
            self.start.get(),
            self.max_output,
        )?;
        let tolerance = self.tolerance;
        let command = pursuit
            .control
            .zip(&pursuit.error)
            .with_check(move |(_, error)| {
                if error.within(tolerance) {
                    finisher.finish();
                }
            })
            .map(|(command, _)| command);
        let controller = self.drive.lower_level_open_loop(&command);
        self.slot.install(self.drive.component(), controller)
    }

    fn on_end(&mut self) {
        self.slot.release();
    }
}

/// Finish after a fixed duration on a clock.
pub struct Wait<C: Clock> {
    clock: C,
    duration: Duration,
    subscription: Option<Subscription>,
}

impl<C: Clock> Wait<C> {
    pub fn new(clock: C, duration: Duration) -> Self {
        Self {
            clock,
            duration,
            subscription: None,
        }
    }
}

impl<C: Clock> FiniteBody for Wait<C> {
    fn on_start(&mut self, finisher: Finisher) -> TaskResult<()> {
        let Ok(config) = SampleConfig::new(self.duration) else {
            finisher.finish();
            return Ok(());
        };
        self.subscription = Some(
            self.clock
                .subscribe(config, Box::new(move |_| finisher.finish())),
        );
        Ok(())
    }

    fn on_end(&mut self) {
        self.subscription = None;
    }
}
