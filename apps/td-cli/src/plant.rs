//! Simulated unicycle drivetrain with first-order wheel dynamics.
//!
//! The plant subscribes to the same clock as the drivetrain component and
//! integrates its state once per simulation step. Commands arrive through the
//! component's actuator; sensors are exposed as variable signals over the
//! integrated state.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use td_component::{Clock, SampleConfig, Subscription};
use td_controls::{Point, Pose, TwoSidedSignal, UnicycleProperties, UnicycleSensors};
use td_core::{Angle, AngularVelocity, Length, Scalar, Time, Velocity};
use td_signal::Signal;

use crate::error::{CliError, CliResult};

/// First-order lag: `dx/dt = (command - x) / tau`.
#[derive(Clone, Copy, Debug)]
pub struct FirstOrderLag {
    tau: f64,
}

impl FirstOrderLag {
    pub fn new(tau_s: f64) -> CliResult<Self> {
        if !(tau_s > 0.0 && tau_s.is_finite()) {
            return Err(CliError::InvalidArg {
                what: "plant time constant must be positive",
            });
        }
        Ok(Self { tau: tau_s })
    }

    /// Advance `current` towards `command` by `dt` seconds. Never overshoots.
    pub fn step(&self, current: f64, command: f64, dt: f64) -> f64 {
        let alpha = (dt / self.tau).min(1.0);
        current + (command - current) * alpha
    }
}

#[derive(Debug)]
struct PlantState {
    elapsed: Duration,
    left: f64,
    right: f64,
    pose: Pose,
    travelled: Length,
    heading_history: VecDeque<(Duration, Angle)>,
}

struct Model {
    lag: FirstOrderLag,
    max_forward: Velocity,
    max_turn: AngularVelocity,
    heading_latency: Duration,
    command: Rc<Cell<TwoSidedSignal>>,
    state: Rc<RefCell<PlantState>>,
}

impl Model {
    fn step(&self, dt: Time) {
        let dt_s = dt.base_value();
        let command = self.command.get();
        let mut state = self.state.borrow_mut();

        state.elapsed += Duration::from_secs_f64(dt_s.max(0.0));
        state.left = self.lag.step(state.left, saturate(command.left.value), dt_s);
        state.right = self.lag.step(state.right, saturate(command.right.value), dt_s);

        let v = self.forward_velocity(&state).base_value();
        let w = self.turn_velocity(&state).base_value();
        let heading = state.pose.heading.base_value();
        let position = state.pose.position;
        state.pose = Pose::new(
            Point::new(
                position.x + Length::from_base(v * heading.cos() * dt_s),
                position.y + Length::from_base(v * heading.sin() * dt_s),
            ),
            Angle::from_base(heading + w * dt_s),
        );
        state.travelled = state.travelled + Length::from_base(v * dt_s);

        let (now, heading) = (state.elapsed, state.pose.heading);
        state.heading_history.push_back((now, heading));
        let horizon = now.saturating_sub(self.heading_latency);
        while state
            .heading_history
            .get(1)
            .is_some_and(|&(at, _)| at <= horizon)
        {
            state.heading_history.pop_front();
        }
    }

    fn forward_velocity(&self, state: &PlantState) -> Velocity {
        self.max_forward.scale((state.left + state.right) * 0.5)
    }

    fn turn_velocity(&self, state: &PlantState) -> AngularVelocity {
        self.max_turn.scale((state.right - state.left) * 0.5)
    }
}

fn saturate(output: f64) -> f64 {
    output.clamp(-1.0, 1.0)
}

/// A drivetrain simulated on a clock.
pub struct SimulatedDrivetrain {
    model: Rc<Model>,
    _subscription: Subscription,
}

impl SimulatedDrivetrain {
    /// Plant stepping every `step` on `clock`, starting at rest at the origin.
    pub fn new(
        clock: &dyn Clock,
        properties: &UnicycleProperties,
        time_constant: Duration,
        heading_latency: Duration,
        step: Duration,
    ) -> CliResult<Self> {
        let lag = FirstOrderLag::new(time_constant.as_secs_f64())?;
        let config = SampleConfig::new(step)?;
        let model = Rc::new(Model {
            lag,
            max_forward: properties.max_forward_velocity,
            max_turn: properties.max_turn_velocity,
            heading_latency,
            command: Rc::new(Cell::new(TwoSidedSignal::zero())),
            state: Rc::new(RefCell::new(PlantState {
                elapsed: Duration::ZERO,
                left: 0.0,
                right: 0.0,
                pose: Pose::new(Point::origin(), Angle::zero()),
                travelled: Length::zero(),
                heading_history: VecDeque::from([(Duration::ZERO, Angle::zero())]),
            })),
        });
        let stepper = Rc::clone(&model);
        let subscription = clock.subscribe(config, Box::new(move |dt| stepper.step(dt)));
        Ok(Self {
            model,
            _subscription: subscription,
        })
    }

    /// Actuator for the drivetrain component: latches the latest command.
    pub fn actuator(&self) -> impl FnMut(&TwoSidedSignal) + 'static {
        let command = Rc::clone(&self.model.command);
        move |out: &TwoSidedSignal| command.set(*out)
    }

    pub fn sensors(&self) -> UnicycleSensors {
        UnicycleSensors {
            forward_velocity: self.read(|model, state| model.forward_velocity(state)),
            turn_velocity: self.read(|model, state| model.turn_velocity(state)),
            forward_position: self.read(|_, state| state.travelled),
            turn_position: self.read(|_, state| {
                state
                    .heading_history
                    .front()
                    .map_or(state.pose.heading, |&(_, heading)| heading)
            }),
        }
    }

    /// True pose as a variable signal.
    pub fn pose_signal(&self) -> Signal<Pose> {
        self.read(|_, state| state.pose)
    }

    pub fn pose(&self) -> Pose {
        self.model.state.borrow().pose
    }

    pub fn travelled(&self) -> Length {
        self.model.state.borrow().travelled
    }

    fn read<T: Clone + 'static>(
        &self,
        f: impl Fn(&Model, &PlantState) -> T + 'static,
    ) -> Signal<T> {
        let model = Rc::clone(&self.model);
        Signal::variable(move || f(&model, &model.state.borrow()))
    }
}
