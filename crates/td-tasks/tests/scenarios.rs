//! Drivetrain task scenarios on a manual clock.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use td_component::ManualClock;
use td_controls::{
    Gain, PidConfig, Point, Pose, TrapezoidalProfile, TwoSidedDrive, TwoSidedSignal,
    UnicycleDrive, UnicycleProperties, UnicycleSensors, UnicycleSignal,
};
use td_core::{Angle, Length, deg, dps, m, mps, mps2, percent};
use td_signal::{Signal, Var};
use td_tasks::{
    ContinuousTask, DriveDistance, DriveOpenLoop, DriveWithTrapezoidalProfile, FiniteTask,
    FollowWaypoints, RotateByAngle, Task, TaskError, TaskState, Wait,
};

const PERIOD: Duration = Duration::from_millis(20);

struct Rig {
    clock: ManualClock,
    forward_position: Var<Length>,
    turn_position: Var<Angle>,
    applied: Rc<RefCell<Vec<TwoSidedSignal>>>,
    drive: Rc<TwoSidedDrive<UnicycleSensors>>,
}

fn properties() -> UnicycleProperties {
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

impl Rig {
    fn new() -> Self {
        let clock = ManualClock::new();
        let forward_position = Var::new(m(0.0));
        let turn_position = Var::new(deg(0.0));
        let applied = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&applied);
        let sensors = UnicycleSensors {
            forward_velocity: Signal::constant(mps(0.0)),
            turn_velocity: Signal::constant(dps(0.0)),
            forward_position: forward_position.signal(),
            turn_position: turn_position.signal(),
        };
        let drive = TwoSidedDrive::new(
            "drivetrain",
            sensors,
            Signal::constant(properties()),
            PERIOD,
            move |out: &TwoSidedSignal| sink.borrow_mut().push(*out),
            &clock,
        )
        .unwrap();
        Self {
            clock,
            forward_position,
            turn_position,
            applied,
            drive: Rc::new(drive),
        }
    }

    /// Advance one period and return the unicycle command applied.
    fn tick(&self) -> UnicycleSignal {
        self.clock.advance(PERIOD);
        self.applied.borrow().last().copied().unwrap().to_unicycle()
    }

    fn default_active(&self) -> bool {
        let component = self.drive.component();
        component.is_active(&component.default_controller())
    }
}

fn close(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 1e-9
}

#[test]
fn drive_distance_scenario() {
    let rig = Rig::new();
    let task = FiniteTask::new(
        "drive 5 m",
        DriveDistance::new(Rc::clone(&rig.drive), m(5.0), m(0.1)).unwrap(),
    );
    task.start().unwrap();

    assert!(close(rig.tick().forward.value, 0.5));
    assert!(task.is_running());

    rig.forward_position.set(m(2.5));
    assert!(close(rig.tick().forward.value, 0.25));
    assert!(task.is_running());

    rig.forward_position.set(m(5.0));
    assert!(close(rig.tick().forward.value, 0.0));
    assert!(!task.is_running());
    assert_eq!(task.state(), TaskState::Finished);
    assert!(rig.default_active());
}

#[test]
fn rotate_by_angle_scenario() {
    let rig = Rig::new();
    let task = FiniteTask::new(
        "rotate 5 deg",
        RotateByAngle::new(Rc::clone(&rig.drive), deg(5.0), deg(0.1)).unwrap(),
    );
    task.start().unwrap();

    assert!(close(rig.tick().turn.value, 0.5));
    rig.turn_position.set(deg(2.5));
    assert!(close(rig.tick().turn.value, 0.25));
    rig.turn_position.set(deg(5.0));
    assert!(close(rig.tick().turn.value, 0.0));
    assert!(!task.is_running());
    assert!(rig.default_active());
}

#[test]
fn distance_is_relative_to_start_position() {
    let rig = Rig::new();
    rig.forward_position.set(m(10.0));
    let task = FiniteTask::new(
        "drive 2 m",
        DriveDistance::new(Rc::clone(&rig.drive), m(2.0), m(0.1)).unwrap(),
    );
    task.start().unwrap();
    assert!(close(rig.tick().forward.value, 0.2));
}

#[test]
fn sequence_hands_over_without_gap() {
    let rig = Rig::new();
    let forward = FiniteTask::new(
        "forward",
        DriveDistance::new(Rc::clone(&rig.drive), m(1.0), m(0.05)).unwrap(),
    );
    let turn = FiniteTask::new(
        "turn",
        RotateByAngle::new(Rc::clone(&rig.drive), deg(5.0), deg(0.1)).unwrap(),
    );
    let routine = forward.then(&turn);
    let finished = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&finished);
    routine.on_finished(move || *counter.borrow_mut() += 1);

    routine.start().unwrap();
    assert!(forward.is_running());
    assert_eq!(turn.state(), TaskState::Idle);
    assert!(close(rig.tick().forward.value, 0.1));

    rig.forward_position.set(m(1.0));
    rig.tick();
    assert_eq!(forward.state(), TaskState::Finished);
    assert!(turn.is_running());
    assert!(!rig.default_active());
    assert!(close(rig.tick().turn.value, 0.5));

    rig.turn_position.set(deg(5.0));
    rig.tick();
    assert_eq!(routine.state(), TaskState::Finished);
    assert_eq!(*finished.borrow(), 1);
    assert!(rig.default_active());
}

#[test]
fn cancel_restores_default() {
    let rig = Rig::new();
    let task = FiniteTask::new(
        "drive",
        DriveDistance::new(Rc::clone(&rig.drive), m(5.0), m(0.1)).unwrap(),
    );
    task.start().unwrap();
    rig.tick();
    task.end();
    assert!(rig.default_active());
    assert!(close(rig.tick().forward.value, 0.0));
}

#[test]
fn profile_over_max_is_rejected_before_install() {
    let rig = Rig::new();
    let result = DriveWithTrapezoidalProfile::new(
        Rc::clone(&rig.drive),
        TrapezoidalProfile {
            cruising_velocity: mps(2.5),
            final_velocity: mps(0.0),
            acceleration: mps2(1.0),
            distance: m(3.0),
            tolerance: m(0.05),
        },
    );
    assert!(matches!(result, Err(TaskError::Control(_))));
    assert!(rig.default_active());
}

#[test]
fn teleop_runs_until_ended() {
    let rig = Rig::new();
    let command = Var::new(UnicycleSignal::new(percent(40.0), percent(10.0)));
    let teleop = ContinuousTask::new(
        "teleop",
        DriveOpenLoop::new(Rc::clone(&rig.drive), command.signal()),
    );
    teleop.start().unwrap();

    let out = rig.tick();
    assert!(close(out.forward.value, 0.4));
    assert!(close(out.turn.value, 0.1));

    command.set(UnicycleSignal::new(percent(-20.0), percent(0.0)));
    assert!(close(rig.tick().forward.value, -0.2));

    teleop.end();
    assert!(rig.default_active());
}

#[test]
fn wait_finishes_after_duration() {
    let rig = Rig::new();
    let wait = FiniteTask::new("wait", Wait::new(rig.clock.clone(), Duration::from_millis(100)));
    wait.start().unwrap();
    rig.clock.advance(Duration::from_millis(80));
    assert!(wait.is_running());
    rig.clock.advance(Duration::from_millis(40));
    assert_eq!(wait.state(), TaskState::Finished);
}

#[test]
fn follow_waypoints_rejects_empty_path() {
    let rig = Rig::new();
    let result = FollowWaypoints::new(
        Rc::clone(&rig.drive),
        Vec::new(),
        Signal::constant(Pose::new(Point::origin(), deg(0.0))),
        m(0.1),
        percent(80.0),
    );
    assert!(result.is_err());
}
