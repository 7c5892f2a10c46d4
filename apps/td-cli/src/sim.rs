//! Closed-loop simulation of a configured routine.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use td_component::{Clock, ManualClock, RealTimeClock, TickStats};
use td_config::RobotConfig;
use td_controls::{Pose, TwoSidedDrive, UnicycleDrive};
use td_core::{Length, Scalar};
use td_signal::Signal;
use td_tasks::Task;
use tracing::{info, warn};

use crate::compile::compile_routine;
use crate::error::{CliError, CliResult};
use crate::plant::SimulatedDrivetrain;

/// A clock the simulator can drive forward.
pub trait SimClock: Clock + Clone + 'static {
    fn run(&self, span: Duration);
    fn elapsed(&self) -> Duration;
}

impl SimClock for ManualClock {
    fn run(&self, span: Duration) {
        self.advance(span);
    }

    fn elapsed(&self) -> Duration {
        self.now()
    }
}

impl SimClock for RealTimeClock {
    fn run(&self, span: Duration) {
        self.run_for(span);
    }

    fn elapsed(&self) -> Duration {
        RealTimeClock::elapsed(self)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SimOptions {
    /// Give up after this much clock time.
    pub duration: Duration,
    /// Plant integration step.
    pub step: Duration,
    /// Interval between progress events.
    pub report_every: Duration,
}

#[derive(Debug)]
pub struct SimReport {
    /// Clock time at which the routine finished, if it did.
    pub finished_at: Option<Duration>,
    pub elapsed: Duration,
    pub pose: Pose,
    pub travelled: Length,
    pub ticks: u64,
    pub overruns: u64,
    pub average_tick: Duration,
    pub max_tick: Duration,
}

pub fn simulate<C: SimClock>(
    config: &RobotConfig,
    clock: C,
    options: &SimOptions,
) -> CliResult<SimReport> {
    if options.report_every.is_zero() {
        return Err(CliError::InvalidArg {
            what: "report interval must be positive",
        });
    }
    let properties = config.drivetrain.to_properties()?;
    let plant = SimulatedDrivetrain::new(
        &clock,
        &properties,
        millis(config.plant.time_constant_ms, "plant time constant must be positive")?,
        millis(config.plant.heading_latency_ms, "heading latency must be non-negative")?,
        options.step,
    )?;
    let drive = Rc::new(TwoSidedDrive::new(
        config.name.clone(),
        plant.sensors(),
        Signal::constant(properties),
        config.drivetrain.tick_period(),
        plant.actuator(),
        &clock,
    )?);
    let stats = Rc::new(TickStats::new());
    drive.component().set_observer(stats.clone());

    let routine = compile_routine(&config.routine, &drive, &clock, &plant.pose_signal())?;
    let finished_at = Rc::new(Cell::new(None));

    let Some(routine) = routine else {
        info!("empty routine, nothing to run");
        return Ok(report(&plant, &stats, Some(Duration::ZERO), clock.elapsed()));
    };

    let (done, stamp) = (Rc::clone(&finished_at), clock.clone());
    routine.on_finished(move || done.set(Some(stamp.elapsed())));
    routine.start()?;
    info!(task = %routine.name(), "routine started");

    while finished_at.get().is_none() && clock.elapsed() < options.duration {
        let remaining = options.duration - clock.elapsed();
        clock.run(options.report_every.min(remaining));
        let pose = plant.pose();
        info!(
            t_s = clock.elapsed().as_secs_f64(),
            x_m = pose.position.x.base_value(),
            y_m = pose.position.y.base_value(),
            heading_deg = pose.heading.base_value().to_degrees(),
            "progress"
        );
    }

    if routine.is_running() {
        warn!(task = %routine.name(), "routine did not finish in time, ending it");
        routine.end();
    }

    Ok(report(&plant, &stats, finished_at.get(), clock.elapsed()))
}

fn millis(value: f64, what: &'static str) -> CliResult<Duration> {
    Duration::try_from_secs_f64(value / 1000.0).map_err(|_| CliError::InvalidArg { what })
}

fn report(
    plant: &SimulatedDrivetrain,
    stats: &TickStats,
    finished_at: Option<Duration>,
    elapsed: Duration,
) -> SimReport {
    SimReport {
        finished_at,
        elapsed,
        pose: plant.pose(),
        travelled: plant.travelled(),
        ticks: stats.count(),
        overruns: stats.overruns(),
        average_tick: stats.average(),
        max_tick: stats.max(),
    }
}
