//! Build a runnable task chain from a configured routine.

use std::rc::Rc;
use std::time::Duration;

use td_component::Clock;
use td_config::TaskDef;
use td_controls::{Pose, TwoSidedDrive, UnicycleSensors};
use td_core::{deg, m, unitless};
use td_signal::Signal;
use td_tasks::{
    DriveDistance, DriveWithTrapezoidalProfile, FiniteTask, FollowWaypoints, RotateByAngle, Task,
    Wait,
};
use tracing::debug;

use crate::error::{CliError, CliResult};

pub type Drive = TwoSidedDrive<UnicycleSensors>;

/// One routine step as a finite task.
pub fn compile_step<C: Clock + Clone + 'static>(
    idx: usize,
    def: &TaskDef,
    drive: &Rc<Drive>,
    clock: &C,
    pose: &Signal<Pose>,
) -> CliResult<FiniteTask> {
    let name = format!("{idx}:{}", def.kind());
    let drive = Rc::clone(drive);
    let task = match def {
        TaskDef::DriveDistance {
            distance_m,
            tolerance_m,
        } => FiniteTask::new(name, DriveDistance::new(drive, m(*distance_m), m(*tolerance_m))?),
        TaskDef::RotateByAngle {
            angle_deg,
            tolerance_deg,
        } => FiniteTask::new(
            name,
            RotateByAngle::new(drive, deg(*angle_deg), deg(*tolerance_deg))?,
        ),
        TaskDef::TrapezoidalProfile { .. } => {
            let profile = def.to_profile().ok_or(CliError::InvalidArg {
                what: "profile step without a profile",
            })?;
            FiniteTask::new(name, DriveWithTrapezoidalProfile::new(drive, profile)?)
        }
        TaskDef::FollowWaypoints {
            waypoints,
            tolerance_m,
            max_output,
        } => FiniteTask::new(
            name,
            FollowWaypoints::new(
                drive,
                waypoints.iter().map(|w| w.to_point()).collect(),
                pose.clone(),
                m(*tolerance_m),
                unitless(*max_output),
            )?,
        ),
        TaskDef::Wait { duration_ms } => FiniteTask::new(
            name,
            Wait::new(clock.clone(), Duration::from_millis(*duration_ms)),
        ),
    };
    Ok(task)
}

/// The whole routine as one task, each step starting when the previous one
/// finishes. `None` for an empty routine.
pub fn compile_routine<C: Clock + Clone + 'static>(
    routine: &[TaskDef],
    drive: &Rc<Drive>,
    clock: &C,
    pose: &Signal<Pose>,
) -> CliResult<Option<FiniteTask>> {
    let mut chain: Option<FiniteTask> = None;
    for (idx, def) in routine.iter().enumerate() {
        let step = compile_step(idx, def, drive, clock, pose)?;
        chain = Some(match chain {
            Some(done) => done.then(&step).task().clone(),
            None => step,
        });
    }
    if let Some(task) = &chain {
        debug!(task = %task.name(), steps = routine.len(), "routine compiled");
    }
    Ok(chain)
}
