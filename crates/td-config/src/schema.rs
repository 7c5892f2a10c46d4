//! Robot configuration schema.
//!
//! Quantities carry their unit in the field name. PID gains are expressed as
//! fraction of full output per SI base unit of the term (m, rad, m/s, rad/s
//! and their integrals and rates).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RobotConfig {
    pub version: u32,
    pub name: String,
    pub drivetrain: DrivetrainDef,
    #[serde(default)]
    pub plant: PlantDef,
    /// Run in order, each step starting when the previous one finishes.
    #[serde(default)]
    pub routine: Vec<TaskDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrivetrainDef {
    pub tick_period_ms: u64,
    pub max_forward_velocity_mps: f64,
    pub max_turn_velocity_dps: f64,
    pub max_acceleration_mps2: f64,
    pub default_lookahead_m: f64,
    #[serde(default)]
    pub forward_velocity_gains: PidDef,
    #[serde(default)]
    pub turn_velocity_gains: PidDef,
    #[serde(default)]
    pub forward_position_gains: PidDef,
    #[serde(default)]
    pub turn_position_gains: PidDef,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct PidDef {
    #[serde(default)]
    pub kp: f64,
    #[serde(default)]
    pub ki: f64,
    #[serde(default)]
    pub kd: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kf: Option<f64>,
}

/// Simulated drivetrain used by the command-line simulator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PlantDef {
    /// First-order lag between commanded and actual wheel speed.
    pub time_constant_ms: f64,
    /// Delay before the heading sensor reflects motion.
    #[serde(default)]
    pub heading_latency_ms: f64,
}

impl Default for PlantDef {
    fn default() -> Self {
        Self {
            time_constant_ms: 100.0,
            heading_latency_ms: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum TaskDef {
    DriveDistance {
        distance_m: f64,
        tolerance_m: f64,
    },
    RotateByAngle {
        angle_deg: f64,
        tolerance_deg: f64,
    },
    TrapezoidalProfile {
        distance_m: f64,
        cruising_velocity_mps: f64,
        #[serde(default)]
        final_velocity_mps: f64,
        acceleration_mps2: f64,
        tolerance_m: f64,
    },
    FollowWaypoints {
        waypoints: Vec<WaypointDef>,
        tolerance_m: f64,
        #[serde(default = "full_output")]
        max_output: f64,
    },
    Wait {
        duration_ms: u64,
    },
}

impl TaskDef {
    /// Short label used in logs and diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            TaskDef::DriveDistance { .. } => "DriveDistance",
            TaskDef::RotateByAngle { .. } => "RotateByAngle",
            TaskDef::TrapezoidalProfile { .. } => "TrapezoidalProfile",
            TaskDef::FollowWaypoints { .. } => "FollowWaypoints",
            TaskDef::Wait { .. } => "Wait",
        }
    }
}

fn full_output() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WaypointDef {
    pub x_m: f64,
    pub y_m: f64,
}
