//! Configuration validation logic.

use crate::schema::{DrivetrainDef, PidDef, PlantDef, RobotConfig, TaskDef};

pub const CURRENT_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_config(config: &RobotConfig) -> Result<(), ValidationError> {
    if config.version != CURRENT_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: config.version,
        });
    }

    validate_drivetrain(&config.drivetrain)?;
    validate_plant(&config.plant)?;

    for (idx, task) in config.routine.iter().enumerate() {
        validate_task(task, idx, &config.drivetrain)?;
    }

    Ok(())
}

fn validate_drivetrain(def: &DrivetrainDef) -> Result<(), ValidationError> {
    if def.tick_period_ms == 0 {
        return Err(invalid(
            "drivetrain.tick_period_ms",
            def.tick_period_ms,
            "must be positive",
        ));
    }
    positive("drivetrain.max_forward_velocity_mps", def.max_forward_velocity_mps)?;
    positive("drivetrain.max_turn_velocity_dps", def.max_turn_velocity_dps)?;
    positive("drivetrain.max_acceleration_mps2", def.max_acceleration_mps2)?;
    positive("drivetrain.default_lookahead_m", def.default_lookahead_m)?;

    validate_gains("drivetrain.forward_velocity_gains", &def.forward_velocity_gains)?;
    validate_gains("drivetrain.turn_velocity_gains", &def.turn_velocity_gains)?;
    validate_gains("drivetrain.forward_position_gains", &def.forward_position_gains)?;
    validate_gains("drivetrain.turn_position_gains", &def.turn_position_gains)?;
    Ok(())
}

fn validate_gains(context: &str, gains: &PidDef) -> Result<(), ValidationError> {
    finite(&format!("{context}.kp"), gains.kp)?;
    finite(&format!("{context}.ki"), gains.ki)?;
    finite(&format!("{context}.kd"), gains.kd)?;
    if let Some(kf) = gains.kf {
        finite(&format!("{context}.kf"), kf)?;
    }
    Ok(())
}

fn validate_plant(def: &PlantDef) -> Result<(), ValidationError> {
    positive("plant.time_constant_ms", def.time_constant_ms)?;
    non_negative("plant.heading_latency_ms", def.heading_latency_ms)
}

fn validate_task(task: &TaskDef, idx: usize, drivetrain: &DrivetrainDef) -> Result<(), ValidationError> {
    let field = |name: &str| format!("routine[{idx}].{name}");

    match task {
        TaskDef::DriveDistance {
            distance_m,
            tolerance_m,
        } => {
            finite(&field("distance_m"), *distance_m)?;
            non_negative(&field("tolerance_m"), *tolerance_m)?;
        }
        TaskDef::RotateByAngle {
            angle_deg,
            tolerance_deg,
        } => {
            finite(&field("angle_deg"), *angle_deg)?;
            non_negative(&field("tolerance_deg"), *tolerance_deg)?;
        }
        TaskDef::TrapezoidalProfile {
            distance_m,
            cruising_velocity_mps,
            final_velocity_mps,
            acceleration_mps2,
            tolerance_m,
        } => {
            finite(&field("distance_m"), *distance_m)?;
            positive(&field("cruising_velocity_mps"), *cruising_velocity_mps)?;
            if *cruising_velocity_mps > drivetrain.max_forward_velocity_mps {
                return Err(invalid(
                    &field("cruising_velocity_mps"),
                    cruising_velocity_mps,
                    "exceeds drivetrain.max_forward_velocity_mps",
                ));
            }
            non_negative(&field("final_velocity_mps"), *final_velocity_mps)?;
            if final_velocity_mps > cruising_velocity_mps {
                return Err(invalid(
                    &field("final_velocity_mps"),
                    final_velocity_mps,
                    "exceeds the cruising velocity",
                ));
            }
            positive(&field("acceleration_mps2"), *acceleration_mps2)?;
            if *acceleration_mps2 > drivetrain.max_acceleration_mps2 {
                return Err(invalid(
                    &field("acceleration_mps2"),
                    acceleration_mps2,
                    "exceeds drivetrain.max_acceleration_mps2",
                ));
            }
            non_negative(&field("tolerance_m"), *tolerance_m)?;
        }
        TaskDef::FollowWaypoints {
            waypoints,
            tolerance_m,
            max_output,
        } => {
            if waypoints.is_empty() {
                return Err(invalid(&field("waypoints"), "[]", "at least one waypoint required"));
            }
            for (n, waypoint) in waypoints.iter().enumerate() {
                finite(&field(&format!("waypoints[{n}].x_m")), waypoint.x_m)?;
                finite(&field(&format!("waypoints[{n}].y_m")), waypoint.y_m)?;
            }
            non_negative(&field("tolerance_m"), *tolerance_m)?;
            positive(&field("max_output"), *max_output)?;
            if *max_output > 1.0 {
                return Err(invalid(&field("max_output"), max_output, "must not exceed 1.0"));
            }
        }
        TaskDef::Wait { .. } => {}
    }

    Ok(())
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn finite(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(invalid(field, value, "must be finite"));
    }
    Ok(())
}

fn positive(field: &str, value: f64) -> Result<(), ValidationError> {
    finite(field, value)?;
    if value <= 0.0 {
        return Err(invalid(field, value, "must be positive"));
    }
    Ok(())
}

fn non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(invalid(field, value, "must be non-negative"));
    }
    Ok(())
}
