//! Conversion from schema definitions to typed control parameters.

use std::time::Duration;

use td_controls::{Gain, PidConfig, Point, TrapezoidalProfile, UnicycleProperties};
use td_core::{TimeCalculus, dps, m, mps, mps2};

use crate::ConfigResult;
use crate::schema::{DrivetrainDef, PidDef, TaskDef, WaypointDef};

impl PidDef {
    pub fn to_pid<T: TimeCalculus>(&self) -> PidConfig<T> {
        PidConfig {
            kp: Gain::from_base(self.kp),
            ki: Gain::from_base(self.ki),
            kd: Gain::from_base(self.kd),
            kf: self.kf.map(Gain::from_base),
        }
    }
}

impl DrivetrainDef {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    /// Typed drivetrain properties, checked by the control layer.
    pub fn to_properties(&self) -> ConfigResult<UnicycleProperties> {
        let properties = UnicycleProperties {
            max_forward_velocity: mps(self.max_forward_velocity_mps),
            max_turn_velocity: dps(self.max_turn_velocity_dps),
            max_acceleration: mps2(self.max_acceleration_mps2),
            default_lookahead: m(self.default_lookahead_m),
            forward_velocity_gains: self.forward_velocity_gains.to_pid(),
            turn_velocity_gains: self.turn_velocity_gains.to_pid(),
            forward_position_gains: self.forward_position_gains.to_pid(),
            turn_position_gains: self.turn_position_gains.to_pid(),
        };
        properties.validate()?;
        Ok(properties)
    }
}

impl WaypointDef {
    pub fn to_point(self) -> Point {
        Point::new(m(self.x_m), m(self.y_m))
    }
}

impl TaskDef {
    /// Typed profile for a `TrapezoidalProfile` step; `None` for other steps.
    pub fn to_profile(&self) -> Option<TrapezoidalProfile> {
        match *self {
            TaskDef::TrapezoidalProfile {
                distance_m,
                cruising_velocity_mps,
                final_velocity_mps,
                acceleration_mps2,
                tolerance_m,
            } => Some(TrapezoidalProfile {
                cruising_velocity: mps(cruising_velocity_mps),
                final_velocity: mps(final_velocity_mps),
                acceleration: mps2(acceleration_mps2),
                distance: m(distance_m),
                tolerance: m(tolerance_m),
            }),
            _ => None,
        }
    }
}
