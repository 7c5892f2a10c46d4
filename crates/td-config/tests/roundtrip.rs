use td_config::*;

fn sample_config() -> RobotConfig {
    RobotConfig {
        version: CURRENT_VERSION,
        name: "Practice Bot".to_string(),
        drivetrain: DrivetrainDef {
            tick_period_ms: 20,
            max_forward_velocity_mps: 2.0,
            max_turn_velocity_dps: 180.0,
            max_acceleration_mps2: 1.5,
            default_lookahead_m: 0.5,
            forward_velocity_gains: PidDef {
                kp: 0.2,
                ..PidDef::default()
            },
            turn_velocity_gains: PidDef::default(),
            forward_position_gains: PidDef {
                kp: 0.1,
                ki: 0.0,
                kd: 0.01,
                kf: None,
            },
            turn_position_gains: PidDef {
                kp: 0.5,
                kf: Some(0.0),
                ..PidDef::default()
            },
        },
        plant: PlantDef::default(),
        routine: vec![
            TaskDef::DriveDistance {
                distance_m: 1.0,
                tolerance_m: 0.02,
            },
            TaskDef::RotateByAngle {
                angle_deg: 90.0,
                tolerance_deg: 2.0,
            },
            TaskDef::Wait { duration_ms: 250 },
            TaskDef::FollowWaypoints {
                waypoints: vec![
                    WaypointDef { x_m: 1.0, y_m: 0.0 },
                    WaypointDef { x_m: 1.0, y_m: 1.0 },
                ],
                tolerance_m: 0.05,
                max_output: 0.8,
            },
        ],
    }
}

#[test]
fn roundtrip_yaml() {
    let config = sample_config();
    let path = std::env::temp_dir().join("td_config_roundtrip.yaml");

    save_yaml(&path, &config).unwrap();
    let loaded = load_yaml(&path).unwrap();

    assert_eq!(config, loaded);
}

#[test]
fn roundtrip_json() {
    let config = sample_config();
    let path = std::env::temp_dir().join("td_config_roundtrip.json");

    save_json(&path, &config).unwrap();
    let loaded = load(&path).unwrap();

    assert_eq!(config, loaded);
}

#[test]
fn minimal_yaml_fills_defaults() {
    let yaml = r#"
version: 1
name: Minimal
drivetrain:
  tick_period_ms: 10
  max_forward_velocity_mps: 1.0
  max_turn_velocity_dps: 90.0
  max_acceleration_mps2: 1.0
  default_lookahead_m: 0.3
routine:
  - type: FollowWaypoints
    waypoints:
      - { x_m: 2.0, y_m: 0.0 }
    tolerance_m: 0.1
  - type: TrapezoidalProfile
    distance_m: -1.0
    cruising_velocity_mps: 0.5
    acceleration_mps2: 0.5
    tolerance_m: 0.01
"#;
    let config = from_yaml_str(yaml).unwrap();

    assert_eq!(config.plant, PlantDef::default());
    assert_eq!(config.drivetrain.turn_position_gains, PidDef::default());
    match &config.routine[0] {
        TaskDef::FollowWaypoints { max_output, .. } => assert_eq!(*max_output, 1.0),
        other => panic!("unexpected step {other:?}"),
    }
    let profile = config.routine[1].to_profile().unwrap();
    assert_eq!(profile.final_velocity.value, 0.0);
    assert_eq!(profile.distance.value, -1.0);
    assert!(config.routine[0].to_profile().is_none());
}

#[test]
fn drivetrain_converts_to_properties() {
    let config = sample_config();
    let properties = config.drivetrain.to_properties().unwrap();

    assert_eq!(properties.max_forward_velocity.value, 2.0);
    assert!((properties.max_turn_velocity.value - std::f64::consts::PI).abs() < 1e-12);
    assert_eq!(properties.forward_velocity_gains.kp.per_base_unit(), 0.2);
    assert_eq!(properties.forward_position_gains.kd.per_base_unit(), 0.01);
    assert!(properties.forward_position_gains.kf.is_none());
    assert_eq!(config.drivetrain.tick_period(), std::time::Duration::from_millis(20));
}
