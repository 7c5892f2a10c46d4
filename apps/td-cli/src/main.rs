mod compile;
mod error;
mod plant;
mod sim;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

use td_component::{ManualClock, RealTimeClock};
use td_config::TaskDef;
use td_core::Scalar;

use crate::error::{CliError, CliResult};
use crate::sim::{SimOptions, SimReport, simulate};

#[derive(Parser)]
#[command(name = "td-cli")]
#[command(about = "TickDrive CLI - drivetrain routine validation and simulation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a robot config file
    Validate {
        /// Path to the config file (YAML, or JSON by extension)
        config_path: PathBuf,
    },
    /// Run the configured routine against a simulated drivetrain
    Simulate {
        /// Path to the config file (YAML, or JSON by extension)
        config_path: PathBuf,
        /// Give up after this many seconds of clock time
        #[arg(long, default_value_t = 15.0)]
        duration_s: f64,
        /// Plant integration step in milliseconds
        #[arg(long, default_value_t = 5)]
        sim_step_ms: u64,
        /// Interval between progress events in milliseconds
        #[arg(long, default_value_t = 500)]
        report_ms: u64,
        /// Pace the simulation against wall time
        #[arg(long)]
        real_time: bool,
    },
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config_path } => cmd_validate(&config_path),
        Commands::Simulate {
            config_path,
            duration_s,
            sim_step_ms,
            report_ms,
            real_time,
        } => {
            let duration = Duration::try_from_secs_f64(duration_s).map_err(|_| {
                CliError::InvalidArg {
                    what: "duration must be a non-negative number of seconds",
                }
            })?;
            let options = SimOptions {
                duration,
                step: Duration::from_millis(sim_step_ms),
                report_every: Duration::from_millis(report_ms),
            };
            cmd_simulate(&config_path, &options, real_time)
        }
    }
}

fn cmd_validate(config_path: &Path) -> CliResult<()> {
    println!("Validating config: {}", config_path.display());
    let config = td_config::load(config_path)?;
    config.drivetrain.to_properties()?;
    println!("✓ Config is valid");
    println!("  Robot: {}", config.name);
    println!("  Tick period: {} ms", config.drivetrain.tick_period_ms);
    if config.routine.is_empty() {
        println!("  Routine: empty");
    } else {
        println!("  Routine:");
        for (idx, step) in config.routine.iter().enumerate() {
            println!("    {idx}: {}", describe(step));
        }
    }
    Ok(())
}

fn cmd_simulate(config_path: &Path, options: &SimOptions, real_time: bool) -> CliResult<()> {
    let config = td_config::load(config_path)?;
    println!(
        "Simulating '{}' ({} steps, step={} ms, limit={:.1} s)",
        config.name,
        config.routine.len(),
        options.step.as_millis(),
        options.duration.as_secs_f64()
    );

    let report = if real_time {
        simulate(&config, RealTimeClock::new(), options)?
    } else {
        simulate(&config, ManualClock::new(), options)?
    };
    print_report(&report);
    Ok(())
}

fn describe(step: &TaskDef) -> String {
    match step {
        TaskDef::DriveDistance {
            distance_m,
            tolerance_m,
        } => format!("drive {distance_m:.3} m (±{tolerance_m:.3} m)"),
        TaskDef::RotateByAngle {
            angle_deg,
            tolerance_deg,
        } => format!("rotate {angle_deg:.1}° (±{tolerance_deg:.1}°)"),
        TaskDef::TrapezoidalProfile {
            distance_m,
            cruising_velocity_mps,
            ..
        } => format!("profiled move {distance_m:.3} m at {cruising_velocity_mps:.2} m/s"),
        TaskDef::FollowWaypoints { waypoints, .. } => {
            format!("follow {} waypoint(s)", waypoints.len())
        }
        TaskDef::Wait { duration_ms } => format!("wait {duration_ms} ms"),
    }
}

fn print_report(report: &SimReport) {
    match report.finished_at {
        Some(at) => println!("✓ Routine finished at {:.3} s", at.as_secs_f64()),
        None => println!(
            "✗ Routine did not finish within {:.3} s",
            report.elapsed.as_secs_f64()
        ),
    }

    let pose = report.pose;
    println!("\nFinal state:");
    println!(
        "  Position: ({:.3}, {:.3}) m",
        pose.position.x.base_value(),
        pose.position.y.base_value()
    );
    println!("  Heading:  {:.2}°", pose.heading.base_value().to_degrees());
    println!("  Travelled: {:.3} m", report.travelled.base_value());

    println!("\nTick summary:");
    println!("  Ticks:    {}", report.ticks);
    println!("  Overruns: {}", report.overruns);
    println!("  Average:  {:.1} µs", report.average_tick.as_secs_f64() * 1e6);
    println!("  Max:      {:.1} µs", report.max_tick.as_secs_f64() * 1e6);
}
