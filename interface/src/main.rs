use std::path::PathBuf;
use std::process::ExitCode;

use brain::{ActuationService, ControlLoop, LoopReport};
use clap::Parser;
use kinematics::{GripperCommand, TrajectoryGenerator};
use log::{error, info};

mod communication;
mod config;
mod dry_run;
mod error;
mod input;

use communication::CommunicationLayer;
use config::AppConfig;
use dry_run::DryRunActuation;
use error::AppError;

/// Toggle an oscillating arm and gripper pattern from the keyboard.
#[derive(Parser, Debug)]
#[command(name = "arm_cycle", version)]
struct Cli {
    /// TOML configuration file; defaults apply when it is absent.
    #[arg(short, long, default_value = "arm_cycle.toml")]
    config: PathBuf,

    /// Log commands instead of sending them to a robot.
    #[arg(long)]
    dry_run: bool,

    /// Robot name used in key expressions (overrides the config file).
    #[arg(long)]
    robot: Option<String>,

    /// Zenoh endpoint to connect to, repeatable (overrides the config file).
    #[arg(long)]
    connect: Vec<String>,

    /// Control loop rate in Hz (overrides the config file).
    #[arg(long)]
    rate_hz: Option<f64>,

    /// Log at debug level (RUST_LOG still takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(robot) = &self.robot {
            config.robot.name = robot.clone();
        }
        if !self.connect.is_empty() {
            config.robot.connect = self.connect.clone();
        }
        if let Some(rate_hz) = self.rate_hz {
            config.control.rate_hz = rate_hz;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(cli).await {
        Ok(report) => {
            info!(
                "Session ended after {} ticks ({} samples, {} dropped commands, {} overruns)",
                report.ticks, report.samples_dispatched, report.dispatch_failures, report.overruns
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<LoopReport, AppError> {
    info!("Loading configuration from: {}", cli.config.display());
    let mut config = AppConfig::load(&cli.config)?;
    cli.apply(&mut config);
    config.validate()?;

    let generator = TrajectoryGenerator::new(config.trajectory)?;
    let loop_config = config.loop_config()?;

    // Claim the keyboard before anything moves.
    let mut keyboard = input::open_platform_input()?;

    let actuation: Box<dyn ActuationService> = if cli.dry_run {
        info!("Dry run: no commands leave this process");
        Box::new(DryRunActuation::default())
    } else {
        Box::new(CommunicationLayer::new(&config.robot).await?)
    };

    let base = GripperCommand::new(config.trajectory.gripper.base);
    let gripper = brain::prepare(actuation.as_ref(), &config.setup_config(), base).await?;

    println!("Press ENTER to toggle arm cycling ON/OFF. Press Ctrl+C to quit.\n");
    info!("Control loop at {} Hz", loop_config.rate_hz());

    let control = ControlLoop::new(
        &mut keyboard,
        actuation.as_ref(),
        generator,
        &loop_config,
        gripper,
    );
    let report = control
        .run(shutdown_signal(), |transition| println!("{}", transition.message()))
        .await;
    Ok(report)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
