use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::time::interval;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use robot_driver::config::RobotConfig;
use robot_driver::encoder::EncoderAggregator;
use robot_driver::hardware::open_encoder_link;
use robot_driver::hardware::sim::{MotorSlot, PlantResponse, SimController, SimRobot, SimSerial};
use robot_driver::hardware::Axis;
use robot_driver::RobotDriver;

#[derive(Parser)]
#[command(name = "robot-driver", about = "Closed-loop drive control for a tank drive base")]
struct Cli {
    /// JSON robot config; defaults are used when omitted
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stream encoder readings from the co-processor link
    Encoders {
        #[arg(long)]
        port: Option<String>,
        #[arg(long)]
        baud: Option<u32>,
        #[arg(long)]
        count: Option<usize>,
        #[arg(long)]
        ppr: Option<i32>,
        /// Poll period; must be at least 1ms
        #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u64).range(1..))]
        period_ms: u64,
    },
    /// Run a maneuver against the simulated drive base
    Simulate {
        #[command(subcommand)]
        maneuver: Maneuver,
    },
}

#[derive(Subcommand)]
enum Maneuver {
    /// Turn by a relative angle in degrees
    Turn {
        #[arg(allow_negative_numbers = true)]
        degrees: f64,
        #[arg(long, default_value_t = 15_000)]
        timeout_ms: u64,
    },
    /// Drive a distance in inches
    Drive {
        #[arg(allow_negative_numbers = true)]
        inches: f64,
        #[arg(long, default_value_t = 15_000)]
        timeout_ms: u64,
    },
    /// Hold the sticks in one position for a number of 20ms cycles
    Teleop {
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        left_y: i32,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        right_y: i32,
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        right_x: i32,
        /// Arcade mixing instead of tank
        #[arg(long)]
        arcade: bool,
        #[arg(long, default_value_t = 50)]
        cycles: u32,
    },
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=debug for per-iteration PID terms)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), BoxError> {
    let config = match &cli.config {
        Some(path) => RobotConfig::load(path)?,
        None => RobotConfig::default(),
    };

    match cli.command {
        Command::Encoders {
            port,
            baud,
            count,
            ppr,
            period_ms,
        } => {
            let port = port.unwrap_or(config.serial.port);
            let baud = baud.unwrap_or(config.serial.baudrate);
            let count = count.unwrap_or(config.encoders.count);
            let ppr = ppr.unwrap_or(config.encoders.ppr);
            stream_encoders(&port, baud, count, ppr, period_ms).await
        }
        Command::Simulate { maneuver } => simulate(&config, maneuver).await,
    }
}

async fn stream_encoders(
    port: &str,
    baud: u32,
    count: usize,
    ppr: i32,
    period_ms: u64,
) -> Result<(), BoxError> {
    let mut link = open_encoder_link(port, baud)?;
    let mut encoders = EncoderAggregator::new(count, ppr);
    let mut tick = interval(Duration::from_millis(period_ms));

    info!("Reading {} encoders at {} pulses/rev", count, ppr);
    loop {
        tick.tick().await;
        match encoders.poll(&mut link) {
            Ok(true) => {
                let degrees: Vec<i32> = (1..=count)
                    .map(|i| encoders.degrees(i).unwrap_or(0))
                    .collect();
                info!("Encoders (deg): {:?}", degrees);
            }
            Ok(false) => {}
            Err(e) => warn!("Encoder link read failed: {}", e),
        }
    }
}

async fn simulate(config: &RobotConfig, maneuver: Maneuver) -> Result<(), BoxError> {
    let robot = SimRobot::new(PlantResponse::default());
    let controller = SimController::new();
    let mut driver = RobotDriver::new(
        robot.motors(),
        robot.gyro(),
        SimSerial::new(),
        controller.clone(),
        config.wheel.diameter,
    );
    driver.apply_config(config);

    match maneuver {
        Maneuver::Turn {
            degrees,
            timeout_ms,
        } => {
            driver
                .turn_pid_within(degrees, Duration::from_millis(timeout_ms))
                .await?;
            info!(
                "Simulated heading {:.2} degrees after {} iterations",
                robot.yaw(),
                robot.iterations()
            );
        }
        Maneuver::Drive { inches, timeout_ms } => {
            driver
                .position_pid_within(inches, Duration::from_millis(timeout_ms))
                .await?;
            info!(
                "Simulated travel {:.2} in after {} iterations",
                robot.revolutions() * driver.wheel_circumference(),
                robot.iterations()
            );
        }
        Maneuver::Teleop {
            left_y,
            right_y,
            right_x,
            arcade,
            cycles,
        } => {
            controller.set_axis(Axis::LeftY, left_y);
            controller.set_axis(Axis::RightY, right_y);
            controller.set_axis(Axis::RightX, right_x);
            let mut tick = interval(Duration::from_millis(20));
            for _ in 0..cycles {
                tick.tick().await;
                if arcade {
                    driver.arcade_drive()?;
                } else {
                    driver.tank_drive()?;
                }
            }
            info!(
                "Left pair {:?}, right pair {:?}",
                robot.last_output(MotorSlot::FrontLeft),
                robot.last_output(MotorSlot::FrontRight)
            );
        }
    }

    Ok(())
}
