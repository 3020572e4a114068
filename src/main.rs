// src/main.rs - Operator CLI for the farm robot control panel
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use farm_pilot::config::{self, Config};
use farm_pilot::motion::{NudgeDirection, Position, SessionHandle, SessionOutcome};
use farm_pilot::panel::{event_channel, spawn_panel};
use farm_pilot::Robot;

#[derive(Parser, Debug)]
#[command(name = "farm-pilot", about = "Drive a farm robot through its control API.")]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging (every poll attempt)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read the current position
    Position,
    /// Move to an absolute position and wait for arrival
    MoveAbs {
        x: f64,
        y: f64,
        z: f64,
        #[arg(long)]
        speed: Option<u8>,
    },
    /// Move relative to the current position and wait for arrival
    MoveRel {
        dx: f64,
        dy: f64,
        dz: f64,
        #[arg(long)]
        speed: Option<u8>,
    },
    /// Jog one step in a direction (x+, x-, y+, y-, z+, z-)
    Nudge {
        direction: NudgeDirection,
        #[arg(long, default_value_t = 5.0)]
        step: f64,
        #[arg(long)]
        speed: Option<u8>,
    },
    /// Find home and wait until the robot reports the origin
    Home,
    /// Clear the emergency interlock
    Unlock,
    /// Run the watering sequence
    Water,
    /// Weed at a position
    Weed {
        x: f64,
        y: f64,
        z: f64,
        #[arg(long, default_value_t = 0.0)]
        depth: f64,
        #[arg(long)]
        speed: Option<u8>,
    },
    /// Capture a photo
    Photo,
    /// Delete all captured photos on the server
    ClearPhotos,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::INFO })
        .init();

    let config = match cli.config {
        Some(ref path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            config::load_config(&path.to_string_lossy()).map_err(|e| {
                tracing::error!("Failed to load config from '{}': {}", path.display(), e);
                e
            })?
        }
        None => Config::default(),
    }
    .with_env_overrides();

    let (events, stream) = event_channel();
    let (panel, panel_task) = spawn_panel(stream);
    let robot = Robot::connect(&config, events)?;
    let speed = |s: Option<u8>| s.unwrap_or(config.motion.default_speed);

    // Relative motion is computed from the last known position, so read it first.
    let needs_position = matches!(cli.command, Command::MoveRel { .. } | Command::Nudge { .. });
    if needs_position {
        robot.refresh_position().await?;
    }

    let result = match cli.command {
        Command::Position => {
            let position = robot.refresh_position().await?;
            println!("{}", position);
            Ok(())
        }
        Command::MoveAbs { x, y, z, speed: s } => {
            let handle = robot.motion().move_absolute(Position::new(x, y, z), speed(s)).await;
            wait(handle).await
        }
        Command::MoveRel { dx, dy, dz, speed: s } => {
            let handle = robot.motion().move_relative(Position::new(dx, dy, dz), speed(s)).await;
            wait(handle).await
        }
        Command::Nudge { direction, step, speed: s } => {
            let handle = robot.motion().nudge(direction, step, speed(s)).await;
            wait(handle).await
        }
        Command::Home => wait(robot.motion().go_home().await).await,
        Command::Unlock => robot.unlock().await.map_err(Into::into),
        Command::Water => robot.water_plant().await.map_err(Into::into),
        Command::Weed { x, y, z, depth, speed: s } => {
            robot.weed(Position::new(x, y, z), depth, speed(s)).await.map_err(Into::into)
        }
        Command::Photo => {
            let photo = robot.take_photo().await?;
            println!("{}", serde_json::to_string_pretty(&photo)?);
            Ok(())
        }
        Command::ClearPhotos => {
            let cleared = robot.clear_photos().await?;
            println!("{}", cleared.message);
            Ok(())
        }
    };

    drop(robot);
    let state = panel_task.await?;
    drop(panel);
    if !state.status_text().is_empty() {
        println!("{}", state.status_text());
    }
    result
}

/// Waits for a motion session and maps dispatch failures to an error exit.
async fn wait(handle: SessionHandle) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let id = handle.id();
    let kind = handle.kind();
    match handle.outcome().await {
        SessionOutcome::Converged { attempts, position } => {
            tracing::info!("Session {} ({} move) reached {} after {} attempts", id, kind, position, attempts);
            Ok(())
        }
        SessionOutcome::TimedOut { attempts } => {
            tracing::warn!("Session {} ({} move) gave up after {} attempts", id, kind, attempts);
            Ok(())
        }
        SessionOutcome::Cancelled { .. } => Ok(()),
        SessionOutcome::DispatchFailed(message) => Err(message.into()),
    }
}
