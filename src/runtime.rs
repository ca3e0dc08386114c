// Command-line runner: executes one move/turn against the dry-run backend
// Ctrl+C cancels the motion, reports where the tracks were left, then stops them

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use tracing::info;

use crate::config::{CalibrationParams, TrackLayout};
use crate::messages::{MotionRequest, TurnDirection, TurnRequest};
use crate::motor::{DriveController, DriveError, DryRunPwm, MotionOutcome};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Parser)]
#[command(name = "rover-tracks", version, about = "Drive the rover tracks with timed moves and turns")]
pub struct Cli {
    /// JSON file with calibration constants (missing fields use defaults)
    #[arg(long, global = true)]
    pub calibration: Option<PathBuf>,

    /// JSON file with the PWM channel layout
    #[arg(long, global = true)]
    pub layout: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Drive both tracks for a duration or a distance
    Move {
        /// Left track speed (-100..100)
        #[arg(allow_negative_numbers = true)]
        left: f64,
        /// Right track speed (-100..100)
        #[arg(allow_negative_numbers = true)]
        right: f64,
        /// Seconds to drive
        #[arg(long)]
        duration: Option<f64>,
        /// Centimetres to drive
        #[arg(long)]
        distance: Option<f64>,
        #[command(flatten)]
        ramp: RampArgs,
    },
    /// Turn in place (radius 0) or along an arc
    Turn {
        /// Speed of the outer track (-100..100)
        #[arg(allow_negative_numbers = true)]
        speed: f64,
        /// Turning radius in cm
        radius: f64,
        /// left or right
        direction: TurnDirection,
        /// Seconds to turn
        #[arg(long)]
        duration: Option<f64>,
        /// Degrees to turn
        #[arg(long)]
        angle: Option<f64>,
        #[command(flatten)]
        ramp: RampArgs,
    },
    /// Stop both tracks
    Stop,
}

#[derive(Debug, clap::Args)]
pub struct RampArgs {
    /// Acceleration in %/s (omit to jump straight to speed)
    #[arg(long)]
    pub accel: Option<f64>,
    /// Ramp step in seconds [default: 0.05, capped at the duration]
    #[arg(long)]
    pub accel_interval: Option<f64>,
    /// Leave the tracks running when the motion ends
    #[arg(long)]
    pub keep_running: bool,
}

/// A parsed motion ready to hand to the controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    Move(MotionRequest),
    Turn(TurnRequest),
    Stop,
}

impl Command {
    pub fn into_motion(self) -> Result<Motion, DriveError> {
        match self {
            Command::Move {
                left,
                right,
                duration,
                distance,
                ramp,
            } => {
                let mut req = MotionRequest::from_parts(left, right, duration, distance)?
                    .with_stop_at_end(!ramp.keep_running);
                req.accel = ramp.accel;
                req.accel_interval_s = ramp.accel_interval;
                Ok(Motion::Move(req))
            }
            Command::Turn {
                speed,
                radius,
                direction,
                duration,
                angle,
                ramp,
            } => {
                let mut req = TurnRequest::from_parts(speed, radius, direction, duration, angle)?
                    .with_stop_at_end(!ramp.keep_running);
                req.accel = ramp.accel;
                req.accel_interval_s = ramp.accel_interval;
                Ok(Motion::Turn(req))
            }
            Command::Stop => Ok(Motion::Stop),
        }
    }
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, BoxError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

pub async fn run(cli: Cli) -> Result<(), BoxError> {
    let calib: CalibrationParams = match &cli.calibration {
        Some(path) => {
            info!("Loading calibration from {}", path.display());
            load_json(path)?
        }
        None => CalibrationParams::default(),
    };
    let layout: TrackLayout = match &cli.layout {
        Some(path) => {
            info!("Loading channel layout from {}", path.display());
            load_json(path)?
        }
        None => TrackLayout::default(),
    };

    let controller = Arc::new(DriveController::with_config(DryRunPwm::new(), layout, calib)?);

    let task = match cli.command.into_motion()? {
        Motion::Move(req) => controller.spawn_move(req)?,
        Motion::Turn(req) => controller.spawn_turn(req)?,
        Motion::Stop => {
            controller.stop()?;
            info!("Tracks stopped");
            return Ok(());
        }
    };

    info!("Motion started (Ctrl+C to interrupt)");
    let token = task.token().clone();
    let join = task.join();
    tokio::pin!(join);

    let outcome = tokio::select! {
        result = &mut join => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupt received, cancelling motion");
            token.cancel();
            join.await?
        }
    };

    if outcome == MotionOutcome::Cancelled {
        info!(
            "Motion interrupted at left={:.1} right={:.1}",
            controller.get_left_track_speed(),
            controller.get_right_track_speed()
        );
        controller.stop()?;
        info!("Tracks stopped");
    }
    Ok(())
}
