// Rover track motion control
//
// Drives the left and right tracks of a differential-drive rover through an
// injected PWM controller: immediate speed control plus bounded, open-loop
// move and turn primitives with optional acceleration ramps.

pub mod config;
pub mod messages;
pub mod motor;
pub mod runtime;

pub use config::{CalibrationParams, TrackLayout};
pub use messages::{MotionRequest, MoveExtent, TurnDirection, TurnExtent, TurnRequest};
pub use motor::{CancelToken, DriveController, DriveError, MotionOutcome, PwmController};
