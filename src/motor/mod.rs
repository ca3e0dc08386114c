// Motion control core for the rover's two tracks
//
// Provides:
// - Speed percentage -> PWM pulse mapping
// - Calibration-based speed/distance/duration conversion
// - Differential-drive turn kinematics
// - Acceleration ramps
// - High-level drive controller (blocking and cancellable async)

mod cancel;
mod driver;
mod error;
pub mod calibration;
pub mod kinematics;
pub mod mapping;
pub mod mock;
pub mod pwm;
pub mod ramp;

pub use calibration::{RampUp, cm_per_second, duration_for_distance};
pub use cancel::{CancelToken, MotionOutcome, MotionTask};
pub use driver::{DriveController, MotionPhase, TrackChannel};
pub use error::{DriveError, ErrorKind, Result};
pub use kinematics::{angle_to_duration, resolve_turn};
pub use mapping::speed_to_pwm;
pub use mock::{MockPwmError, RecordingPwm};
pub use pwm::{DryRunPwm, PwmController};
pub use ramp::{Ramp, RampSample, RampSchedule, ScheduleStep};
