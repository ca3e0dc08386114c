// Defaults, channel layout and calibration records
use serde::{Deserialize, Serialize};

use crate::motor::DriveError;

// PWM pulse bounds for the track motor drivers (PCA9685 ticks)
pub const DEFAULT_PWM_FW_MIN: u16 = 307;
pub const DEFAULT_PWM_FW_MAX: u16 = 217;
pub const DEFAULT_PWM_STOP: u16 = 318;
pub const DEFAULT_PWM_REV_MIN: u16 = 329;
pub const DEFAULT_PWM_REV_MAX: u16 = 419;

// PWM channels (left track is mounted mirrored, so it runs reversed)
pub const DEFAULT_LEFT_CHANNEL: u8 = 8;
pub const DEFAULT_LEFT_CHANNEL_REVERSE: bool = true;
pub const DEFAULT_RIGHT_CHANNEL: u8 = 9;
pub const DEFAULT_RIGHT_CHANNEL_REVERSE: bool = false;

// Carrier frequency set at controller construction
pub const DEFAULT_PWM_FREQ_HZ: u16 = 50;

// Geometry and limits
pub const DEFAULT_TRACK_WIDTH_CM: f64 = 19.0;
pub const DEFAULT_MOVE_DURATION_MAX_S: f64 = 10.0;

// Calibration: at 70% the rover covers 30 cm in 3.5 s
pub const DEFAULT_BASE_SPEED: f64 = 70.0;
pub const DEFAULT_BASE_DISTANCE_CM: f64 = 30.0;
pub const DEFAULT_BASE_DURATION_S: f64 = 3.5;

// Ramp step used when a request does not give one
pub const DEFAULT_ACCEL_INTERVAL_S: f64 = 0.05;

// Upper bound accepted for `accel` (%/s)
pub const MAX_ACCEL: f64 = 1000.0;

/// Which PWM channel drives each track and whether it is mechanically reversed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackLayout {
    pub left_channel: u8,
    pub left_reverse: bool,
    pub right_channel: u8,
    pub right_reverse: bool,
    pub pwm_freq_hz: u16,
}

impl Default for TrackLayout {
    fn default() -> Self {
        Self {
            left_channel: DEFAULT_LEFT_CHANNEL,
            left_reverse: DEFAULT_LEFT_CHANNEL_REVERSE,
            right_channel: DEFAULT_RIGHT_CHANNEL,
            right_reverse: DEFAULT_RIGHT_CHANNEL_REVERSE,
            pwm_freq_hz: DEFAULT_PWM_FREQ_HZ,
        }
    }
}

/// Calibration constants used to turn speed percentages into PWM pulses and
/// real-world velocity.
///
/// The `base_*` triple is an empirical measurement: driving straight at
/// `base_speed` percent covers `base_distance_cm` in `base_duration_s`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationParams {
    pub pwm_fw_min: u16,
    pub pwm_fw_max: u16,
    pub pwm_stop: u16,
    pub pwm_rev_min: u16,
    pub pwm_rev_max: u16,
    pub track_width_cm: f64,
    pub base_speed: f64,
    pub base_distance_cm: f64,
    pub base_duration_s: f64,
    pub move_duration_max_s: f64,
}

impl Default for CalibrationParams {
    fn default() -> Self {
        Self {
            pwm_fw_min: DEFAULT_PWM_FW_MIN,
            pwm_fw_max: DEFAULT_PWM_FW_MAX,
            pwm_stop: DEFAULT_PWM_STOP,
            pwm_rev_min: DEFAULT_PWM_REV_MIN,
            pwm_rev_max: DEFAULT_PWM_REV_MAX,
            track_width_cm: DEFAULT_TRACK_WIDTH_CM,
            base_speed: DEFAULT_BASE_SPEED,
            base_distance_cm: DEFAULT_BASE_DISTANCE_CM,
            base_duration_s: DEFAULT_BASE_DURATION_S,
            move_duration_max_s: DEFAULT_MOVE_DURATION_MAX_S,
        }
    }
}

impl CalibrationParams {
    /// Check the invariants the kinematics rely on
    pub fn validate(&self) -> Result<(), DriveError> {
        if !(self.base_speed > 0.0 && self.base_speed <= 100.0) {
            return Err(DriveError::Validation(format!(
                "base_speed must be in (0, 100], got {}",
                self.base_speed
            )));
        }
        if !(self.base_distance_cm > 0.0 && self.base_distance_cm.is_finite()) {
            return Err(DriveError::Validation(format!(
                "base_distance_cm must be positive, got {}",
                self.base_distance_cm
            )));
        }
        if !(self.base_duration_s > 0.0 && self.base_duration_s.is_finite()) {
            return Err(DriveError::Validation(format!(
                "base_duration_s must be positive, got {}",
                self.base_duration_s
            )));
        }
        if !(self.track_width_cm > 0.0 && self.track_width_cm.is_finite()) {
            return Err(DriveError::Validation(format!(
                "track_width_cm must be positive, got {}",
                self.track_width_cm
            )));
        }
        if !(self.move_duration_max_s > 0.0 && self.move_duration_max_s.is_finite()) {
            return Err(DriveError::Validation(format!(
                "move_duration_max_s must be positive, got {}",
                self.move_duration_max_s
            )));
        }
        Ok(())
    }
}
