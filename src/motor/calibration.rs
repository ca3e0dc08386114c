// Speed / distance / duration conversions based on the empirical calibration
//
// Velocity is assumed linear in the commanded percentage: at `base_speed` the
// rover covers `base_distance_cm` in `base_duration_s`. An acceleration given
// in %/s is converted to cm/s^2 with the same factor.

use crate::config::CalibrationParams;

use super::error::{DriveError, Result};

/// Ramp-up phase preceding a constant-speed run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampUp {
    /// Speed percentage the ramp starts from
    pub from_speed: f64,
    /// Acceleration in percent per second
    pub accel: f64,
}

/// Linear velocity in cm/s for a speed percentage (sign ignored)
pub fn cm_per_second(speed_percent: f64, calib: &CalibrationParams) -> f64 {
    (calib.base_distance_cm / calib.base_duration_s) * (speed_percent.abs() / calib.base_speed)
}

/// Time needed to cover `distance_cm` at an average track speed of
/// `avg_speed_percent`, optionally ramping up from a different speed first
///
/// Fails with [`DriveError::Range`] when the result is not in
/// `(0, move_duration_max_s]` (this includes a zero target speed).
pub fn duration_for_distance(
    distance_cm: f64,
    avg_speed_percent: f64,
    ramp: Option<RampUp>,
    calib: &CalibrationParams,
) -> Result<f64> {
    if !(distance_cm > 0.0) {
        return Err(DriveError::Range(format!(
            "distance must be positive, got {} cm",
            distance_cm
        )));
    }
    let duration = travel_duration(distance_cm, avg_speed_percent, ramp, calib)?;
    check_derived_duration(duration, calib)
}

/// Travel time over a path length, ignoring the duration limit
pub(crate) fn travel_duration(
    path_cm: f64,
    target_speed: f64,
    ramp: Option<RampUp>,
    calib: &CalibrationParams,
) -> Result<f64> {
    let v1 = cm_per_second(target_speed, calib);

    let Some(ramp) = ramp.filter(|r| r.accel > 0.0) else {
        if v1 == 0.0 {
            return Err(DriveError::Range(
                "target speed is zero, the path can never be covered".into(),
            ));
        }
        return Ok(path_cm / v1);
    };

    let v0 = cm_per_second(ramp.from_speed, calib);
    let a = cm_per_second(ramp.accel, calib);
    let t_ramp = (v1 - v0).abs() / a;
    let d_ramp = (v0 + v1) / 2.0 * t_ramp;

    if d_ramp >= path_cm {
        // Path ends mid-ramp: smallest positive root of s = v0*t +/- a*t^2/2
        let t = if v1 >= v0 {
            (-v0 + (v0 * v0 + 2.0 * a * path_cm).sqrt()) / a
        } else {
            let disc = (v0 * v0 - 2.0 * a * path_cm).max(0.0);
            (v0 - disc.sqrt()) / a
        };
        return Ok(t);
    }

    if v1 == 0.0 {
        return Err(DriveError::Range(
            "ramp ends at zero speed before the path is covered".into(),
        ));
    }
    Ok(t_ramp + (path_cm - d_ramp) / v1)
}

/// Reject derived durations outside `(0, move_duration_max_s]`
pub(crate) fn check_derived_duration(duration: f64, calib: &CalibrationParams) -> Result<f64> {
    if duration > 0.0 && duration <= calib.move_duration_max_s {
        Ok(duration)
    } else {
        Err(DriveError::Range(format!(
            "derived duration {:.3}s outside (0, {}]",
            duration, calib.move_duration_max_s
        )))
    }
}
