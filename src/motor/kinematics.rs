// Differential-drive turn kinematics
// Converts a (speed, radius, direction) turn into per-track speeds, and a turn
// angle into a duration using the calibration model.

use std::f64::consts::PI;

use crate::config::CalibrationParams;
use crate::messages::TurnDirection;

use super::calibration::{RampUp, check_derived_duration, travel_duration};
use super::error::{DriveError, Result};

/// Per-track speeds `(left, right)` for a turn
///
/// `radius_cm == 0` spins in place: turning left drives the left track
/// backward and the right track forward at the same magnitude. For an arc the
/// outer track runs at `speed` and the inner track at
/// `speed * (r - w/2) / (r + w/2)`; when the radius is tighter than half the
/// track width the inner track reverses, which is allowed.
///
/// `radius_cm` is expected to be non-negative (validated by the controller).
pub fn resolve_turn(
    speed: f64,
    radius_cm: f64,
    direction: TurnDirection,
    calib: &CalibrationParams,
) -> (f64, f64) {
    if radius_cm == 0.0 {
        return match direction {
            TurnDirection::Left => (-speed, speed),
            TurnDirection::Right => (speed, -speed),
        };
    }

    let half_width = calib.track_width_cm / 2.0;
    let outer = speed;
    let inner = speed * (radius_cm - half_width) / (radius_cm + half_width);
    match direction {
        TurnDirection::Left => (inner, outer),
        TurnDirection::Right => (outer, inner),
    }
}

/// Path length in cm travelled by the reference track while turning `angle_deg`
///
/// Spinning in place, each track runs on a circle whose diameter is the track
/// width; on an arc the outer radius is used as given.
pub fn turn_path_cm(angle_deg: f64, radius_cm: f64, calib: &CalibrationParams) -> f64 {
    if radius_cm == 0.0 {
        angle_deg / 360.0 * PI * calib.track_width_cm
    } else {
        angle_deg / 360.0 * 2.0 * PI * radius_cm
    }
}

/// Duration needed to turn `angle_deg` at `speed` on `radius_cm`
pub fn angle_to_duration(
    angle_deg: f64,
    speed: f64,
    radius_cm: f64,
    ramp: Option<RampUp>,
    calib: &CalibrationParams,
) -> Result<f64> {
    if !(angle_deg > 0.0) {
        return Err(DriveError::Range(format!(
            "turn angle must be positive, got {}",
            angle_deg
        )));
    }
    if speed == 0.0 {
        return Err(DriveError::Range(
            "turn speed is zero, the angle can never be reached".into(),
        ));
    }

    let path = turn_path_cm(angle_deg, radius_cm, calib);
    let duration = travel_duration(path, speed.abs(), ramp, calib)?;
    check_derived_duration(duration, calib)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_spin_in_place() {
        let calib = CalibrationParams::default();
        assert_eq!(
            resolve_turn(70.0, 0.0, TurnDirection::Left, &calib),
            (-70.0, 70.0)
        );
        assert_eq!(
            resolve_turn(70.0, 0.0, TurnDirection::Right, &calib),
            (70.0, -70.0)
        );
    }

    #[test]
    fn test_arc_inner_track_stops_at_half_width() {
        let calib = CalibrationParams::default();
        let r = calib.track_width_cm / 2.0;
        let (left, right) = resolve_turn(60.0, r, TurnDirection::Left, &calib);
        assert!(left.abs() < EPS);
        assert_eq!(right, 60.0);

        let (left, right) = resolve_turn(60.0, r, TurnDirection::Right, &calib);
        assert_eq!(left, 60.0);
        assert!(right.abs() < EPS);
    }

    #[test]
    fn test_arc_speeds() {
        let calib = CalibrationParams::default();
        let (left, right) = resolve_turn(70.0, 20.0, TurnDirection::Right, &calib);
        assert_eq!(left, 70.0);
        assert!((right - 70.0 * 10.5 / 29.5).abs() < EPS);
    }

    #[test]
    fn test_sharp_arc_reverses_inner_track() {
        let calib = CalibrationParams::default();
        let (left, right) = resolve_turn(70.0, 5.0, TurnDirection::Left, &calib);
        assert!(left < 0.0);
        assert_eq!(right, 70.0);
    }

    #[test]
    fn test_spin_duration() {
        let calib = CalibrationParams::default();
        let duration = angle_to_duration(180.0, 70.0, 0.0, None, &calib).unwrap();
        let expected = (0.5 * PI * 19.0) / (30.0 / 3.5);
        assert!((duration - expected).abs() < 1e-6);
    }

    #[test]
    fn test_arc_duration_uses_radius() {
        let calib = CalibrationParams::default();
        let duration = angle_to_duration(90.0, -70.0, 10.0, None, &calib).unwrap();
        let expected = (0.25 * 2.0 * PI * 10.0) / (30.0 / 3.5);
        assert!((duration - expected).abs() < 1e-6);
    }

    #[test]
    fn test_accel_lengthens_turn() {
        let calib = CalibrationParams::default();
        let plain = angle_to_duration(90.0, 70.0, 0.0, None, &calib).unwrap();
        let ramp = RampUp {
            from_speed: 0.0,
            accel: 100.0,
        };
        let ramped = angle_to_duration(90.0, 70.0, 0.0, Some(ramp), &calib).unwrap();
        assert!(ramped > plain);
    }

    #[test]
    fn test_angle_errors() {
        let calib = CalibrationParams::default();
        assert!(matches!(
            angle_to_duration(0.0, 70.0, 0.0, None, &calib),
            Err(DriveError::Range(_))
        ));
        assert!(matches!(
            angle_to_duration(90.0, 0.0, 0.0, None, &calib),
            Err(DriveError::Range(_))
        ));
        // Ten full circles of 1 m radius are far beyond the duration limit
        assert!(matches!(
            angle_to_duration(3600.0, 50.0, 100.0, None, &calib),
            Err(DriveError::Range(_))
        ));
    }
}
