// Speed percentage -> PWM pulse conversion

use crate::config::CalibrationParams;

/// Map a signed speed percentage to a PWM `off` tick count
///
/// Input is clamped to [-100, 100]; this is an internal conversion and never
/// fails. Zero maps to `pwm_stop`; forward speeds interpolate over
/// `[pwm_fw_min, pwm_fw_max]` and reverse speeds over
/// `[pwm_rev_min, pwm_rev_max]`, so a speed just above zero lands near
/// `pwm_fw_min`, not `pwm_stop`. `reverse` flips the sign first, for channels
/// whose motor is mounted mirrored.
pub fn speed_to_pwm(speed: f64, reverse: bool, calib: &CalibrationParams) -> u16 {
    let speed = if speed.is_nan() { 0.0 } else { speed.clamp(-100.0, 100.0) };
    let speed = if reverse { -speed } else { speed };

    if speed == 0.0 {
        return calib.pwm_stop;
    }

    let (min, max) = if speed > 0.0 {
        (calib.pwm_fw_min, calib.pwm_fw_max)
    } else {
        (calib.pwm_rev_min, calib.pwm_rev_max)
    };
    let min = f64::from(min);
    let max = f64::from(max);
    let pulse = min + (speed.abs() / 100.0) * (max - min);

    // Always between two u16 bounds, so the cast cannot wrap
    pulse.round() as u16
}
