// Acceleration ramps
//
// A `Ramp` is a lazy, single-pass sequence of (elapsed, speed) samples taking
// one track from its current speed to a target at a bounded rate. A
// `RampSchedule` walks the left and right ramps in lockstep on a shared time
// axis so the controller can write both tracks at each step.

use std::iter::{FusedIterator, Peekable};

// Absorbs float error when deciding that the target has been reached
const REACH_EPS: f64 = 1e-9;

/// One point of a single-track ramp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampSample {
    pub elapsed_s: f64,
    pub speed: f64,
}

#[derive(Debug, Clone, Copy)]
enum RampState {
    Immediate,
    Stepping(u64),
    Final,
    Done,
}

/// Lazy ramp from `current` to `target`; see [`generate`]
#[derive(Debug)]
pub struct Ramp {
    current: f64,
    target: f64,
    max_step: f64,
    interval_s: f64,
    total_duration_s: f64,
    state: RampState,
}

/// Build the ramp for one track
///
/// Samples are spaced `interval_s` apart starting at 0 and each moves toward
/// `target` by at most `accel * interval_s`, never past it. Once the target is
/// reached (or the time runs out) a final `(total_duration_s, target)` sample
/// closes the sequence. With `accel <= 0` the sequence is the single sample
/// `(0, target)`.
pub fn generate(current: f64, target: f64, accel: f64, interval_s: f64, total_duration_s: f64) -> Ramp {
    let state = if accel > 0.0 && interval_s > 0.0 && accel.is_finite() {
        RampState::Stepping(0)
    } else {
        RampState::Immediate
    };
    Ramp {
        current,
        target,
        max_step: accel * interval_s,
        interval_s,
        total_duration_s,
        state,
    }
}

impl Ramp {
    fn speed_after(&self, steps: u64) -> f64 {
        let advance = steps as f64 * self.max_step;
        let delta = self.target - self.current;
        if delta.abs() <= advance + REACH_EPS {
            self.target
        } else {
            self.current + advance.copysign(delta)
        }
    }
}

impl Iterator for Ramp {
    type Item = RampSample;

    fn next(&mut self) -> Option<RampSample> {
        match self.state {
            RampState::Immediate => {
                self.state = RampState::Done;
                Some(RampSample {
                    elapsed_s: 0.0,
                    speed: self.target,
                })
            }
            RampState::Stepping(k) => {
                let elapsed_s = k as f64 * self.interval_s;
                if elapsed_s >= self.total_duration_s {
                    self.state = RampState::Done;
                    return Some(RampSample {
                        elapsed_s: self.total_duration_s,
                        speed: self.target,
                    });
                }
                let speed = self.speed_after(k.saturating_add(1));
                self.state = if speed == self.target {
                    RampState::Final
                } else {
                    RampState::Stepping(k.saturating_add(1))
                };
                Some(RampSample { elapsed_s, speed })
            }
            RampState::Final => {
                self.state = RampState::Done;
                Some(RampSample {
                    elapsed_s: self.total_duration_s,
                    speed: self.target,
                })
            }
            RampState::Done => None,
        }
    }
}

impl FusedIterator for Ramp {}

/// Both tracks' commanded speeds at one point of a schedule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleStep {
    pub elapsed_s: f64,
    pub left: f64,
    pub right: f64,
}

/// Left and right ramps merged onto one time axis
///
/// When only one ramp has a sample at a given time the other track keeps its
/// previous speed.
#[derive(Debug)]
pub struct RampSchedule {
    left: Peekable<Ramp>,
    right: Peekable<Ramp>,
    last_left: f64,
    last_right: f64,
}

impl RampSchedule {
    /// `accel` of `None` (or <= 0) jumps straight to the targets
    pub fn new(
        start: (f64, f64),
        target: (f64, f64),
        accel: Option<f64>,
        interval_s: f64,
        total_duration_s: f64,
    ) -> Self {
        let accel = accel.unwrap_or(0.0);
        Self {
            left: generate(start.0, target.0, accel, interval_s, total_duration_s).peekable(),
            right: generate(start.1, target.1, accel, interval_s, total_duration_s).peekable(),
            last_left: start.0,
            last_right: start.1,
        }
    }
}

impl Iterator for RampSchedule {
    type Item = ScheduleStep;

    fn next(&mut self) -> Option<ScheduleStep> {
        let next_left = self.left.peek().map(|s| s.elapsed_s);
        let next_right = self.right.peek().map(|s| s.elapsed_s);
        let elapsed_s = match (next_left, next_right) {
            (None, None) => return None,
            (Some(l), None) => l,
            (None, Some(r)) => r,
            (Some(l), Some(r)) => l.min(r),
        };

        if next_left == Some(elapsed_s) {
            if let Some(sample) = self.left.next() {
                self.last_left = sample.speed;
            }
        }
        if next_right == Some(elapsed_s) {
            if let Some(sample) = self.right.next() {
                self.last_right = sample.speed;
            }
        }

        Some(ScheduleStep {
            elapsed_s,
            left: self.last_left,
            right: self.last_right,
        })
    }
}

impl FusedIterator for RampSchedule {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_ends_exactly_at_target() {
        let samples: Vec<_> = generate(0.0, 100.0, 50.0, 0.1, 2.0).collect();
        let last = samples.last().unwrap();
        assert_eq!(last.elapsed_s, 2.0);
        assert_eq!(last.speed, 100.0);
        assert!(samples.iter().all(|s| s.speed <= 100.0));
    }

    #[test]
    fn test_ramp_step_bound_and_order() {
        let samples: Vec<_> = generate(0.0, 100.0, 50.0, 0.1, 2.0).collect();
        let mut previous = RampSample {
            elapsed_s: -1.0,
            speed: 0.0,
        };
        for sample in &samples {
            assert!(sample.elapsed_s > previous.elapsed_s);
            assert!(sample.speed - previous.speed <= 5.0 + 1e-9);
            previous = *sample;
        }
        // 20 steps of 5% plus the closing sample
        assert_eq!(samples.len(), 21);
        assert_eq!(samples[0], RampSample { elapsed_s: 0.0, speed: 5.0 });
    }

    #[test]
    fn test_zero_accel_is_single_jump() {
        let samples: Vec<_> = generate(20.0, -60.0, 0.0, 0.05, 3.0).collect();
        assert_eq!(samples, vec![RampSample { elapsed_s: 0.0, speed: -60.0 }]);

        let samples: Vec<_> = generate(20.0, -60.0, -5.0, 0.05, 3.0).collect();
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn test_deceleration_never_undershoots() {
        let samples: Vec<_> = generate(80.0, 10.0, 40.0, 0.25, 5.0).collect();
        assert!(samples.iter().all(|s| s.speed >= 10.0));
        assert_eq!(samples.last().unwrap().speed, 10.0);
        assert_eq!(samples[0].speed, 70.0);
    }

    #[test]
    fn test_slow_ramp_is_cut_by_duration() {
        let samples: Vec<_> = generate(0.0, 100.0, 10.0, 0.1, 1.0).collect();
        let intermediate = &samples[..samples.len() - 1];
        assert!(intermediate.iter().all(|s| s.elapsed_s < 1.0 && s.speed <= 10.0 + 1e-9));
        assert_eq!(
            *samples.last().unwrap(),
            RampSample { elapsed_s: 1.0, speed: 100.0 }
        );
    }

    #[test]
    fn test_step_count_past_u32() {
        // Tiny steps over a long ramp run past u32::MAX samples
        let mut ramp = generate(0.0, 100.0, 1e-6, 1e-9, 10.0);
        ramp.state = RampState::Stepping(u64::from(u32::MAX));
        let a = ramp.next().unwrap();
        let b = ramp.next().unwrap();
        assert!(a.elapsed_s > 4.0);
        assert!(b.elapsed_s > a.elapsed_s);
        assert!(b.speed > a.speed && b.speed < 100.0);
    }

    #[test]
    fn test_ramp_is_single_pass() {
        let mut ramp = generate(0.0, 10.0, 100.0, 0.1, 1.0);
        assert_eq!(ramp.by_ref().count(), 2);
        assert!(ramp.next().is_none());
    }

    #[test]
    fn test_schedule_lockstep() {
        let steps: Vec<_> = RampSchedule::new((0.0, 0.0), (20.0, -40.0), Some(100.0), 0.1, 1.0).collect();
        // Right needs 4 steps, left only 2; left holds while right continues
        assert_eq!(steps[0], ScheduleStep { elapsed_s: 0.0, left: 10.0, right: -10.0 });
        assert_eq!(steps[1].left, 20.0);
        assert_eq!(steps[2].left, 20.0);
        assert_eq!(steps[3].right, -40.0);
        let last = steps.last().unwrap();
        assert_eq!(*last, ScheduleStep { elapsed_s: 1.0, left: 20.0, right: -40.0 });
        assert!(steps.windows(2).all(|w| w[0].elapsed_s < w[1].elapsed_s));
    }

    #[test]
    fn test_schedule_without_accel() {
        let steps: Vec<_> = RampSchedule::new((10.0, 10.0), (60.0, -60.0), None, 0.05, 2.5).collect();
        assert_eq!(steps, vec![ScheduleStep { elapsed_s: 0.0, left: 60.0, right: -60.0 }]);
    }
}
