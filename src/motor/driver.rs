// High-level drive controller for the two rover tracks
//
// Combines PWM mapping, calibration, turn kinematics and acceleration ramps to
// provide immediate speed control plus bounded move/turn primitives, both
// blocking and as cancellable async tasks.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::{CalibrationParams, DEFAULT_ACCEL_INTERVAL_S, MAX_ACCEL, TrackLayout};
use crate::messages::{MotionRequest, MoveExtent, TurnExtent, TurnRequest};

use super::calibration::{RampUp, duration_for_distance};
use super::cancel::{CancelToken, MotionOutcome, MotionTask};
use super::error::{DriveError, Result};
use super::kinematics::{angle_to_duration, resolve_turn};
use super::mapping::speed_to_pwm;
use super::pwm::PwmController;
use super::ramp::{RampSchedule, ScheduleStep};

/// Lifecycle of one scheduled move or turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionPhase {
    Idle,
    Ramping,
    Holding,
    Stopping,
    /// Last async motion was cancelled; tracks were left as they were
    Cancelled,
}

/// One physical track and the PWM channel driving it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackChannel {
    channel: u8,
    reverse: bool,
    speed: f64,
}

impl TrackChannel {
    fn new(channel: u8, reverse: bool) -> Self {
        Self {
            channel,
            reverse,
            speed: 0.0,
        }
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn reverse(&self) -> bool {
        self.reverse
    }

    /// Last commanded speed (not read back from hardware)
    pub fn speed(&self) -> f64 {
        self.speed
    }
}

#[derive(Debug, Clone, Copy)]
enum Track {
    Left,
    Right,
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Track::Left => f.write_str("left"),
            Track::Right => f.write_str("right"),
        }
    }
}

struct DriveState<P> {
    pwm: P,
    layout: TrackLayout,
    calib: CalibrationParams,
    left: TrackChannel,
    right: TrackChannel,
    phase: MotionPhase,
}

impl<P: PwmController> DriveState<P> {
    fn write_track(&mut self, track: Track, speed: f64, calib: &CalibrationParams) -> Result<()> {
        let channel = match track {
            Track::Left => &mut self.left,
            Track::Right => &mut self.right,
        };
        channel.speed = speed;
        let pulse = speed_to_pwm(speed, channel.reverse, calib);
        debug!(
            "{} track: speed={:.1} pwm={} (channel {})",
            track, speed, pulse, channel.channel
        );
        let id = channel.channel;
        self.pwm.set_pwm(id, 0, pulse).map_err(|e| {
            warn!("Failed to set {} track PWM: {}", track, e);
            DriveError::hardware(e)
        })
    }

    fn set_phase(&mut self, phase: MotionPhase) {
        if self.phase != phase {
            debug!("Motion phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }
}

// Fully resolved motion, ready to execute
struct MotionPlan {
    schedule: RampSchedule,
    targets: (f64, f64),
    duration_s: f64,
    stop_at_end: bool,
    calib: CalibrationParams,
}

/// Controller for the left and right tracks
///
/// All methods take `&self`; share the controller through an [`Arc`] to call
/// [`stop`](Self::stop) or the speed setters while a move is running. At most
/// one move/turn should be in flight at a time.
pub struct DriveController<P: PwmController> {
    state: Mutex<DriveState<P>>,
}

impl<P: PwmController> DriveController<P> {
    /// Create a controller with the default channel layout and calibration
    pub fn new(pwm: P) -> Result<Self> {
        Self::with_config(pwm, TrackLayout::default(), CalibrationParams::default())
    }

    /// Create a controller; sets the PWM carrier frequency
    pub fn with_config(mut pwm: P, layout: TrackLayout, calib: CalibrationParams) -> Result<Self> {
        calib.validate()?;
        pwm.set_pwm_freq(layout.pwm_freq_hz).map_err(|e| {
            warn!("Failed to initialize PWM controller: {}", e);
            DriveError::hardware(e)
        })?;
        info!(
            "Tracks initialized: left=ch{}{} right=ch{}{} @ {}Hz",
            layout.left_channel,
            if layout.left_reverse { " (reversed)" } else { "" },
            layout.right_channel,
            if layout.right_reverse { " (reversed)" } else { "" },
            layout.pwm_freq_hz
        );

        Ok(Self {
            state: Mutex::new(DriveState {
                pwm,
                layout,
                calib,
                left: TrackChannel::new(layout.left_channel, layout.left_reverse),
                right: TrackChannel::new(layout.right_channel, layout.right_reverse),
                phase: MotionPhase::Idle,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, DriveState<P>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn calibration(&self) -> CalibrationParams {
        self.lock().calib
    }

    /// Replace the calibration; takes effect for the next operation
    pub fn set_calibration(&self, calib: CalibrationParams) -> Result<()> {
        calib.validate()?;
        info!("Calibration updated: {:?}", calib);
        self.lock().calib = calib;
        Ok(())
    }

    pub fn layout(&self) -> TrackLayout {
        self.lock().layout
    }

    pub fn phase(&self) -> MotionPhase {
        self.lock().phase
    }

    /// Snapshot of `(left, right)` track channels
    pub fn channels(&self) -> (TrackChannel, TrackChannel) {
        let state = self.lock();
        (state.left, state.right)
    }

    pub fn get_left_track_speed(&self) -> f64 {
        self.lock().left.speed
    }

    pub fn get_right_track_speed(&self) -> f64 {
        self.lock().right.speed
    }

    pub fn set_left_track_speed(&self, speed: f64) -> Result<()> {
        self.set_track_speed(Track::Left, speed)
    }

    pub fn set_right_track_speed(&self, speed: f64) -> Result<()> {
        self.set_track_speed(Track::Right, speed)
    }

    fn set_track_speed(&self, track: Track, speed: f64) -> Result<()> {
        validate_speed(speed, format_args!("{} track", track))?;
        let mut state = self.lock();
        let calib = state.calib;
        state.write_track(track, speed, &calib)
    }

    /// Set both tracks to zero (idempotent)
    pub fn stop(&self) -> Result<()> {
        debug!("Stopping both tracks");
        let mut state = self.lock();
        let calib = state.calib;
        state.write_track(Track::Left, 0.0, &calib)?;
        state.write_track(Track::Right, 0.0, &calib)
    }

    /// Drive both tracks for a duration or distance, blocking the calling thread
    pub fn move_tracks(&self, req: &MotionRequest) -> Result<()> {
        let plan = self.plan_move(req)?;
        self.run_blocking(plan)
    }

    /// Async [`move_tracks`](Self::move_tracks); checks `cancel` once per ramp step
    pub async fn move_async(&self, req: &MotionRequest, cancel: &CancelToken) -> Result<MotionOutcome> {
        let plan = self.plan_move(req)?;
        self.run_async(plan, cancel).await
    }

    /// Turn in place or along an arc, blocking the calling thread
    pub fn turn(&self, req: &TurnRequest) -> Result<()> {
        let plan = self.plan_turn(req)?;
        self.run_blocking(plan)
    }

    /// Async [`turn`](Self::turn); checks `cancel` once per ramp step
    pub async fn turn_async(&self, req: &TurnRequest, cancel: &CancelToken) -> Result<MotionOutcome> {
        let plan = self.plan_turn(req)?;
        self.run_async(plan, cancel).await
    }

    fn plan_move(&self, req: &MotionRequest) -> Result<MotionPlan> {
        validate_speed(req.left_speed, "left track")?;
        validate_speed(req.right_speed, "right track")?;
        validate_accel(req.accel)?;

        let (calib, start) = {
            let state = self.lock();
            (state.calib, (state.left.speed, state.right.speed))
        };

        let duration_s = match req.extent {
            MoveExtent::Duration(d) => validate_duration(d, &calib)?,
            MoveExtent::Distance(cm) => {
                if !(cm > 0.0 && cm.is_finite()) {
                    return Err(DriveError::Validation(format!(
                        "distance must be a positive number of cm, got {}",
                        cm
                    )));
                }
                let target_avg = (req.left_speed.abs() + req.right_speed.abs()) / 2.0;
                let ramp = ramp_from(req.accel, (start.0.abs() + start.1.abs()) / 2.0);
                duration_for_distance(cm, target_avg, ramp, &calib)?
            }
        };

        build_plan(
            start,
            (req.left_speed, req.right_speed),
            duration_s,
            req.accel,
            req.accel_interval_s,
            req.stop_at_end,
            calib,
        )
    }

    fn plan_turn(&self, req: &TurnRequest) -> Result<MotionPlan> {
        validate_speed(req.speed, "turn")?;
        if !(req.radius_cm >= 0.0 && req.radius_cm.is_finite()) {
            return Err(DriveError::Validation(format!(
                "radius must be >= 0 cm, got {}",
                req.radius_cm
            )));
        }
        validate_accel(req.accel)?;

        let (calib, start) = {
            let state = self.lock();
            (state.calib, (state.left.speed, state.right.speed))
        };

        let duration_s = match req.extent {
            TurnExtent::Duration(d) => validate_duration(d, &calib)?,
            TurnExtent::Angle(deg) => {
                if !(deg > 0.0 && deg.is_finite()) {
                    return Err(DriveError::Validation(format!(
                        "turn angle must be positive, got {}",
                        deg
                    )));
                }
                let ramp = ramp_from(req.accel, (start.0.abs() + start.1.abs()) / 2.0);
                angle_to_duration(deg, req.speed, req.radius_cm, ramp, &calib)?
            }
        };

        let targets = resolve_turn(req.speed, req.radius_cm, req.direction, &calib);
        debug!(
            "Turn {} at {:.1}% radius={}cm -> left={:.1} right={:.1}",
            req.direction, req.speed, req.radius_cm, targets.0, targets.1
        );

        build_plan(
            start,
            targets,
            duration_s,
            req.accel,
            req.accel_interval_s,
            req.stop_at_end,
            calib,
        )
    }

    fn begin(&self) {
        self.lock().set_phase(MotionPhase::Ramping);
    }

    // Write one schedule step, left before right
    fn apply_step(&self, step: &ScheduleStep, plan: &MotionPlan) -> Result<()> {
        let mut state = self.lock();
        let result = state
            .write_track(Track::Left, step.left, &plan.calib)
            .and_then(|_| state.write_track(Track::Right, step.right, &plan.calib));
        match result {
            Ok(()) => {
                if (step.left, step.right) == plan.targets {
                    state.set_phase(MotionPhase::Holding);
                }
                Ok(())
            }
            Err(e) => {
                state.set_phase(MotionPhase::Idle);
                Err(e)
            }
        }
    }

    fn finish(&self, stop_at_end: bool) -> Result<()> {
        if stop_at_end {
            self.lock().set_phase(MotionPhase::Stopping);
            if let Err(e) = self.stop() {
                self.lock().set_phase(MotionPhase::Idle);
                return Err(e);
            }
        }
        self.lock().set_phase(MotionPhase::Idle);
        info!("Motion complete");
        Ok(())
    }

    fn run_blocking(&self, mut plan: MotionPlan) -> Result<()> {
        let started = Instant::now();
        self.begin();

        while let Some(step) = plan.schedule.next() {
            sleep_until_blocking(started + Duration::from_secs_f64(step.elapsed_s));
            self.apply_step(&step, &plan)?;
        }
        sleep_until_blocking(started + Duration::from_secs_f64(plan.duration_s));

        self.finish(plan.stop_at_end)
    }

    async fn run_async(&self, mut plan: MotionPlan, cancel: &CancelToken) -> Result<MotionOutcome> {
        let started = tokio::time::Instant::now();
        self.begin();

        while let Some(step) = plan.schedule.next() {
            let deadline = started + Duration::from_secs_f64(step.elapsed_s);
            if suspend_until(deadline, cancel).await {
                return Ok(self.cancelled());
            }
            self.apply_step(&step, &plan)?;
        }
        let deadline = started + Duration::from_secs_f64(plan.duration_s);
        if suspend_until(deadline, cancel).await {
            return Ok(self.cancelled());
        }

        self.finish(plan.stop_at_end)?;
        Ok(MotionOutcome::Completed)
    }

    fn cancelled(&self) -> MotionOutcome {
        let mut state = self.lock();
        state.set_phase(MotionPhase::Cancelled);
        info!(
            "Motion cancelled; tracks left at left={:.1} right={:.1}",
            state.left.speed, state.right.speed
        );
        MotionOutcome::Cancelled
    }
}

impl<P: PwmController + 'static> DriveController<P> {
    /// Validate `req` and run it as a tokio task
    pub fn spawn_move(self: &Arc<Self>, req: MotionRequest) -> Result<MotionTask> {
        let plan = self.plan_move(&req)?;
        Ok(self.spawn_plan(plan))
    }

    /// Validate `req` and run it as a tokio task
    pub fn spawn_turn(self: &Arc<Self>, req: TurnRequest) -> Result<MotionTask> {
        let plan = self.plan_turn(&req)?;
        Ok(self.spawn_plan(plan))
    }

    fn spawn_plan(self: &Arc<Self>, plan: MotionPlan) -> MotionTask {
        let token = CancelToken::new();
        let task_token = token.clone();
        let controller = Arc::clone(self);
        let handle = tokio::spawn(async move { controller.run_async(plan, &task_token).await });
        MotionTask::new(token, handle)
    }
}

impl<P: PwmController> fmt::Debug for DriveController<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriveController").finish_non_exhaustive()
    }
}

impl<P: PwmController> Drop for DriveController<P> {
    fn drop(&mut self) {
        // Try to stop the tracks when the controller goes away (safety measure)
        if let Err(e) = self.stop() {
            warn!("Failed to stop tracks on drop: {}", e);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn build_plan(
    start: (f64, f64),
    targets: (f64, f64),
    duration_s: f64,
    accel: Option<f64>,
    interval_s: Option<f64>,
    stop_at_end: bool,
    calib: CalibrationParams,
) -> Result<MotionPlan> {
    let interval_s = match interval_s {
        Some(i) if !(i > 0.0 && i <= duration_s) => {
            return Err(DriveError::Validation(format!(
                "accel interval must be in (0, {:.3}], got {}",
                duration_s, i
            )));
        }
        Some(i) => i,
        None => DEFAULT_ACCEL_INTERVAL_S.min(duration_s),
    };

    match accel.filter(|a| *a > 0.0) {
        Some(a) => info!(
            "Ramping to left={:.1} right={:.1} for {:.2}s (accel={}%/s, step={}s)",
            targets.0, targets.1, duration_s, a, interval_s
        ),
        None => info!(
            "Jumping to left={:.1} right={:.1} for {:.2}s",
            targets.0, targets.1, duration_s
        ),
    }

    Ok(MotionPlan {
        schedule: RampSchedule::new(start, targets, accel, interval_s, duration_s),
        targets,
        duration_s,
        stop_at_end,
        calib,
    })
}

fn validate_speed(speed: f64, what: impl fmt::Display) -> Result<()> {
    if (-100.0..=100.0).contains(&speed) {
        Ok(())
    } else {
        Err(DriveError::Validation(format!(
            "{} speed must be in [-100, 100], got {}",
            what, speed
        )))
    }
}

fn validate_duration(duration_s: f64, calib: &CalibrationParams) -> Result<f64> {
    if duration_s > 0.0 && duration_s <= calib.move_duration_max_s {
        Ok(duration_s)
    } else {
        Err(DriveError::Validation(format!(
            "duration must be in (0, {}] s, got {}",
            calib.move_duration_max_s, duration_s
        )))
    }
}

fn validate_accel(accel: Option<f64>) -> Result<()> {
    match accel {
        Some(a) if !(0.0..=MAX_ACCEL).contains(&a) => Err(DriveError::Validation(format!(
            "accel must be in [0, {}] %/s, got {}",
            MAX_ACCEL, a
        ))),
        _ => Ok(()),
    }
}

fn ramp_from(accel: Option<f64>, from_speed: f64) -> Option<RampUp> {
    accel
        .filter(|a| *a > 0.0)
        .map(|accel| RampUp { from_speed, accel })
}

fn sleep_until_blocking(deadline: Instant) {
    let remaining = deadline.saturating_duration_since(Instant::now());
    if !remaining.is_zero() {
        std::thread::sleep(remaining);
    }
}

// Returns true if cancelled before the deadline
async fn suspend_until(deadline: tokio::time::Instant, cancel: &CancelToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => true,
        _ = tokio::time::sleep_until(deadline) => false,
    }
}
