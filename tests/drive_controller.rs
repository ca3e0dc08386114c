// End-to-end drive scenarios against the recording PWM backend

use std::sync::Arc;
use std::time::Duration;

use rover_tracks::motor::{ErrorKind, MotionPhase, RecordingPwm, speed_to_pwm};
use rover_tracks::{
    CalibrationParams, CancelToken, DriveController, MotionOutcome, MotionRequest, TurnDirection, TurnRequest,
};
use tokio::time::Instant;

const LEFT: u8 = 8;
const RIGHT: u8 = 9;
const STOP: u16 = 318;

fn pulse(speed: f64, reverse: bool) -> u16 {
    speed_to_pwm(speed, reverse, &CalibrationParams::default())
}

fn controller() -> (Arc<DriveController<RecordingPwm>>, RecordingPwm) {
    let pwm = RecordingPwm::new();
    let ctrl = DriveController::new(pwm.clone()).unwrap();
    (Arc::new(ctrl), pwm)
}

#[tokio::test(start_paused = true)]
async fn test_json_move_runs_and_stops() {
    let (ctrl, pwm) = controller();
    let req: MotionRequest =
        serde_json::from_str(r#"{"left_speed": 60, "right_speed": -60, "duration_s": 2.5}"#).unwrap();

    let started = Instant::now();
    let outcome = ctrl.move_async(&req, &CancelToken::new()).await.unwrap();

    assert_eq!(outcome, MotionOutcome::Completed);
    assert!((started.elapsed().as_secs_f64() - 2.5).abs() < 1e-3);
    assert_eq!(
        pwm.calls(),
        vec![
            (LEFT, 0, pulse(60.0, true)),
            (RIGHT, 0, pulse(-60.0, false)),
            (LEFT, 0, STOP),
            (RIGHT, 0, STOP),
        ]
    );
    assert_eq!(ctrl.phase(), MotionPhase::Idle);
    assert_eq!(ctrl.get_left_track_speed(), 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_distance_uses_calibration() {
    let (ctrl, pwm) = controller();
    let req = MotionRequest::for_distance(70.0, 70.0, 30.0);

    let started = Instant::now();
    ctrl.move_async(&req, &CancelToken::new()).await.unwrap();

    // 30 cm at the 70% base speed is the 3.5 s base duration
    let elapsed = started.elapsed().as_secs_f64();
    assert!((elapsed - 3.5).abs() < 1e-3, "elapsed {}", elapsed);
    assert_eq!(pwm.pulses(RIGHT), vec![pulse(70.0, false), STOP]);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_then_resume_ramps_from_current_speed() {
    let (ctrl, pwm) = controller();
    let req = MotionRequest::for_duration(60.0, 60.0, 3.0)
        .with_accel(50.0)
        .with_accel_interval(0.1);

    let task = ctrl.spawn_move(req).unwrap();
    tokio::time::sleep(Duration::from_millis(550)).await;
    task.cancel();
    assert_eq!(task.join().await.unwrap(), MotionOutcome::Cancelled);

    // Steps at 0.0..=0.5 s were applied, each 5% further along
    assert_eq!(ctrl.phase(), MotionPhase::Cancelled);
    assert!((ctrl.get_right_track_speed() - 30.0).abs() < 1e-9);
    assert_eq!(pwm.pulses(RIGHT).len(), 6);

    let writes = pwm.write_count();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(pwm.write_count(), writes, "cancelled motion kept writing");

    pwm.clear();
    let resume = MotionRequest::for_duration(60.0, 60.0, 2.0)
        .with_accel(50.0)
        .with_accel_interval(0.1);
    let outcome = ctrl.spawn_move(resume).unwrap().join().await.unwrap();
    assert_eq!(outcome, MotionOutcome::Completed);

    let right = pwm.pulses(RIGHT);
    assert_eq!(right.first(), Some(&pulse(35.0, false)));
    assert_eq!(right.last(), Some(&STOP));
}

#[tokio::test(start_paused = true)]
async fn test_arc_turn_by_angle() {
    let (ctrl, pwm) = controller();
    let calib = CalibrationParams::default();
    let req = TurnRequest::for_angle(70.0, 30.0, TurnDirection::Right, 90.0);

    let started = Instant::now();
    let outcome = ctrl.turn_async(&req, &CancelToken::new()).await.unwrap();
    assert_eq!(outcome, MotionOutcome::Completed);

    // Quarter circle of radius 30 cm at the base speed
    let path = std::f64::consts::PI * 30.0 / 2.0;
    let expected = path / (calib.base_distance_cm / calib.base_duration_s);
    let elapsed = started.elapsed().as_secs_f64();
    assert!((elapsed - expected).abs() < 1e-3, "elapsed {} expected {}", elapsed, expected);

    // Right turn: the left track is outer and runs at full requested speed
    let half = calib.track_width_cm / 2.0;
    let inner = 70.0 * (30.0 - half) / (30.0 + half);
    assert_eq!(pwm.pulses(LEFT), vec![pulse(70.0, true), STOP]);
    assert_eq!(pwm.pulses(RIGHT), vec![pulse(inner, false), STOP]);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_requests_leave_tracks_alone() {
    let (ctrl, pwm) = controller();

    let shape = MotionRequest::from_parts(50.0, 50.0, None, None).unwrap_err();
    assert_eq!(shape.kind(), ErrorKind::RequestShape);
    assert!(serde_json::from_str::<MotionRequest>(r#"{"left_speed": 50, "right_speed": 50}"#).is_err());

    let err = ctrl
        .spawn_move(MotionRequest::for_duration(120.0, 50.0, 1.0))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = ctrl
        .spawn_move(MotionRequest::for_distance(1.0, 1.0, 500.0))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Range);

    assert_eq!(pwm.write_count(), 0);
    assert_eq!(ctrl.phase(), MotionPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_very_short_move_without_interval() {
    let (ctrl, pwm) = controller();
    let req: MotionRequest =
        serde_json::from_str(r#"{"left_speed": 50, "right_speed": 50, "duration_s": 0.03}"#).unwrap();
    assert_eq!(req.accel_interval_s, None);

    let outcome = ctrl.move_async(&req, &CancelToken::new()).await.unwrap();
    assert_eq!(outcome, MotionOutcome::Completed);
    assert_eq!(pwm.pulses(RIGHT), vec![pulse(50.0, false), STOP]);
}
