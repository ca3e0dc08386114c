// Define motion request types for the drive core

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::motor::DriveError;

/// Which way a turn bends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnDirection {
    Left,
    Right,
}

impl FromStr for TurnDirection {
    type Err = DriveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(TurnDirection::Left),
            "right" => Ok(TurnDirection::Right),
            other => Err(DriveError::Validation(format!(
                "direction must be 'left' or 'right', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for TurnDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnDirection::Left => f.write_str("left"),
            TurnDirection::Right => f.write_str("right"),
        }
    }
}

/// How far a straight move goes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveExtent {
    /// Seconds
    Duration(f64),
    /// Centimetres; the duration is derived from the calibration
    Distance(f64),
}

/// How far a turn goes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TurnExtent {
    /// Seconds
    Duration(f64),
    /// Degrees; the duration is derived from the calibration
    Angle(f64),
}

/// Straight move: both tracks driven at their own speed for a bounded extent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MotionMessage", into = "MotionMessage")]
pub struct MotionRequest {
    pub left_speed: f64,
    pub right_speed: f64,
    pub extent: MoveExtent,
    /// Ramp rate in %/s; `None` jumps straight to the target speeds
    pub accel: Option<f64>,
    /// Ramp step; `None` uses the default step, capped at the duration
    pub accel_interval_s: Option<f64>,
    pub stop_at_end: bool,
}

impl MotionRequest {
    pub fn new(left_speed: f64, right_speed: f64, extent: MoveExtent) -> Self {
        Self {
            left_speed,
            right_speed,
            extent,
            accel: None,
            accel_interval_s: None,
            stop_at_end: true,
        }
    }

    pub fn for_duration(left_speed: f64, right_speed: f64, duration_s: f64) -> Self {
        Self::new(left_speed, right_speed, MoveExtent::Duration(duration_s))
    }

    pub fn for_distance(left_speed: f64, right_speed: f64, distance_cm: f64) -> Self {
        Self::new(left_speed, right_speed, MoveExtent::Distance(distance_cm))
    }

    /// Build from the optional-field form, where exactly one extent must be set
    pub fn from_parts(
        left_speed: f64,
        right_speed: f64,
        duration_s: Option<f64>,
        distance_cm: Option<f64>,
    ) -> Result<Self, DriveError> {
        let extent = match (duration_s, distance_cm) {
            (Some(d), None) => MoveExtent::Duration(d),
            (None, Some(cm)) => MoveExtent::Distance(cm),
            (Some(_), Some(_)) => {
                return Err(DriveError::RequestShape(
                    "give either duration or distance, not both".into(),
                ));
            }
            (None, None) => {
                return Err(DriveError::RequestShape(
                    "exactly one of duration or distance is required".into(),
                ));
            }
        };
        Ok(Self::new(left_speed, right_speed, extent))
    }

    pub fn with_accel(mut self, accel: f64) -> Self {
        self.accel = Some(accel);
        self
    }

    pub fn with_accel_interval(mut self, interval_s: f64) -> Self {
        self.accel_interval_s = Some(interval_s);
        self
    }

    pub fn with_stop_at_end(mut self, stop_at_end: bool) -> Self {
        self.stop_at_end = stop_at_end;
        self
    }
}

/// Turn on the spot (`radius_cm == 0`) or along an arc
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TurnMessage", into = "TurnMessage")]
pub struct TurnRequest {
    pub speed: f64,
    pub radius_cm: f64,
    pub direction: TurnDirection,
    pub extent: TurnExtent,
    pub accel: Option<f64>,
    pub accel_interval_s: Option<f64>,
    pub stop_at_end: bool,
}

impl TurnRequest {
    pub fn new(speed: f64, radius_cm: f64, direction: TurnDirection, extent: TurnExtent) -> Self {
        Self {
            speed,
            radius_cm,
            direction,
            extent,
            accel: None,
            accel_interval_s: None,
            stop_at_end: true,
        }
    }

    pub fn for_duration(speed: f64, radius_cm: f64, direction: TurnDirection, duration_s: f64) -> Self {
        Self::new(speed, radius_cm, direction, TurnExtent::Duration(duration_s))
    }

    pub fn for_angle(speed: f64, radius_cm: f64, direction: TurnDirection, angle_deg: f64) -> Self {
        Self::new(speed, radius_cm, direction, TurnExtent::Angle(angle_deg))
    }

    /// Build from the optional-field form, where exactly one extent must be set
    pub fn from_parts(
        speed: f64,
        radius_cm: f64,
        direction: TurnDirection,
        duration_s: Option<f64>,
        angle_deg: Option<f64>,
    ) -> Result<Self, DriveError> {
        let extent = match (duration_s, angle_deg) {
            (Some(d), None) => TurnExtent::Duration(d),
            (None, Some(deg)) => TurnExtent::Angle(deg),
            (Some(_), Some(_)) => {
                return Err(DriveError::RequestShape(
                    "give either duration or angle, not both".into(),
                ));
            }
            (None, None) => {
                return Err(DriveError::RequestShape(
                    "exactly one of duration or angle is required".into(),
                ));
            }
        };
        Ok(Self::new(speed, radius_cm, direction, extent))
    }

    pub fn with_accel(mut self, accel: f64) -> Self {
        self.accel = Some(accel);
        self
    }

    pub fn with_accel_interval(mut self, interval_s: f64) -> Self {
        self.accel_interval_s = Some(interval_s);
        self
    }

    pub fn with_stop_at_end(mut self, stop_at_end: bool) -> Self {
        self.stop_at_end = stop_at_end;
        self
    }
}

// Wire form of a move: flat JSON with optional extents
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MotionMessage {
    left_speed: f64,
    right_speed: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration_s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    distance_cm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    accel: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    accel_interval_s: Option<f64>,
    #[serde(default = "default_stop_at_end")]
    stop_at_end: bool,
}

// Wire form of a turn
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TurnMessage {
    speed: f64,
    radius_cm: f64,
    direction: TurnDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    duration_s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    angle_deg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    accel: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    accel_interval_s: Option<f64>,
    #[serde(default = "default_stop_at_end")]
    stop_at_end: bool,
}

fn default_stop_at_end() -> bool {
    true
}

impl TryFrom<MotionMessage> for MotionRequest {
    type Error = DriveError;

    fn try_from(msg: MotionMessage) -> Result<Self, DriveError> {
        let mut req =
            MotionRequest::from_parts(msg.left_speed, msg.right_speed, msg.duration_s, msg.distance_cm)?
                .with_stop_at_end(msg.stop_at_end);
        req.accel = msg.accel;
        req.accel_interval_s = msg.accel_interval_s;
        Ok(req)
    }
}

impl From<MotionRequest> for MotionMessage {
    fn from(req: MotionRequest) -> Self {
        let (duration_s, distance_cm) = match req.extent {
            MoveExtent::Duration(d) => (Some(d), None),
            MoveExtent::Distance(cm) => (None, Some(cm)),
        };
        Self {
            left_speed: req.left_speed,
            right_speed: req.right_speed,
            duration_s,
            distance_cm,
            accel: req.accel,
            accel_interval_s: req.accel_interval_s,
            stop_at_end: req.stop_at_end,
        }
    }
}

impl TryFrom<TurnMessage> for TurnRequest {
    type Error = DriveError;

    fn try_from(msg: TurnMessage) -> Result<Self, DriveError> {
        let mut req = TurnRequest::from_parts(
            msg.speed,
            msg.radius_cm,
            msg.direction,
            msg.duration_s,
            msg.angle_deg,
        )?
        .with_stop_at_end(msg.stop_at_end);
        req.accel = msg.accel;
        req.accel_interval_s = msg.accel_interval_s;
        Ok(req)
    }
}

impl From<TurnRequest> for TurnMessage {
    fn from(req: TurnRequest) -> Self {
        let (duration_s, angle_deg) = match req.extent {
            TurnExtent::Duration(d) => (Some(d), None),
            TurnExtent::Angle(deg) => (None, Some(deg)),
        };
        Self {
            speed: req.speed,
            radius_cm: req.radius_cm,
            direction: req.direction,
            duration_s,
            angle_deg,
            accel: req.accel,
            accel_interval_s: req.accel_interval_s,
            stop_at_end: req.stop_at_end,
        }
    }
}
