use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Symbolic drive direction carried by a `move` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
}

impl Direction {
    /// Spoken variations accepted for each direction, as sent by the voice
    /// skill slot values.
    pub fn synonyms(self) -> &'static [&'static str] {
        match self {
            Direction::Forward => &["forward", "forwards", "go forward"],
            Direction::Backward => &["back", "backward", "backwards", "go backward"],
            Direction::Left => &["left", "go left"],
            Direction::Right => &["right", "go right"],
            Direction::Stop => &["stop", "brake", "halt"],
        }
    }

    pub const ALL: [Direction; 5] = [
        Direction::Forward,
        Direction::Backward,
        Direction::Left,
        Direction::Right,
        Direction::Stop,
    ];
}

impl FromStr for Direction {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let spoken = s.trim().to_lowercase();
        Direction::ALL
            .into_iter()
            .find(|d| d.synonyms().contains(&spoken.as_str()))
            .ok_or_else(|| FetchError::Decode(format!("unknown direction '{s}'")))
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.synonyms()[0])
    }
}

/// A single symbolic motion request, constructed per call and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionCommand {
    pub direction: Direction,
    pub duration_s: f32,
    /// Wheel speed in percent, `-100..=100`.
    pub speed_pct: i32,
    /// Block the caller until the drive command has run its course.
    pub blocking: bool,
}

impl MotionCommand {
    pub fn new(direction: Direction, duration_s: f32, speed_pct: i32) -> Self {
        Self {
            direction,
            duration_s,
            speed_pct,
            blocking: false,
        }
    }

    pub fn stop() -> Self {
        Self::new(Direction::Stop, 0.0, 0)
    }

    pub fn blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }
}

/// Sensor readings taken at the start of a poll tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    pub distance_cm: f32,
    pub angle_deg: f32,
    pub touch_pressed: bool,
}

/// The robot's primary behavior. At most one non-idle mode is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BehaviorMode {
    #[default]
    Idle,
    /// Driving towards the operator (`come`).
    Approaching,
    /// Carrying the grabbed object away (`take`).
    Retrieving,
    /// Carrying the object back along the outbound leg (`bring`).
    Returning,
}

impl BehaviorMode {
    pub fn is_idle(self) -> bool {
        self == BehaviorMode::Idle
    }
}

impl fmt::Display for BehaviorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BehaviorMode::Idle => "idle",
            BehaviorMode::Approaching => "approaching",
            BehaviorMode::Retrieving => "retrieving",
            BehaviorMode::Returning => "returning",
        };
        f.write_str(name)
    }
}

/// Directive families understood by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectiveKind {
    Move,
    Come,
    Take,
    Bring,
}

/// An inbound control directive: the `type` tag plus its flat parameters.
///
/// Parameters are kept untyped until the dispatcher decodes them so that a
/// missing field surfaces as [`FetchError::Decode`] rather than a transport
/// failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    #[serde(rename = "type")]
    pub kind: DirectiveKind,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl Directive {
    pub fn new(kind: DirectiveKind) -> Self {
        Self {
            kind,
            params: Map::new(),
        }
    }

    pub fn with_param(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// Look up a required parameter.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Decode`] when `name` is absent.
    pub fn require(&self, name: &str) -> Result<&Value, FetchError> {
        self.params
            .get(name)
            .ok_or_else(|| FetchError::Decode(format!("missing parameter '{name}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndicatorSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndicatorColor {
    Black,
    Green,
    Yellow,
    Red,
}

/// Event published on the behavior bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g. `"fetchbot-runtime::poller"`
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    ModeArmed(BehaviorMode),
    ModeCleared(BehaviorMode),
    TurnCompleted { angle_deg: f32 },
    ProximityBreached { mode: BehaviorMode, distance_cm: f32 },
    DirectiveRejected { reason: String },
    Fault { component: String, message: String },
}

/// Workspace-wide error type.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FetchError {
    #[error("Directive decode error: {0}")]
    Decode(String),

    #[error("Sensor read failure on {sensor}: {details}")]
    SensorRead { sensor: String, details: String },

    #[error("Cannot arm {requested}: {active} is still active (turning: {turning})")]
    ConflictingModeArm {
        requested: BehaviorMode,
        active: BehaviorMode,
        turning: bool,
    },

    #[error("Actuator fault on {component}: {details}")]
    ActuatorFault { component: String, details: String },

    #[error("Robot halted after a hard fault; directives are ignored")]
    Halted,
}

impl FetchError {
    /// `true` for faults that must stop behavior execution.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FetchError::SensorRead { .. } | FetchError::ActuatorFault { .. }
        )
    }
}
