//! [`Actuators`] trait for the drive base, gripper, indicators and speaker.
//!
//! Methods take `&self`: the dispatcher may be parked inside a blocking
//! `drive` while the poll loop issues `drive_stop` on the same hardware, so
//! drivers are expected to use interior mutability.

use fetchbot_types::{FetchError, IndicatorColor, IndicatorSide};

/// How far a gripper pulse should travel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GripperTravel {
    Rotations(f32),
    /// Signed; negative lowers the gripper.
    Degrees(f32),
}

/// Output side of the robot.
pub trait Actuators: Send + Sync {
    /// Run both drive wheels for `duration_s` seconds.
    ///
    /// A blocking call returns once the duration has elapsed *or* once
    /// [`drive_stop`][Self::drive_stop] is issued from another context.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ActuatorFault`] if the motors reject the command.
    fn drive(
        &self,
        left_pct: i32,
        right_pct: i32,
        duration_s: f32,
        blocking: bool,
    ) -> Result<(), FetchError>;

    /// Zero both wheel speeds immediately.
    fn drive_stop(&self) -> Result<(), FetchError>;

    /// Move the gripper motor; always runs to completion.
    fn gripper_pulse(&self, speed_pct: i32, travel: GripperTravel) -> Result<(), FetchError>;

    fn set_indicator(
        &self,
        side: IndicatorSide,
        color: IndicatorColor,
        group: Option<u8>,
    ) -> Result<(), FetchError>;

    fn play_startup_sound(&self) -> Result<(), FetchError>;

    fn play_shutdown_sound(&self) -> Result<(), FetchError>;
}

/// A single actuator invocation, as planned by the motion translator or
/// recorded by the simulator.
#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorCall {
    Drive {
        left_pct: i32,
        right_pct: i32,
        duration_s: f32,
        blocking: bool,
    },
    DriveStop,
    GripperPulse {
        speed_pct: i32,
        travel: GripperTravel,
    },
    SetIndicator {
        side: IndicatorSide,
        color: IndicatorColor,
        group: Option<u8>,
    },
    StartupSound,
    ShutdownSound,
}

impl ActuatorCall {
    /// Issue this call against `actuators`.
    pub fn apply(&self, actuators: &dyn Actuators) -> Result<(), FetchError> {
        match *self {
            ActuatorCall::Drive {
                left_pct,
                right_pct,
                duration_s,
                blocking,
            } => actuators.drive(left_pct, right_pct, duration_s, blocking),
            ActuatorCall::DriveStop => actuators.drive_stop(),
            ActuatorCall::GripperPulse { speed_pct, travel } => {
                actuators.gripper_pulse(speed_pct, travel)
            }
            ActuatorCall::SetIndicator { side, color, group } => {
                actuators.set_indicator(side, color, group)
            }
            ActuatorCall::StartupSound => actuators.play_startup_sound(),
            ActuatorCall::ShutdownSound => actuators.play_shutdown_sound(),
        }
    }
}
