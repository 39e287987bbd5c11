//! In-process robot for tests and headless runs.
//!
//! [`SimRobot`] implements both [`Actuators`] and [`Sensors`].  Actuator calls
//! are recorded (never executed, never blocking); sensor reads pop from
//! scripted queues and fall back to a resting value once a queue is drained.
//!
//! [`SimRobot::headless`] is the long-running variant for the operator
//! console: it keeps no call log and a gripper pulse takes
//! [`HEADLESS_PULSE_TIME`], like the real motor, so a wait-for-touch loop
//! does not spin.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use fetchbot_hal::{Hardware, SimRobot};
//!
//! let sim = Arc::new(SimRobot::new());
//! sim.push_distances([80.0, 55.0]);
//! let hw = Hardware::new(sim.clone(), sim.clone());
//!
//! assert_eq!(hw.snapshot().unwrap().distance_cm, 80.0);
//! assert_eq!(hw.snapshot().unwrap().distance_cm, 55.0);
//! assert_eq!(hw.snapshot().unwrap().distance_cm, 100.0); // resting value
//! ```

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use fetchbot_types::{FetchError, IndicatorColor, IndicatorSide};
use tracing::debug;

use crate::actuator::{ActuatorCall, Actuators, GripperTravel};
use crate::sensor::{AngleMode, Sensors};

/// Infrared proximity reports at most 100 (out of range).
const RESTING_DISTANCE_CM: f32 = 100.0;

/// How long one gripper pulse takes on a [`SimRobot::headless`] robot.
pub const HEADLESS_PULSE_TIME: Duration = Duration::from_millis(250);

struct SimState {
    calls: Vec<ActuatorCall>,
    distances: VecDeque<f32>,
    angles: VecDeque<f32>,
    touches: VecDeque<bool>,
    resting_distance: f32,
    resting_angle: f32,
    resting_touch: bool,
    angle_resets: usize,
    angle_mode: AngleMode,
    sensor_fault: Option<String>,
    actuator_fault: Option<String>,
    keep_log: bool,
    pulse_time: Duration,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            distances: VecDeque::new(),
            angles: VecDeque::new(),
            touches: VecDeque::new(),
            resting_distance: RESTING_DISTANCE_CM,
            resting_angle: 0.0,
            // Pressed by default so wait-for-touch loops terminate.
            resting_touch: true,
            angle_resets: 0,
            angle_mode: AngleMode::default(),
            sensor_fault: None,
            actuator_fault: None,
            keep_log: true,
            pulse_time: Duration::ZERO,
        }
    }
}

/// Simulated robot with scripted sensors and a recorded actuator log.
#[derive(Default)]
pub struct SimRobot {
    state: Mutex<SimState>,
}

impl SimRobot {
    pub fn new() -> Self {
        Self::default()
    }

    /// A robot for long unattended runs: calls are only traced, never
    /// logged, and gripper pulses take [`HEADLESS_PULSE_TIME`].
    pub fn headless() -> Self {
        let sim = Self::default();
        {
            let mut state = sim.state();
            state.keep_log = false;
            state.pulse_time = HEADLESS_PULSE_TIME;
        }
        sim
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        // A panicking test thread must not hide the log from the others.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue distance readings, consumed one per read.
    pub fn push_distances(&self, readings: impl IntoIterator<Item = f32>) {
        self.state().distances.extend(readings);
    }

    pub fn push_angles(&self, readings: impl IntoIterator<Item = f32>) {
        self.state().angles.extend(readings);
    }

    pub fn push_touches(&self, readings: impl IntoIterator<Item = bool>) {
        self.state().touches.extend(readings);
    }

    /// Set the distance reported once the queue is empty.
    pub fn set_distance(&self, cm: f32) {
        self.state().resting_distance = cm;
    }

    pub fn set_angle(&self, deg: f32) {
        self.state().resting_angle = deg;
    }

    pub fn set_touch(&self, pressed: bool) {
        self.state().resting_touch = pressed;
    }

    /// Make every sensor read fail with `details` (or recover with `None`).
    pub fn inject_sensor_fault(&self, details: Option<&str>) {
        self.state().sensor_fault = details.map(str::to_string);
    }

    /// Make every actuator call fail with `details` (or recover with `None`).
    pub fn inject_actuator_fault(&self, details: Option<&str>) {
        self.state().actuator_fault = details.map(str::to_string);
    }

    /// All actuator calls recorded so far.  Always empty on a headless
    /// robot.
    pub fn calls(&self) -> Vec<ActuatorCall> {
        self.state().calls.clone()
    }

    /// Drain the recorded calls.
    pub fn take_calls(&self) -> Vec<ActuatorCall> {
        std::mem::take(&mut self.state().calls)
    }

    pub fn angle_resets(&self) -> usize {
        self.state().angle_resets
    }

    pub fn angle_mode(&self) -> AngleMode {
        self.state().angle_mode
    }

    fn record(&self, component: &str, call: ActuatorCall) -> Result<(), FetchError> {
        let mut state = self.state();
        if let Some(details) = &state.actuator_fault {
            return Err(FetchError::ActuatorFault {
                component: component.to_string(),
                details: details.clone(),
            });
        }
        debug!(?call, "sim actuator");
        if state.keep_log {
            state.calls.push(call);
        }
        Ok(())
    }

    fn check_sensor(state: &SimState, sensor: &str) -> Result<(), FetchError> {
        match &state.sensor_fault {
            Some(details) => Err(FetchError::SensorRead {
                sensor: sensor.to_string(),
                details: details.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl Actuators for SimRobot {
    fn drive(
        &self,
        left_pct: i32,
        right_pct: i32,
        duration_s: f32,
        blocking: bool,
    ) -> Result<(), FetchError> {
        self.record(
            "drive",
            ActuatorCall::Drive {
                left_pct,
                right_pct,
                duration_s,
                blocking,
            },
        )
    }

    fn drive_stop(&self) -> Result<(), FetchError> {
        self.record("drive", ActuatorCall::DriveStop)
    }

    fn gripper_pulse(&self, speed_pct: i32, travel: GripperTravel) -> Result<(), FetchError> {
        self.record("gripper", ActuatorCall::GripperPulse { speed_pct, travel })?;
        let pulse_time = self.state().pulse_time;
        if !pulse_time.is_zero() {
            thread::sleep(pulse_time);
        }
        Ok(())
    }

    fn set_indicator(
        &self,
        side: IndicatorSide,
        color: IndicatorColor,
        group: Option<u8>,
    ) -> Result<(), FetchError> {
        self.record("leds", ActuatorCall::SetIndicator { side, color, group })
    }

    fn play_startup_sound(&self) -> Result<(), FetchError> {
        self.record("sound", ActuatorCall::StartupSound)
    }

    fn play_shutdown_sound(&self) -> Result<(), FetchError> {
        self.record("sound", ActuatorCall::ShutdownSound)
    }
}

impl Sensors for SimRobot {
    fn read_distance_cm(&self) -> Result<f32, FetchError> {
        let mut state = self.state();
        Self::check_sensor(&state, "infrared")?;
        let resting = state.resting_distance;
        Ok(state.distances.pop_front().unwrap_or(resting))
    }

    fn read_angle_deg(&self) -> Result<f32, FetchError> {
        let mut state = self.state();
        Self::check_sensor(&state, "gyro")?;
        let resting = state.resting_angle;
        Ok(state.angles.pop_front().unwrap_or(resting))
    }

    fn reset_angle(&self) -> Result<(), FetchError> {
        let mut state = self.state();
        Self::check_sensor(&state, "gyro")?;
        state.resting_angle = 0.0;
        state.angle_resets += 1;
        Ok(())
    }

    fn set_angle_mode(&self, mode: AngleMode) -> Result<(), FetchError> {
        let mut state = self.state();
        Self::check_sensor(&state, "gyro")?;
        state.angle_mode = mode;
        Ok(())
    }

    fn is_touch_pressed(&self) -> Result<bool, FetchError> {
        let mut state = self.state();
        Self::check_sensor(&state, "touch")?;
        let resting = state.resting_touch;
        Ok(state.touches.pop_front().unwrap_or(resting))
    }
}
