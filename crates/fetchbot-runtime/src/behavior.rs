//! [`BehaviorMachine`] – the poll-driven half of every fetch behavior.
//!
//! The dispatcher arms a mode and starts the robot moving; this machine,
//! ticked with a fresh [`SensorSnapshot`] by the poll loop, watches for the
//! moment the behavior has to react and runs the completion sequence:
//!
//! | State | Trigger | Sequence |
//! |---|---|---|
//! | turning | `\|angle\| ≥ 179°` | stop, zero heading, clear turn, green |
//! | `Approaching` | `distance ≤ 55 cm` | stop, red, lower gripper until touched, clear, green |
//! | `Retrieving` | `distance ≤ 55 cm` | stop, red, wait for touch, back off 1 s, half turn, clear into turn, green |
//! | `Returning` | `distance ≤ 55 cm` | stop, red, wait for touch, reverse for the leg time minus 0.5 s, clear, green |
//!
//! A tick that sees a turn in progress never looks at distance, and a mode's
//! threshold only applies once its outbound leg is engaged.

use std::sync::Arc;
use std::time::Duration;

use fetchbot_hal::{GripperTravel, Hardware};
use fetchbot_kernel::{BehaviorState, Clock, ModeClear};
use fetchbot_middleware::EventBus;
use fetchbot_types::{
    BehaviorMode, Event, EventPayload, FetchError, IndicatorColor, SensorSnapshot,
};
use tracing::{debug, info, warn};

use crate::config::BehaviorConfig;
use crate::motion::half_turn;

const SOURCE: &str = "fetchbot-runtime::behavior";

const GRIPPER_LOWER_SPEED_PCT: i32 = 10;
const GRIPPER_LOWER_STEP_DEG: f32 = -90.0;
const BACK_OFF_SPEED_PCT: i32 = -50;
const BACK_OFF_S: f32 = 1.0;

/// What a single tick observed or did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing armed.
    Idle,
    /// A mode is armed but its threshold has not been reached (or its leg
    /// has not started yet).
    Cruising,
    /// A turn is still short of the half turn.
    Turning,
    TurnCompleted,
    /// The mode's completion sequence ran and the mode was cleared.
    Completed(BehaviorMode),
}

pub struct BehaviorMachine {
    hw: Hardware,
    modes: ModeClear,
    clock: Arc<dyn Clock>,
    config: BehaviorConfig,
    bus: EventBus,
}

impl BehaviorMachine {
    pub fn new(
        hw: Hardware,
        modes: ModeClear,
        clock: Arc<dyn Clock>,
        config: BehaviorConfig,
        bus: EventBus,
    ) -> Self {
        Self {
            hw,
            modes,
            clock,
            config,
            bus,
        }
    }

    pub fn modes(&self) -> &ModeClear {
        &self.modes
    }

    pub fn hardware(&self) -> &Hardware {
        &self.hw
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn config(&self) -> &BehaviorConfig {
        &self.config
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Advance the machine by one poll tick.
    ///
    /// # Errors
    ///
    /// Any sensor or actuator failure during a completion sequence.  The
    /// caller treats these as fatal.
    pub fn tick(&self, snapshot: SensorSnapshot) -> Result<TickOutcome, FetchError> {
        let state = self.modes.snapshot();
        if state.halted {
            return Ok(TickOutcome::Idle);
        }

        if state.turn_in_progress {
            if snapshot.angle_deg.abs() < self.config.turn_complete_deg {
                self.hw.indicate_phase(IndicatorColor::Yellow)?;
                return Ok(TickOutcome::Turning);
            }
            return self.finish_turn(snapshot.angle_deg);
        }

        if state.mode.is_idle() {
            return Ok(TickOutcome::Idle);
        }
        if !state.is_engaged() || snapshot.distance_cm > self.config.proximity_threshold_cm {
            return Ok(TickOutcome::Cruising);
        }

        info!(
            mode = %state.mode,
            distance_cm = snapshot.distance_cm,
            "proximity threshold reached"
        );
        self.publish(EventPayload::ProximityBreached {
            mode: state.mode,
            distance_cm: snapshot.distance_cm,
        });
        match state.mode {
            BehaviorMode::Approaching => self.complete_approach()?,
            BehaviorMode::Retrieving => self.complete_retrieve()?,
            BehaviorMode::Returning => self.complete_return(&state)?,
            BehaviorMode::Idle => return Ok(TickOutcome::Idle),
        }
        Ok(TickOutcome::Completed(state.mode))
    }

    fn finish_turn(&self, angle_deg: f32) -> Result<TickOutcome, FetchError> {
        self.hw.actuators().drive_stop()?;
        self.hw.zero_heading()?;
        self.modes.complete_turn();
        self.hw.indicate_phase(IndicatorColor::Green)?;
        debug!(angle_deg, "turn completed");
        self.publish(EventPayload::TurnCompleted { angle_deg });
        Ok(TickOutcome::TurnCompleted)
    }

    /// Stop and hold until someone confirms the hand-over on the touch
    /// sensor.
    fn halt_for_touch(&self) -> Result<(), FetchError> {
        self.hw.actuators().drive_stop()?;
        self.hw.indicate_phase(IndicatorColor::Red)?;
        self.wait_for_touch()
    }

    /// Lower the gripper step by step until the touch sensor is pressed.
    /// Blocks the poll loop.
    fn wait_for_touch(&self) -> Result<(), FetchError> {
        let mut steps = 0usize;
        while !self.hw.sensors().is_touch_pressed()? {
            self.hw.actuators().gripper_pulse(
                GRIPPER_LOWER_SPEED_PCT,
                GripperTravel::Degrees(GRIPPER_LOWER_STEP_DEG),
            )?;
            steps += 1;
        }
        debug!(steps, "touch confirmed");
        Ok(())
    }

    fn complete_approach(&self) -> Result<(), FetchError> {
        self.halt_for_touch()?;
        self.finish_mode(BehaviorMode::Approaching, false)
    }

    fn complete_retrieve(&self) -> Result<(), FetchError> {
        self.halt_for_touch()?;
        self.hw.actuators().drive(
            BACK_OFF_SPEED_PCT,
            BACK_OFF_SPEED_PCT,
            BACK_OFF_S,
            true,
        )?;
        half_turn(&self.hw, false)?;
        self.finish_mode(BehaviorMode::Retrieving, true)
    }

    fn complete_return(&self, state: &BehaviorState) -> Result<(), FetchError> {
        let leg = state
            .leg_started_at
            .map(|start| self.clock.now().saturating_sub(start))
            .unwrap_or(Duration::ZERO);
        let reverse_s = (leg.as_secs_f32() - self.config.return_margin_s).max(0.0);
        info!(leg_s = leg.as_secs_f32(), reverse_s, "returning along outbound leg");

        self.halt_for_touch()?;
        let speed = self.config.cruise_speed_pct;
        self.hw.actuators().drive(-speed, -speed, reverse_s, true)?;
        self.finish_mode(BehaviorMode::Returning, false)
    }

    fn finish_mode(&self, mode: BehaviorMode, into_turn: bool) -> Result<(), FetchError> {
        let cleared = if into_turn {
            self.modes.clear_into_turn(mode)
        } else {
            self.modes.clear(mode)
        };
        if cleared.is_none() {
            warn!(%mode, "mode was no longer active at completion");
        }
        self.hw.indicate_phase(IndicatorColor::Green)?;
        self.publish(EventPayload::ModeCleared(mode));
        Ok(())
    }

    fn publish(&self, payload: EventPayload) {
        self.bus.publish(Event::new(SOURCE, payload));
    }
}
