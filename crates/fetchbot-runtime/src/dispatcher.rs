//! [`Dispatcher`] – the directive-handling half of every fetch behavior.
//!
//! Directives arrive one at a time from the transport.  `move` goes straight
//! to the [`MotionTranslator`]; `come`, `take` and `bring` arm a
//! [`BehaviorMode`] and start the robot on its outbound leg, leaving the
//! [`SensorPoller`][crate::poller::SensorPoller] to finish the job.
//!
//! The mode is armed before any actuator is touched, so a directive that
//! conflicts with a running behavior has no side effect.  Each half turn is
//! flagged only after the heading is zeroed, so the poll loop never judges a
//! turn against the previous heading.  A fatal fault in any directive halts
//! the robot the same way the poll loop does.

use std::sync::Arc;

use fetchbot_hal::{GripperTravel, Hardware};
use fetchbot_kernel::{Clock, ModeArm, MotionVerifier};
use fetchbot_middleware::{EventBus, decode_payload};
use fetchbot_types::{
    BehaviorMode, Direction, Directive, DirectiveKind, Event, EventPayload, FetchError,
    IndicatorColor, MotionCommand,
};
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::config::BehaviorConfig;
use crate::motion::{MotionTranslator, pivot_round};

const SOURCE: &str = "fetchbot-runtime::dispatcher";

const MAX_SPEED_PCT: f64 = 100.0;
const GRIP_CLOSE_SPEED_PCT: i32 = 100;
const GRIP_CLOSE_ROTATIONS: f32 = 1.0;
/// Short hop between the two turns of `bring`.
const BRING_HOP_S: f32 = 1.5;

/// A decoded, typed directive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Move(MotionCommand),
    Come,
    Take,
    Bring,
}

impl Command {
    /// Decode the parameters of `directive`.
    ///
    /// `move` needs `direction` (any spoken synonym), `duration` and `speed`,
    /// each given as a JSON number or a numeric string; `blocking` is
    /// optional.  `stop` may omit duration and speed.  Fractional speeds are
    /// truncated; speeds beyond ±100 are rejected.
    pub fn decode(directive: &Directive) -> Result<Self, FetchError> {
        match directive.kind {
            DirectiveKind::Come => Ok(Command::Come),
            DirectiveKind::Take => Ok(Command::Take),
            DirectiveKind::Bring => Ok(Command::Bring),
            DirectiveKind::Move => {
                let direction: Direction = match directive.require("direction")? {
                    Value::String(s) => s.parse()?,
                    other => {
                        return Err(FetchError::Decode(format!(
                            "direction must be a string, got {other}"
                        )));
                    }
                };
                let stop = direction == Direction::Stop;
                let duration_s = optional_number(directive, "duration", stop)?.unwrap_or(0.0);
                let speed = optional_number(directive, "speed", stop)?.unwrap_or(0.0);
                if speed.abs() > MAX_SPEED_PCT {
                    return Err(FetchError::Decode(format!(
                        "speed {speed} outside ±{MAX_SPEED_PCT}%"
                    )));
                }
                let blocking = match directive.params.get("blocking") {
                    None | Some(Value::Null) => false,
                    Some(Value::Bool(b)) => *b,
                    Some(other) => {
                        return Err(FetchError::Decode(format!(
                            "blocking must be a boolean, got {other}"
                        )));
                    }
                };
                Ok(Command::Move(
                    MotionCommand::new(direction, duration_s as f32, speed.trunc() as i32)
                        .blocking(blocking),
                ))
            }
        }
    }
}

/// A required-unless-`optional` numeric parameter.
fn optional_number(
    directive: &Directive,
    name: &str,
    optional: bool,
) -> Result<Option<f64>, FetchError> {
    let value = match directive.params.get(name) {
        Some(value) => value,
        None if optional => return Ok(None),
        None => return directive.require(name).map(|_| None),
    };
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(n) if n.is_finite() => Ok(Some(n)),
        _ => Err(FetchError::Decode(format!(
            "parameter '{name}' is not a number: {value}"
        ))),
    }
}

/// What an accepted directive did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DispatchOutcome {
    Moved(Direction),
    Armed(BehaviorMode),
}

pub struct Dispatcher {
    hw: Hardware,
    modes: ModeArm,
    motion: MotionTranslator,
    clock: Arc<dyn Clock>,
    config: BehaviorConfig,
    bus: EventBus,
}

impl Dispatcher {
    pub fn new(
        hw: Hardware,
        modes: ModeArm,
        clock: Arc<dyn Clock>,
        config: BehaviorConfig,
        bus: EventBus,
    ) -> Self {
        let motion = MotionTranslator::new(hw.clone(), MotionVerifier::standard());
        Self {
            hw,
            modes,
            motion,
            clock,
            config,
            bus,
        }
    }

    pub fn motion(&self) -> &MotionTranslator {
        &self.motion
    }

    /// Decode and handle one raw transport payload.
    ///
    /// Rejections are logged and published on the alerts topic before being
    /// returned.
    pub fn handle_payload(&self, raw: &[u8]) -> Result<DispatchOutcome, FetchError> {
        let result = decode_payload(raw).and_then(|directive| self.handle(&directive));
        if let Err(e) = &result {
            self.report(e);
        }
        result
    }

    /// Handle one decoded directive.
    #[instrument(skip(self, directive), fields(kind = ?directive.kind))]
    pub fn handle(&self, directive: &Directive) -> Result<DispatchOutcome, FetchError> {
        if self.modes.is_halted() {
            return Err(FetchError::Halted);
        }
        let result = match Command::decode(directive)? {
            Command::Move(command) => {
                info!(
                    direction = %command.direction,
                    duration_s = command.duration_s,
                    speed_pct = command.speed_pct,
                    blocking = command.blocking,
                    "move"
                );
                self.motion
                    .execute(&command)
                    .map(|()| DispatchOutcome::Moved(command.direction))
            }
            Command::Come => self.come(),
            Command::Take => self.take(),
            Command::Bring => self.bring(),
        };
        if let Some(fault) = result.as_ref().err().filter(|e| e.is_fatal()) {
            self.halt(fault);
        }
        result
    }

    /// Drive towards the operator until the poll loop sees them.
    fn come(&self) -> Result<DispatchOutcome, FetchError> {
        self.arm(BehaviorMode::Approaching)?;
        self.hw.indicate_phase(IndicatorColor::Green)?;
        self.outbound(self.config.approach_duration_s, false)?;
        Ok(DispatchOutcome::Armed(BehaviorMode::Approaching))
    }

    /// Grab the object, turn round and carry it away.
    fn take(&self) -> Result<DispatchOutcome, FetchError> {
        self.arm(BehaviorMode::Retrieving)?;
        self.close_gripper()?;
        self.hw.indicate_phase(IndicatorColor::Green)?;
        self.turn_round()?;
        self.outbound(self.config.carry_duration_s, true)?;
        Ok(DispatchOutcome::Armed(BehaviorMode::Retrieving))
    }

    /// Turn round, pick the object up, turn back and carry it home.
    fn bring(&self) -> Result<DispatchOutcome, FetchError> {
        self.arm(BehaviorMode::Returning)?;
        self.turn_round()?;
        self.drive_forward(BRING_HOP_S, true)?;
        self.close_gripper()?;
        self.turn_round()?;
        self.outbound(self.config.carry_duration_s, true)?;
        self.hw.indicate_phase(IndicatorColor::Green)?;
        Ok(DispatchOutcome::Armed(BehaviorMode::Returning))
    }

    fn arm(&self, mode: BehaviorMode) -> Result<(), FetchError> {
        self.modes.arm(mode, false)?;
        info!(%mode, "behavior armed");
        self.publish(EventPayload::ModeArmed(mode));
        Ok(())
    }

    /// Zero the heading, flag the turn for the poll loop, then pivot until
    /// the poll loop stops the drive.
    fn turn_round(&self) -> Result<(), FetchError> {
        self.hw.zero_heading()?;
        self.modes.arm_turn()?;
        pivot_round(&self.hw, true)
    }

    /// Start the leg whose length the poll loop measures.
    fn outbound(&self, duration_s: f32, blocking: bool) -> Result<(), FetchError> {
        self.modes.engage(self.clock.now())?;
        self.drive_forward(duration_s, blocking)
    }

    fn drive_forward(&self, duration_s: f32, blocking: bool) -> Result<(), FetchError> {
        let command = MotionCommand::new(
            Direction::Forward,
            duration_s,
            self.config.cruise_speed_pct,
        )
        .blocking(blocking);
        self.motion.execute(&command)
    }

    fn close_gripper(&self) -> Result<(), FetchError> {
        self.hw.actuators().gripper_pulse(
            GRIP_CLOSE_SPEED_PCT,
            GripperTravel::Rotations(GRIP_CLOSE_ROTATIONS),
        )
    }

    /// Transport link came up.
    pub fn on_connected(&self) -> Result<(), FetchError> {
        info!("operator connected");
        self.hw.indicate(IndicatorColor::Green)
    }

    /// Transport link went away.
    pub fn on_disconnected(&self) -> Result<(), FetchError> {
        info!("operator disconnected");
        self.hw.indicate(IndicatorColor::Black)
    }

    /// Power-on sequence.
    pub fn startup(&self) -> Result<(), FetchError> {
        self.hw.indicate(IndicatorColor::Black)?;
        self.hw.actuators().play_startup_sound()?;
        self.hw.indicate(IndicatorColor::Green)
    }

    /// Power-off sequence.
    pub fn shutdown(&self) -> Result<(), FetchError> {
        self.hw.actuators().play_shutdown_sound()?;
        self.hw.indicate(IndicatorColor::Black)
    }

    /// Stop everything after a fatal fault in one of this dispatcher's own
    /// calls.  The fault itself is published by [`report`][Self::report].
    fn halt(&self, fault: &FetchError) {
        error!(error = %fault, "fatal fault while handling directive, halting behaviors");
        self.modes.halt();
        if let Err(e) = self.hw.actuators().drive_stop() {
            warn!(error = %e, "could not stop drive after fault");
        }
        if let Err(e) = self.hw.indicate_phase(IndicatorColor::Red) {
            warn!(error = %e, "could not show fault indicator");
        }
    }

    fn report(&self, e: &FetchError) {
        if e.is_fatal() {
            error!(error = %e, "directive failed");
            let (component, message) = match e {
                FetchError::SensorRead { sensor, details } => (sensor.clone(), details.clone()),
                FetchError::ActuatorFault { component, details } => {
                    (component.clone(), details.clone())
                }
                other => ("dispatcher".to_string(), other.to_string()),
            };
            self.publish(EventPayload::Fault { component, message });
        } else {
            warn!(error = %e, "directive rejected");
            self.publish(EventPayload::DirectiveRejected {
                reason: e.to_string(),
            });
        }
    }

    fn publish(&self, payload: EventPayload) {
        self.bus.publish(Event::new(SOURCE, payload));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use fetchbot_hal::{ActuatorCall, Actuators, PHASE_INDICATOR_GROUP, SimRobot};
    use fetchbot_kernel::{ManualClock, ModeClear, mode_channel};
    use fetchbot_middleware::Topic;
    use fetchbot_types::IndicatorSide;

    use crate::behavior::{BehaviorMachine, TickOutcome};

    struct Rig {
        sim: Arc<SimRobot>,
        clock: Arc<ManualClock>,
        clear: ModeClear,
        bus: EventBus,
        dispatcher: Dispatcher,
    }

    fn rig() -> Rig {
        let sim = Arc::new(SimRobot::new());
        let hw = Hardware::new(sim.clone(), sim.clone());
        let clock = Arc::new(ManualClock::new());
        let (arm, clear) = mode_channel();
        let bus = EventBus::default();
        let dispatcher = Dispatcher::new(
            hw,
            arm,
            clock.clone(),
            BehaviorConfig::default(),
            bus.clone(),
        );
        Rig {
            sim,
            clock,
            clear,
            bus,
            dispatcher,
        }
    }

    fn drive(left_pct: i32, right_pct: i32, duration_s: f32, blocking: bool) -> ActuatorCall {
        ActuatorCall::Drive {
            left_pct,
            right_pct,
            duration_s,
            blocking,
        }
    }

    fn both(color: IndicatorColor) -> [ActuatorCall; 2] {
        painted(color, None)
    }

    fn phase(color: IndicatorColor) -> [ActuatorCall; 2] {
        painted(color, Some(PHASE_INDICATOR_GROUP))
    }

    fn painted(color: IndicatorColor, group: Option<u8>) -> [ActuatorCall; 2] {
        [IndicatorSide::Left, IndicatorSide::Right].map(|side| ActuatorCall::SetIndicator {
            side,
            color,
            group,
        })
    }

    type Hook = Box<dyn Fn(&ActuatorCall) -> Result<(), FetchError> + Send + Sync>;

    /// Forwards every call to the sim, then runs `hook` on drive and
    /// gripper calls as if it happened while the motor was running.
    struct Hooked {
        sim: Arc<SimRobot>,
        hook: Hook,
    }

    impl Hooked {
        fn forward(&self, call: ActuatorCall) -> Result<(), FetchError> {
            call.apply(self.sim.as_ref())?;
            match call {
                ActuatorCall::Drive { .. } | ActuatorCall::GripperPulse { .. } => (self.hook)(&call),
                _ => Ok(()),
            }
        }
    }

    impl Actuators for Hooked {
        fn drive(&self, left_pct: i32, right_pct: i32, duration_s: f32, blocking: bool) -> Result<(), FetchError> {
            self.forward(ActuatorCall::Drive {
                left_pct,
                right_pct,
                duration_s,
                blocking,
            })
        }
        fn drive_stop(&self) -> Result<(), FetchError> {
            self.forward(ActuatorCall::DriveStop)
        }
        fn gripper_pulse(&self, speed_pct: i32, travel: GripperTravel) -> Result<(), FetchError> {
            self.forward(ActuatorCall::GripperPulse { speed_pct, travel })
        }
        fn set_indicator(&self, side: IndicatorSide, color: IndicatorColor, group: Option<u8>) -> Result<(), FetchError> {
            self.forward(ActuatorCall::SetIndicator { side, color, group })
        }
        fn play_startup_sound(&self) -> Result<(), FetchError> {
            self.forward(ActuatorCall::StartupSound)
        }
        fn play_shutdown_sound(&self) -> Result<(), FetchError> {
            self.forward(ActuatorCall::ShutdownSound)
        }
    }

    /// A dispatcher whose drive and gripper calls each let the poll loop
    /// tick once, after `before_tick` has adjusted the sim.
    struct Interleaved {
        sim: Arc<SimRobot>,
        machine: Arc<BehaviorMachine>,
        outcomes: Arc<Mutex<Vec<TickOutcome>>>,
        dispatcher: Dispatcher,
    }

    fn interleaved(before_tick: fn(&SimRobot, &ActuatorCall)) -> Interleaved {
        let sim = Arc::new(SimRobot::new());
        let clock = Arc::new(ManualClock::new());
        let (arm, clear) = mode_channel();
        let bus = EventBus::default();
        let machine = Arc::new(BehaviorMachine::new(
            Hardware::new(sim.clone(), sim.clone()),
            clear,
            clock.clone(),
            BehaviorConfig::default(),
            bus.clone(),
        ));
        let outcomes = Arc::new(Mutex::new(Vec::new()));
        let hook: Hook = {
            let (sim, machine, outcomes) = (sim.clone(), machine.clone(), outcomes.clone());
            Box::new(move |call: &ActuatorCall| {
                before_tick(&sim, call);
                let outcome = machine.tick(machine.hardware().snapshot()?)?;
                outcomes.lock().unwrap().push(outcome);
                Ok(())
            })
        };
        let hooked = Arc::new(Hooked {
            sim: sim.clone(),
            hook,
        });
        let dispatcher = Dispatcher::new(
            Hardware::new(hooked, sim.clone()),
            arm,
            clock,
            BehaviorConfig::default(),
            bus,
        );
        Interleaved {
            sim,
            machine,
            outcomes,
            dispatcher,
        }
    }

    fn grip_close() -> ActuatorCall {
        ActuatorCall::GripperPulse {
            speed_pct: 100,
            travel: GripperTravel::Rotations(1.0),
        }
    }

    fn half_turn_calls() -> [ActuatorCall; 2] {
        [drive(100, -100, 1.3, true), drive(4, -4, 40.0, true)]
    }

    #[test]
    fn decodes_numeric_strings_and_synonyms() {
        let directive = Directive::new(DirectiveKind::Move)
            .with_param("direction", "go backward")
            .with_param("duration", "2")
            .with_param("speed", "50");
        assert_eq!(
            Command::decode(&directive).unwrap(),
            Command::Move(MotionCommand::new(Direction::Backward, 2.0, 50))
        );
    }

    #[test]
    fn decodes_json_numbers_and_blocking_flag() {
        let directive = Directive::new(DirectiveKind::Move)
            .with_param("direction", "left")
            .with_param("duration", 1.5)
            .with_param("speed", 42.9)
            .with_param("blocking", true);
        assert_eq!(
            Command::decode(&directive).unwrap(),
            Command::Move(MotionCommand::new(Direction::Left, 1.5, 42).blocking(true))
        );
    }

    #[test]
    fn stop_needs_no_duration_or_speed() {
        let directive = Directive::new(DirectiveKind::Move).with_param("direction", "brake");
        assert_eq!(
            Command::decode(&directive).unwrap(),
            Command::Move(MotionCommand::stop())
        );
    }

    #[test]
    fn malformed_move_is_a_decode_error() {
        let cases = [
            Directive::new(DirectiveKind::Move)
                .with_param("direction", "forward")
                .with_param("duration", "2"),
            Directive::new(DirectiveKind::Move)
                .with_param("direction", "sideways")
                .with_param("duration", 2)
                .with_param("speed", 50),
            Directive::new(DirectiveKind::Move)
                .with_param("direction", "forward")
                .with_param("duration", "soon")
                .with_param("speed", 50),
            Directive::new(DirectiveKind::Move)
                .with_param("direction", 3)
                .with_param("duration", 2)
                .with_param("speed", 50),
            Directive::new(DirectiveKind::Move)
                .with_param("direction", "forward")
                .with_param("duration", 2)
                .with_param("speed", 50)
                .with_param("blocking", "yes"),
        ];
        for directive in cases {
            assert!(
                matches!(Command::decode(&directive), Err(FetchError::Decode(_))),
                "{directive:?}"
            );
        }
    }

    #[test]
    fn move_sequences_for_every_direction() {
        let cases = [
            (r#"{"type":"move","direction":"forward","duration":"2","speed":"50"}"#, vec![drive(50, 50, 2.0, false)]),
            (r#"{"type":"move","direction":"backward","duration":2,"speed":50}"#, vec![drive(-50, -50, 2.0, false)]),
            (r#"{"type":"move","direction":"left","duration":3,"speed":40}"#, vec![drive(0, 40, 2.0, true), drive(40, 40, 3.0, false)]),
            (r#"{"type":"move","direction":"right","duration":3,"speed":40}"#, vec![drive(40, 0, 2.0, true), drive(40, 40, 3.0, false)]),
            (r#"{"type":"move","direction":"stop","duration":0,"speed":0}"#, vec![ActuatorCall::DriveStop]),
        ];
        for (payload, expected) in cases {
            let r = rig();
            r.dispatcher.handle_payload(payload.as_bytes()).unwrap();
            assert_eq!(r.sim.calls(), expected, "{payload}");
            assert_eq!(r.clear.snapshot().mode, BehaviorMode::Idle);
        }
    }

    #[test]
    fn missing_parameter_has_no_side_effect() {
        let r = rig();
        let mut alerts = r.bus.subscribe_to(Topic::Alerts);
        let err = r
            .dispatcher
            .handle_payload(br#"{"type":"move","direction":"forward","speed":50}"#)
            .unwrap_err();
        assert!(matches!(err, FetchError::Decode(msg) if msg.contains("duration")));
        assert!(r.sim.calls().is_empty());
        assert!(matches!(
            alerts.drain()[0].payload,
            EventPayload::DirectiveRejected { .. }
        ));
    }

    #[test]
    fn come_arms_approach_and_drives_out() {
        let r = rig();
        r.clock.advance(Duration::from_secs(7));
        assert_eq!(
            r.dispatcher.handle_payload(br#"{"type":"come"}"#).unwrap(),
            DispatchOutcome::Armed(BehaviorMode::Approaching)
        );
        let mut expected = phase(IndicatorColor::Green).to_vec();
        expected.push(drive(50, 50, 10.0, false));
        assert_eq!(r.sim.calls(), expected);

        let state = r.clear.snapshot();
        assert_eq!(state.mode, BehaviorMode::Approaching);
        assert!(!state.turn_in_progress);
        assert_eq!(state.leg_started_at, Some(Duration::from_secs(7)));
    }

    #[test]
    fn take_grabs_turns_and_carries() {
        let r = rig();
        r.dispatcher.handle_payload(br#"{"type":"take"}"#).unwrap();

        let mut expected = vec![grip_close()];
        expected.extend(phase(IndicatorColor::Green));
        expected.extend(half_turn_calls());
        expected.push(drive(50, 50, 20.0, true));
        assert_eq!(r.sim.calls(), expected);
        assert_eq!(r.sim.angle_resets(), 1);

        let state = r.clear.snapshot();
        assert_eq!(state.mode, BehaviorMode::Retrieving);
        assert!(state.turn_in_progress, "poll loop has not seen the half turn yet");
        assert!(state.leg_started_at.is_some());
    }

    #[test]
    fn bring_turns_twice_and_records_leg_start() {
        let r = rig();
        r.clock.advance(Duration::from_secs(3));
        r.dispatcher.handle_payload(br#"{"type":"bring"}"#).unwrap();

        let mut expected = half_turn_calls().to_vec();
        expected.push(drive(50, 50, 1.5, true));
        expected.push(grip_close());
        expected.extend(half_turn_calls());
        expected.push(drive(50, 50, 20.0, true));
        expected.extend(phase(IndicatorColor::Green));
        assert_eq!(r.sim.calls(), expected);
        assert_eq!(r.sim.angle_resets(), 2);

        let state = r.clear.snapshot();
        assert_eq!(state.mode, BehaviorMode::Returning);
        assert_eq!(state.leg_started_at, Some(Duration::from_secs(3)));
    }

    #[test]
    fn conflicting_arm_is_rejected_before_any_actuator_call() {
        let r = rig();
        let mut alerts = r.bus.subscribe_to(Topic::Alerts);
        r.dispatcher.handle_payload(br#"{"type":"come"}"#).unwrap();
        r.sim.take_calls();
        let before = r.clear.snapshot();

        for payload in [&br#"{"type":"take"}"#[..], br#"{"type":"bring"}"#, br#"{"type":"come"}"#] {
            let err = r.dispatcher.handle_payload(payload).unwrap_err();
            assert!(matches!(
                err,
                FetchError::ConflictingModeArm {
                    active: BehaviorMode::Approaching,
                    ..
                }
            ));
        }
        assert!(r.sim.calls().is_empty());
        assert_eq!(r.clear.snapshot(), before);
        assert_eq!(alerts.drain().len(), 3);
    }

    #[test]
    fn stop_zeroes_wheels_without_touching_mode() {
        let r = rig();
        r.dispatcher.handle_payload(br#"{"type":"come"}"#).unwrap();
        r.dispatcher.motion().latch_patrol();
        let before = r.clear.snapshot();

        assert_eq!(
            r.dispatcher
                .handle_payload(br#"{"type":"move","direction":"stop"}"#)
                .unwrap(),
            DispatchOutcome::Moved(Direction::Stop)
        );
        assert_eq!(r.sim.calls().last(), Some(&ActuatorCall::DriveStop));
        assert!(!r.dispatcher.motion().is_patrolling());
        assert_eq!(r.clear.snapshot(), before);
    }

    #[test]
    fn halted_robot_rejects_everything() {
        let r = rig();
        r.clear.halt();
        for payload in [
            &br#"{"type":"come"}"#[..],
            br#"{"type":"move","direction":"forward","duration":1,"speed":10}"#,
        ] {
            assert_eq!(r.dispatcher.handle_payload(payload), Err(FetchError::Halted));
        }
        assert!(r.sim.calls().is_empty());
    }

    #[test]
    fn out_of_range_speed_is_a_decode_error() {
        let r = rig();
        for payload in [
            &br#"{"type":"move","direction":"forward","duration":1,"speed":"-1e12"}"#[..],
            br#"{"type":"move","direction":"backward","duration":1,"speed":1e12}"#,
            br#"{"type":"move","direction":"left","duration":1,"speed":100.5}"#,
        ] {
            let err = r.dispatcher.handle_payload(payload).unwrap_err();
            assert!(matches!(err, FetchError::Decode(msg) if msg.contains("speed")));
        }
        assert!(r.sim.calls().is_empty());
        assert!(!r.clear.snapshot().halted);
    }

    #[test]
    fn full_reverse_speed_is_accepted() {
        let r = rig();
        r.dispatcher
            .handle_payload(br#"{"type":"move","direction":"backward","duration":1,"speed":"-100"}"#)
            .unwrap();
        assert_eq!(r.sim.calls(), vec![drive(100, 100, 1.0, false)]);
    }

    #[test]
    fn actuator_fault_after_arming_halts_the_robot() {
        let r = rig();
        let mut alerts = r.bus.subscribe_to(Topic::Alerts);
        r.sim.inject_actuator_fault(Some("stalled"));
        let err = r.dispatcher.handle_payload(br#"{"type":"come"}"#).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(alerts.drain()[0].payload, EventPayload::Fault { .. }));

        r.sim.inject_actuator_fault(None);
        let state = r.clear.snapshot();
        assert!(state.halted);
        assert_eq!(state.mode, BehaviorMode::Idle);
        for payload in [&br#"{"type":"come"}"#[..], br#"{"type":"take"}"#, br#"{"type":"bring"}"#] {
            assert_eq!(r.dispatcher.handle_payload(payload), Err(FetchError::Halted));
        }
        assert!(r.sim.calls().is_empty());
    }

    #[test]
    fn jammed_gripper_stops_drive_and_shows_red() {
        let sim = Arc::new(SimRobot::new());
        let jammed = Arc::new(Hooked {
            sim: sim.clone(),
            hook: Box::new(|call: &ActuatorCall| match call {
                ActuatorCall::GripperPulse { .. } => Err(FetchError::ActuatorFault {
                    component: "gripper".to_string(),
                    details: "jammed".to_string(),
                }),
                _ => Ok(()),
            }),
        });
        let (arm, clear) = mode_channel();
        let bus = EventBus::default();
        let mut alerts = bus.subscribe_to(Topic::Alerts);
        let dispatcher = Dispatcher::new(
            Hardware::new(jammed, sim.clone()),
            arm,
            Arc::new(ManualClock::new()),
            BehaviorConfig::default(),
            bus,
        );

        let err = dispatcher.handle_payload(br#"{"type":"take"}"#).unwrap_err();
        assert!(matches!(err, FetchError::ActuatorFault { .. }));

        let mut expected = vec![grip_close(), ActuatorCall::DriveStop];
        expected.extend(phase(IndicatorColor::Red));
        assert_eq!(sim.calls(), expected);
        assert!(clear.snapshot().halted);
        assert_eq!(
            alerts.drain()[0].payload,
            EventPayload::Fault {
                component: "gripper".to_string(),
                message: "jammed".to_string(),
            }
        );
    }

    #[test]
    fn take_never_judges_its_turn_against_a_stale_heading() {
        let r = interleaved(|_, _| {});
        // Two earlier pivots left the gyro near a half turn.
        r.sim.set_angle(180.0);

        r.dispatcher.handle_payload(br#"{"type":"take"}"#).unwrap();

        assert_eq!(
            *r.outcomes.lock().unwrap(),
            vec![
                TickOutcome::Cruising,
                TickOutcome::Turning,
                TickOutcome::Turning,
                TickOutcome::Turning,
            ]
        );
        let state = r.machine.modes().snapshot();
        assert_eq!(state.mode, BehaviorMode::Retrieving);
        assert!(state.turn_in_progress);
    }

    #[test]
    fn bring_flags_each_turn_after_zeroing_the_heading() {
        let r = interleaved(|sim, call| {
            if let ActuatorCall::Drive { left_pct: 4, right_pct: -4, .. } = call {
                sim.set_angle(180.0);
            }
        });
        r.sim.set_angle(180.0);

        r.dispatcher.handle_payload(br#"{"type":"bring"}"#).unwrap();

        assert_eq!(
            *r.outcomes.lock().unwrap(),
            vec![
                TickOutcome::Turning,
                TickOutcome::TurnCompleted,
                TickOutcome::Cruising,
                TickOutcome::Cruising,
                TickOutcome::Turning,
                TickOutcome::TurnCompleted,
                TickOutcome::Cruising,
            ]
        );
        let state = r.machine.modes().snapshot();
        assert_eq!(state.mode, BehaviorMode::Returning);
        assert!(state.is_engaged());
    }

    #[test]
    fn lifecycle_sequences() {
        let r = rig();
        r.dispatcher.startup().unwrap();
        let mut expected = both(IndicatorColor::Black).to_vec();
        expected.push(ActuatorCall::StartupSound);
        expected.extend(both(IndicatorColor::Green));
        assert_eq!(r.sim.take_calls(), expected);

        r.dispatcher.on_disconnected().unwrap();
        assert_eq!(r.sim.take_calls(), both(IndicatorColor::Black).to_vec());
        r.dispatcher.on_connected().unwrap();
        assert_eq!(r.sim.take_calls(), both(IndicatorColor::Green).to_vec());

        r.dispatcher.shutdown().unwrap();
        let mut expected = vec![ActuatorCall::ShutdownSound];
        expected.extend(both(IndicatorColor::Black));
        assert_eq!(r.sim.take_calls(), expected);
    }
}
