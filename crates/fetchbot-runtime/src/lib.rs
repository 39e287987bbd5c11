//! `fetchbot-runtime` – The Behavior Engine
//!
//! Wires the hardware, the shared mode state and the event bus into the two
//! execution contexts of the robot.
//!
//! # Modules
//!
//! - [`dispatcher`] – [`Dispatcher`]: decodes inbound directives, runs `move`
//!   through the motion translator and starts `come` / `take` / `bring` by
//!   arming a behavior mode.
//! - [`poller`] – [`SensorPoller`]: the fixed-cadence sensor loop, on its own
//!   thread, that ticks the behavior machine and halts the robot on a fatal
//!   fault.
//! - [`behavior`] – [`BehaviorMachine`]: per-tick turn and proximity logic
//!   and the completion sequence of each mode.
//! - [`motion`] – [`MotionTranslator`] and the pure [`plan`][motion::plan]
//!   function mapping a direction to wheel-level drive calls.
//! - [`config`] – [`BehaviorConfig`]: thresholds, speeds and leg lengths.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: the global
//!   `tracing` subscriber with an optional OTLP span exporter.
//!
//! # Wiring
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::AtomicBool;
//!
//! use fetchbot_hal::{Hardware, SimRobot};
//! use fetchbot_kernel::{SystemClock, mode_channel};
//! use fetchbot_middleware::EventBus;
//! use fetchbot_runtime::{BehaviorConfig, BehaviorMachine, Dispatcher, SensorPoller};
//!
//! let sim = Arc::new(SimRobot::new());
//! let hw = Hardware::new(sim.clone(), sim.clone());
//! let (arm, clear) = mode_channel();
//! let clock = Arc::new(SystemClock::new());
//! let bus = EventBus::default();
//! let config = BehaviorConfig::default();
//!
//! let dispatcher = Dispatcher::new(hw.clone(), arm, clock.clone(), config.clone(), bus.clone());
//! let poller = SensorPoller::new(BehaviorMachine::new(hw, clear, clock, config, bus));
//!
//! let shutdown = Arc::new(AtomicBool::new(true));
//! let handle = poller.spawn(shutdown).unwrap();
//! dispatcher.handle_payload(br#"{"type":"move","direction":"forward","duration":1,"speed":30}"#).unwrap();
//! handle.join().unwrap().unwrap();
//! ```

pub mod behavior;
pub mod config;
pub mod dispatcher;
pub mod motion;
pub mod poller;
pub mod telemetry;

pub use behavior::{BehaviorMachine, TickOutcome};
pub use config::BehaviorConfig;
pub use dispatcher::{Command, DispatchOutcome, Dispatcher};
pub use motion::{MotionTranslator, plan};
pub use poller::SensorPoller;
pub use telemetry::{LogFormat, TelemetryGuard, init_tracing};
