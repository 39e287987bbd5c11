//! `fetchbot-hal` – Hardware Abstraction Layer
//!
//! The only place where the behavior core touches the robot.  Drivers for the
//! real brick implement [`Actuators`] and [`Sensors`]; everything above this
//! crate talks to the traits through a cloneable [`Hardware`] bundle.
//!
//! # Modules
//!
//! - [`actuator`] – [`Actuators`]: drive, gripper, indicator and sound
//!   outputs, plus the [`ActuatorCall`] record used to plan and replay calls.
//! - [`sensor`] – [`Sensors`]: infrared distance, gyro angle and touch inputs.
//! - [`registry`] – [`Hardware`]: the shared handle passed to both the
//!   directive dispatcher and the sensor poller.
//! - [`sim`] – [`SimRobot`]: an in-process robot with scripted sensor streams
//!   that records every actuator call for tests, or paces its gripper and
//!   keeps no log for headless runs.

pub mod actuator;
pub mod registry;
pub mod sensor;
pub mod sim;

pub use actuator::{ActuatorCall, Actuators, GripperTravel};
pub use registry::{Hardware, PHASE_INDICATOR_GROUP};
pub use sensor::{AngleMode, Sensors};
pub use sim::{HEADLESS_PULSE_TIME, SimRobot};
