//! [`Hardware`] – the shared handle over both facades.
//!
//! The dispatcher and the poll loop each hold a clone.  Besides exposing the
//! raw traits it provides the compound operations both contexts need:
//! painting both indicators and re-zeroing the gyro heading.
//!
//! Indicators set while a behavior runs go to [`PHASE_INDICATOR_GROUP`];
//! session lifecycle colours (power on/off, link up/down) use the default
//! group.

use std::sync::Arc;

use fetchbot_types::{FetchError, IndicatorColor, IndicatorSide, SensorSnapshot};

use crate::actuator::{ActuatorCall, Actuators};
use crate::sensor::{AngleMode, Sensors};

/// Indicator group used for behavior phases (turning, hand-over, done).
pub const PHASE_INDICATOR_GROUP: u8 = 1;

#[derive(Clone)]
pub struct Hardware {
    actuators: Arc<dyn Actuators>,
    sensors: Arc<dyn Sensors>,
}

impl Hardware {
    pub fn new(actuators: Arc<dyn Actuators>, sensors: Arc<dyn Sensors>) -> Self {
        Self { actuators, sensors }
    }

    pub fn actuators(&self) -> &dyn Actuators {
        self.actuators.as_ref()
    }

    pub fn sensors(&self) -> &dyn Sensors {
        self.sensors.as_ref()
    }

    /// Issue a planned sequence of calls in order, stopping at the first
    /// failure.
    pub fn apply_all(&self, calls: &[ActuatorCall]) -> Result<(), FetchError> {
        for call in calls {
            call.apply(self.actuators())?;
        }
        Ok(())
    }

    /// Set both indicators to `color` in the default group.
    pub fn indicate(&self, color: IndicatorColor) -> Result<(), FetchError> {
        self.paint(color, None)
    }

    /// Set both indicators to `color` in [`PHASE_INDICATOR_GROUP`].
    pub fn indicate_phase(&self, color: IndicatorColor) -> Result<(), FetchError> {
        self.paint(color, Some(PHASE_INDICATOR_GROUP))
    }

    fn paint(&self, color: IndicatorColor, group: Option<u8>) -> Result<(), FetchError> {
        self.actuators.set_indicator(IndicatorSide::Left, color, group)?;
        self.actuators.set_indicator(IndicatorSide::Right, color, group)
    }

    /// Reset the integrated gyro angle to zero.
    ///
    /// The mode round-trip is required on the brick; a bare reset leaves the
    /// gyro drifting from its previous reference.
    pub fn zero_heading(&self) -> Result<(), FetchError> {
        self.sensors.reset_angle()?;
        self.sensors.set_angle_mode(AngleMode::Rate)?;
        self.sensors.set_angle_mode(AngleMode::Angle)
    }

    pub fn snapshot(&self) -> Result<SensorSnapshot, FetchError> {
        self.sensors.snapshot()
    }
}
