//! [`Sensors`] trait for the infrared, gyro and touch inputs.

use fetchbot_types::{FetchError, SensorSnapshot};

/// Gyro measurement mode. Toggling `Rate` then `Angle` re-zeroes the
/// integrated heading on the brick's gyro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AngleMode {
    Rate,
    #[default]
    Angle,
}

/// Input side of the robot.
///
/// Every read returns [`FetchError::SensorRead`] when the device cannot be
/// queried; callers treat that as fatal.
pub trait Sensors: Send + Sync {
    fn read_distance_cm(&self) -> Result<f32, FetchError>;

    /// Integrated heading since the last reset, in degrees (signed).
    fn read_angle_deg(&self) -> Result<f32, FetchError>;

    fn reset_angle(&self) -> Result<(), FetchError>;

    fn set_angle_mode(&self, mode: AngleMode) -> Result<(), FetchError>;

    fn is_touch_pressed(&self) -> Result<bool, FetchError>;

    /// Read all three inputs once.
    fn snapshot(&self) -> Result<SensorSnapshot, FetchError> {
        Ok(SensorSnapshot {
            distance_cm: self.read_distance_cm()?,
            angle_deg: self.read_angle_deg()?,
            touch_pressed: self.is_touch_pressed()?,
        })
    }
}
