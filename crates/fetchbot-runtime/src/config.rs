//! [`BehaviorConfig`] – tunables shared by the dispatcher and the poll loop.
//!
//! Every field has a serde default, so a partial `[behavior]` table (or none
//! at all) deserialises to the calibrated values for the stock robot.
//! Values read from a file or the environment go through
//! [`BehaviorConfig::validate`] before use.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Poll period of the sensor loop.
    pub poll_interval_ms: u64,
    /// A mode completes once the target is this close or closer.
    pub proximity_threshold_cm: f32,
    /// A turn is done once `|angle|` reaches this many degrees.
    pub turn_complete_deg: f32,
    /// Subtracted from the outbound leg time when reversing home.
    pub return_margin_s: f32,
    /// Wheel speed used for every outbound leg.
    pub cruise_speed_pct: i32,
    /// Outbound leg length for `come`.
    pub approach_duration_s: f32,
    /// Outbound leg length for `take` and `bring`.
    pub carry_duration_s: f32,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 200,
            proximity_threshold_cm: 55.0,
            turn_complete_deg: 179.0,
            return_margin_s: 0.5,
            cruise_speed_pct: 50,
            approach_duration_s: 10.0,
            carry_duration_s: 20.0,
        }
    }
}

impl BehaviorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Check every tunable is usable, naming the first one that is not.
    ///
    /// | Field | Accepted |
    /// |---|---|
    /// | `poll_interval_ms` | > 0 |
    /// | `proximity_threshold_cm`, `return_margin_s` | finite, ≥ 0 |
    /// | `turn_complete_deg` | finite, in (0, 360] |
    /// | `cruise_speed_pct` | 1 ..= 100 |
    /// | `approach_duration_s`, `carry_duration_s` | finite, > 0 |
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be greater than 0".to_string());
        }
        non_negative("proximity_threshold_cm", self.proximity_threshold_cm)?;
        non_negative("return_margin_s", self.return_margin_s)?;
        let turn = self.turn_complete_deg;
        if !turn.is_finite() || turn <= 0.0 || turn > 360.0 {
            return Err(format!("turn_complete_deg {turn} must be in (0, 360]"));
        }
        if !(1..=100).contains(&self.cruise_speed_pct) {
            return Err(format!(
                "cruise_speed_pct {} must be between 1 and 100",
                self.cruise_speed_pct
            ));
        }
        positive("approach_duration_s", self.approach_duration_s)?;
        positive("carry_duration_s", self.carry_duration_s)
    }
}

fn non_negative(name: &str, value: f32) -> Result<(), String> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(format!("{name} {value} must be a finite value >= 0"))
    }
}

fn positive(name: &str, value: f32) -> Result<(), String> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(format!("{name} {value} must be a finite value > 0"))
    }
}
