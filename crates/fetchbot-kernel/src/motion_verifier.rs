//! [`MotionVerifier`] – rule engine for decoded motion commands.
//!
//! Every [`MotionCommand`] built from an inbound directive is checked here
//! before the motion translator plans any actuator call.  The first violated
//! [`Rule`] is reported as [`FetchError::Decode`] so the directive is dropped
//! without side effects.

use fetchbot_types::{Direction, FetchError, MotionCommand};

/// A single invariant a motion command must satisfy.
pub trait Rule: Send + Sync {
    /// Human-readable name used in rejection messages.
    fn name(&self) -> &str;

    fn check(&self, command: &MotionCommand) -> Result<(), String>;
}

/// Validates a [`MotionCommand`] against all registered rules.
///
/// # Example
///
/// ```
/// use fetchbot_kernel::motion_verifier::MotionVerifier;
/// use fetchbot_types::{Direction, MotionCommand};
///
/// let verifier = MotionVerifier::standard();
/// assert!(verifier.verify(&MotionCommand::new(Direction::Forward, 2.0, 50)).is_ok());
/// assert!(verifier.verify(&MotionCommand::new(Direction::Forward, 2.0, 150)).is_err());
/// ```
#[derive(Default)]
pub struct MotionVerifier {
    rules: Vec<Box<dyn Rule>>,
}

impl MotionVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Speed within ±100 % and a finite, non-negative duration.
    pub fn standard() -> Self {
        let mut verifier = Self::new();
        verifier.add_rule(Box::new(SpeedRangeRule { max_pct: 100 }));
        verifier.add_rule(Box::new(DurationRule { max_s: None }));
        verifier
    }

    /// Rules are evaluated in insertion order.
    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn verify(&self, command: &MotionCommand) -> Result<(), FetchError> {
        for rule in &self.rules {
            rule.check(command)
                .map_err(|reason| FetchError::Decode(format!("{}: {reason}", rule.name())))?;
        }
        Ok(())
    }
}

/// Rejects speeds outside `-max_pct..=max_pct`.
pub struct SpeedRangeRule {
    pub max_pct: i32,
}

impl Rule for SpeedRangeRule {
    fn name(&self) -> &str {
        "speed_range"
    }

    fn check(&self, command: &MotionCommand) -> Result<(), String> {
        if command.speed_pct.unsigned_abs() > self.max_pct.unsigned_abs() {
            return Err(format!(
                "speed {}% outside ±{}%",
                command.speed_pct, self.max_pct
            ));
        }
        Ok(())
    }
}

/// Rejects negative or non-finite durations, and optionally caps them.
///
/// `Stop` carries no duration and is always accepted.
pub struct DurationRule {
    pub max_s: Option<f32>,
}

impl Rule for DurationRule {
    fn name(&self) -> &str {
        "duration"
    }

    fn check(&self, command: &MotionCommand) -> Result<(), String> {
        if command.direction == Direction::Stop {
            return Ok(());
        }
        let d = command.duration_s;
        if !d.is_finite() || d < 0.0 {
            return Err(format!("duration {d}s must be a finite value >= 0"));
        }
        match self.max_s {
            Some(max) if d > max => Err(format!("duration {d}s exceeds cap {max}s")),
            _ => Ok(()),
        }
    }
}
