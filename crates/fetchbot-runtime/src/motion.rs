//! Motion translator: symbolic [`MotionCommand`]s to wheel-level drive calls.
//!
//! Planning ([`plan`]) is pure so every direction's call sequence can be
//! checked without hardware.  [`MotionTranslator`] verifies, plans and
//! issues; it never reads or writes the behavior mode.

use std::sync::atomic::{AtomicBool, Ordering};

use fetchbot_hal::{ActuatorCall, Hardware};
use fetchbot_kernel::MotionVerifier;
use fetchbot_types::{Direction, FetchError, MotionCommand};
use tracing::{debug, instrument};

/// Calibrated one-wheel pivot that points the robot roughly 90° before a
/// `left`/`right` drive.
pub const PIVOT_DURATION_S: f32 = 2.0;

const FAST_PIVOT_PCT: i32 = 100;
const FAST_PIVOT_S: f32 = 1.3;
/// Slow enough that a 200 ms poll lands within a degree of the half turn.
const SLOW_PIVOT_PCT: i32 = 4;
const SLOW_PIVOT_S: f32 = 40.0;

/// Start a 180° spin on the spot: zero the heading, then [`pivot_round`].
pub fn half_turn(hw: &Hardware, wait: bool) -> Result<(), FetchError> {
    hw.zero_heading()?;
    pivot_round(hw, wait)
}

/// Pivot fast for most of a half turn, then creep until the poll loop sees
/// `|angle| ≥ 179°` and stops the drive.  The heading must already be zero.
///
/// With `wait` the slow pivot blocks the caller until it is stopped.
pub fn pivot_round(hw: &Hardware, wait: bool) -> Result<(), FetchError> {
    let drive = hw.actuators();
    drive.drive(FAST_PIVOT_PCT, -FAST_PIVOT_PCT, FAST_PIVOT_S, true)?;
    drive.drive(SLOW_PIVOT_PCT, -SLOW_PIVOT_PCT, SLOW_PIVOT_S, wait)
}

/// Actuator calls for `command`, in issue order.
///
/// | Direction | Calls |
/// |---|---|
/// | `Forward` | `drive(s, s, d)` |
/// | `Backward` | `drive(-s, -s, d)` |
/// | `Left` | `drive(0, s, 2s, blocking)`, `drive(s, s, d)` |
/// | `Right` | `drive(s, 0, 2s, blocking)`, `drive(s, s, d)` |
/// | `Stop` | `drive_stop` |
pub fn plan(command: &MotionCommand) -> Vec<ActuatorCall> {
    let s = command.speed_pct;
    let straight = |left_pct: i32, right_pct: i32| ActuatorCall::Drive {
        left_pct,
        right_pct,
        duration_s: command.duration_s,
        blocking: command.blocking,
    };
    let pivot = |left_pct: i32, right_pct: i32| ActuatorCall::Drive {
        left_pct,
        right_pct,
        duration_s: PIVOT_DURATION_S,
        blocking: true,
    };
    match command.direction {
        Direction::Forward => vec![straight(s, s)],
        Direction::Backward => vec![straight(-s, -s)],
        Direction::Left => vec![pivot(0, s), straight(s, s)],
        Direction::Right => vec![pivot(s, 0), straight(s, s)],
        Direction::Stop => vec![ActuatorCall::DriveStop],
    }
}

/// Verifies and executes motion commands against the drive base.
pub struct MotionTranslator {
    hw: Hardware,
    verifier: MotionVerifier,
    patrolling: AtomicBool,
}

impl MotionTranslator {
    pub fn new(hw: Hardware, verifier: MotionVerifier) -> Self {
        Self {
            hw,
            verifier,
            patrolling: AtomicBool::new(false),
        }
    }

    /// Mark the robot as cruising on its own until the next `Stop`.
    pub fn latch_patrol(&self) {
        self.patrolling.store(true, Ordering::SeqCst);
    }

    pub fn is_patrolling(&self) -> bool {
        self.patrolling.load(Ordering::SeqCst)
    }

    /// Check `command`, then issue its planned calls.
    ///
    /// A rejected command issues nothing.
    #[instrument(skip(self), fields(direction = %command.direction))]
    pub fn execute(&self, command: &MotionCommand) -> Result<(), FetchError> {
        self.verifier.verify(command)?;
        if command.direction == Direction::Stop {
            self.patrolling.store(false, Ordering::SeqCst);
        }
        let calls = plan(command);
        debug!(calls = calls.len(), "issuing motion");
        self.hw.apply_all(&calls)
    }
}
