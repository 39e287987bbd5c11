//! Guarded behavior state shared by the dispatcher and the poll loop.
//!
//! The bundle ([`BehaviorState`]) sits behind one mutex.  Access is split
//! into two handles returned by [`mode_channel`]:
//!
//! | Handle | Holder | May |
//! |---|---|---|
//! | [`ModeArm`] | directive dispatcher | arm a mode, arm a turn, engage the leg, halt |
//! | [`ModeClear`] | sensor poll loop | read, complete a turn, clear a mode, halt |
//!
//! Every method is one short read-check-write under the lock.  No method
//! calls out to hardware, so the lock is never held across an actuator call.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use fetchbot_kernel::mode::mode_channel;
//! use fetchbot_types::BehaviorMode;
//!
//! let (arm, clear) = mode_channel();
//! arm.arm(BehaviorMode::Approaching, false).unwrap();
//! arm.engage(Duration::from_secs(3)).unwrap();
//!
//! // A second behavior cannot be armed until the first is cleared.
//! assert!(arm.arm(BehaviorMode::Retrieving, false).is_err());
//!
//! let finished = clear.clear(BehaviorMode::Approaching).unwrap();
//! assert_eq!(finished.leg_started_at, Some(Duration::from_secs(3)));
//! assert!(arm.arm(BehaviorMode::Retrieving, false).is_ok());
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use fetchbot_types::{BehaviorMode, FetchError};
use tracing::debug;

/// The shared behavior bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BehaviorState {
    pub mode: BehaviorMode,
    pub turn_in_progress: bool,
    /// Clock time at which the outbound leg of the active mode began.
    /// `None` while the dispatcher is still running the mode's preamble.
    pub leg_started_at: Option<Duration>,
    /// Latched after a fatal fault; nothing can be armed afterwards.
    pub halted: bool,
}

impl BehaviorState {
    /// A behavior or a turn is running.
    pub fn is_busy(&self) -> bool {
        !self.mode.is_idle() || self.turn_in_progress
    }

    /// The active mode's leg is underway and its distance threshold applies.
    pub fn is_engaged(&self) -> bool {
        !self.mode.is_idle() && !self.turn_in_progress && self.leg_started_at.is_some()
    }
}

#[derive(Default)]
struct Shared {
    state: Mutex<BehaviorState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, BehaviorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn halt(&self) {
        let mut state = self.lock();
        *state = BehaviorState {
            halted: true,
            ..BehaviorState::default()
        };
        debug!("behavior state halted");
    }
}

/// Create a fresh `Idle` state and its two access handles.
pub fn mode_channel() -> (ModeArm, ModeClear) {
    let shared = Arc::new(Shared::default());
    (
        ModeArm {
            shared: Arc::clone(&shared),
        },
        ModeClear { shared },
    )
}

/// Dispatcher-side handle.  It can start behaviors but never observes or
/// waits for them finishing.
#[derive(Clone)]
pub struct ModeArm {
    shared: Arc<Shared>,
}

impl ModeArm {
    /// Arm `mode`, optionally together with a turn.
    ///
    /// Arming `Idle` is a no-op.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Halted`] after a fatal fault.
    /// - [`FetchError::ConflictingModeArm`] while another mode or a turn is
    ///   still running; the running behavior is left untouched.
    pub fn arm(&self, mode: BehaviorMode, with_turn: bool) -> Result<(), FetchError> {
        if mode.is_idle() {
            return Ok(());
        }
        let mut state = self.shared.lock();
        if state.halted {
            return Err(FetchError::Halted);
        }
        if state.is_busy() {
            return Err(FetchError::ConflictingModeArm {
                requested: mode,
                active: state.mode,
                turning: state.turn_in_progress,
            });
        }
        state.mode = mode;
        state.turn_in_progress = with_turn;
        state.leg_started_at = None;
        debug!(%mode, with_turn, "mode armed");
        Ok(())
    }

    /// Flag another turn within the behavior this dispatcher armed.
    pub fn arm_turn(&self) -> Result<(), FetchError> {
        let mut state = self.shared.lock();
        if state.halted {
            return Err(FetchError::Halted);
        }
        state.turn_in_progress = true;
        Ok(())
    }

    /// Mark the start of the active mode's outbound leg at clock time `at`.
    pub fn engage(&self, at: Duration) -> Result<(), FetchError> {
        let mut state = self.shared.lock();
        if state.halted {
            return Err(FetchError::Halted);
        }
        if !state.mode.is_idle() {
            state.leg_started_at = Some(at);
        }
        Ok(())
    }

    /// Drop the behavior this dispatcher was starting and refuse further
    /// arms, after a fatal fault in one of its own actuator calls.
    pub fn halt(&self) {
        self.shared.halt();
    }

    pub fn is_halted(&self) -> bool {
        self.shared.lock().halted
    }
}

/// Poll-loop-side handle.  Deliberately not `Clone`: there is exactly one
/// poll loop.
pub struct ModeClear {
    shared: Arc<Shared>,
}

impl ModeClear {
    pub fn snapshot(&self) -> BehaviorState {
        *self.shared.lock()
    }

    /// Clear the turn flag.  Returns `false` if no turn was in progress.
    pub fn complete_turn(&self) -> bool {
        let mut state = self.shared.lock();
        std::mem::replace(&mut state.turn_in_progress, false)
    }

    /// Return to `Idle` if `expected` is still the active mode, yielding the
    /// state as it was just before clearing.
    pub fn clear(&self, expected: BehaviorMode) -> Option<BehaviorState> {
        self.clear_with(expected, false)
    }

    /// Like [`clear`][Self::clear] but leaves a turn in progress, for
    /// sequences that end with the robot spinning round on its own.
    pub fn clear_into_turn(&self, expected: BehaviorMode) -> Option<BehaviorState> {
        self.clear_with(expected, true)
    }

    fn clear_with(&self, expected: BehaviorMode, turning: bool) -> Option<BehaviorState> {
        let mut state = self.shared.lock();
        if state.mode != expected || expected.is_idle() {
            return None;
        }
        let before = *state;
        state.mode = BehaviorMode::Idle;
        state.leg_started_at = None;
        state.turn_in_progress = turning;
        debug!(mode = %expected, turning, "mode cleared");
        Some(before)
    }

    /// Drop whatever is running and refuse further arms.
    pub fn halt(&self) {
        self.shared.halt();
    }
}
