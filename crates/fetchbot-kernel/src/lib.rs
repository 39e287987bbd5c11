//! `fetchbot-kernel` – Shared State & Safety Checks
//!
//! Everything the two execution contexts (directive dispatcher and sensor
//! poll loop) share lives here.  The kernel does not drive hardware; it
//! guards state and validates requests.
//!
//! # Modules
//!
//! - [`mode`] – [`mode_channel`][mode::mode_channel]: the guarded
//!   [`BehaviorState`][mode::BehaviorState] bundle split into a
//!   [`ModeArm`][mode::ModeArm] handle (dispatcher side, may only arm) and a
//!   [`ModeClear`][mode::ModeClear] handle (poll-loop side, may only clear).
//! - [`clock`] – [`Clock`][clock::Clock]: monotonic time and sleeping, with a
//!   [`ManualClock`][clock::ManualClock] so loops can be driven in tests
//!   without real delays.
//! - [`motion_verifier`] – [`MotionVerifier`][motion_verifier::MotionVerifier]:
//!   rejects [`MotionCommand`][fetchbot_types::MotionCommand]s with
//!   out-of-range speeds or durations before they reach the HAL.

pub mod clock;
pub mod mode;
pub mod motion_verifier;

pub use clock::{Clock, ManualClock, SystemClock};
pub use mode::{BehaviorState, ModeArm, ModeClear, mode_channel};
pub use motion_verifier::{DurationRule, MotionVerifier, Rule, SpeedRangeRule};
