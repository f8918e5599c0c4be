//! Motion presets evaluated as pure functions of loop time.
//!
//! A [`rig::MotionRig`] snapshots the rest pose once per character. Every frame resets to that
//! snapshot and applies the preset's offsets, so poses never drift between frames.

/// Easing curves.
pub mod ease;
/// Preset rules and the per-frame evaluator.
pub mod evaluator;
/// Expression channel aliases.
pub mod expression;
/// Preset catalog, strength and speed steps.
pub mod presets;
/// Rest-pose snapshot and offset application.
pub mod rig;
