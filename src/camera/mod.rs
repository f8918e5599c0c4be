//! Camera framing from character geometry.

/// Pose calculator and the perspective camera.
pub mod pose;
