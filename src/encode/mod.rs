//! Encoding sinks.
//!
//! Sinks consume rendered frames in loop order and are driven by the export pipeline.

/// Animated GIF sink and palette reduction.
pub mod gif;
/// Generic frame sink trait and built-in sinks.
pub mod sink;
