//! Speech overlay drawn on top of the rendered character.

/// Built-in 5×7 bitmap font.
pub mod font;
/// Layout and compositing of the speech bubble.
pub mod speech;
/// Color presets for the bubble, frame and text.
pub mod style;
