//! Rendering (CPU-first).

/// Renderer trait, lights and the frame type.
pub mod backend;
/// Background color presets.
pub mod background;
/// Software rasterizer.
pub mod cpu;
/// Graphics resource accounting.
pub mod resources;
