//! Characters: ID boundary checks, the humanoid scene model and loaders.

/// Character IDs, lineups and asset endpoints.
pub mod ids;
/// Asynchronous loading with stale-result discard, plus the procedural mannequin.
pub mod loader;
/// Humanoid bones, meshes and expression channels.
pub mod model;
/// Node arena with parent links and world-space queries.
pub mod scene;
