//! GIF export.

/// Frame loop, shared renderer and stage cleanup.
pub mod pipeline;
/// JSON request documents.
pub mod request;
