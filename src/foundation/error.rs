/// Convenience result type used across posecast.
pub type PosecastResult<T> = Result<T, PosecastError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Missing optional capabilities (absent bones, unsupported expression channels) are never
/// reported through this type.
#[derive(thiserror::Error, Debug)]
pub enum PosecastError {
    /// Invalid user-provided input, rejected at the boundary.
    #[error("validation error: {0}")]
    Validation(String),

    /// A character asset could not be fetched or parsed.
    #[error("asset load error: {0}")]
    AssetLoad(String),

    /// Rasterization or compositing failed.
    #[error("render error: {0}")]
    Render(String),

    /// The animated image encoder failed.
    #[error("encode error: {0}")]
    Encode(String),

    /// A single-writer resource is already held by another caller.
    #[error("busy: {0}")]
    Busy(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PosecastError {
    /// Build a [`PosecastError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`PosecastError::AssetLoad`] value.
    pub fn asset_load(msg: impl Into<String>) -> Self {
        Self::AssetLoad(msg.into())
    }

    /// Build a [`PosecastError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`PosecastError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`PosecastError::Busy`] value.
    pub fn busy(msg: impl Into<String>) -> Self {
        Self::Busy(msg.into())
    }

    /// Build a [`PosecastError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
