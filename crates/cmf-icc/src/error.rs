//! ICC error types.

use thiserror::Error;

/// Result type for ICC operations.
pub type IccResult<T> = Result<T, IccError>;

/// Errors raised while resolving profiles or building transforms.
#[derive(Debug, Error)]
pub enum IccError {
    /// Failed to load profile from file.
    #[error("failed to load profile: {0}")]
    LoadFailed(String),

    /// Failed to synthesise a built-in profile.
    #[error("failed to create profile: {0}")]
    CreateFailed(String),

    /// Failed to create transform.
    #[error("failed to create transform: {0}")]
    TransformFailed(String),

    /// Name is neither a built-in profile nor a readable file.
    #[error("unknown profile: {0}")]
    UnknownProfile(String),

    /// Rendering intent name not recognised.
    #[error("unknown rendering intent: {0}")]
    UnknownIntent(String),

    /// Pixel layout cannot carry RGB triplets.
    #[error("transform needs at least 3 channels, got {0}")]
    UnsupportedChannels(u32),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
