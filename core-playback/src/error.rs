//! # Playback Error Types

use thiserror::Error;

/// Errors that can occur in the buffering and scheduling pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// Buffer configuration is invalid (e.g., negative threshold).
    #[error("Invalid playback configuration: {0}")]
    InvalidConfig(String),

    /// The buffer was disposed; no further chunks are accepted.
    #[error("Playback buffer has been disposed")]
    Disposed,

    /// A chunk's sample rate does not match the render clock.
    #[error("Sample rate mismatch: render clock runs at {expected} Hz, chunk has {actual} Hz")]
    FormatMismatch { expected: u32, actual: u32 },

    /// The render clock is not advancing; chunks cannot be placed.
    #[error("Render clock is not running")]
    ClockStopped,
}

impl PlaybackError {
    /// Returns `true` when retrying later may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PlaybackError::ClockStopped)
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
