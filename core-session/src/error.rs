use bridge_traits::BridgeError;
use core_playback::PlaybackError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a failure is surfaced to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    /// Expected condition, e.g. no swaps left.
    Notice,
    /// Transient; playback continues from buffered audio.
    Recoverable,
    /// The session cannot continue.
    Fatal,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Session is no longer valid: {0}")]
    InvalidSession(String),

    /// The response could not be used.
    #[error("Bad response: {0}")]
    BadResponse(String),

    /// The server understood the command and refused it.
    #[error("{command} refused: {reason}")]
    Rejected {
        command: &'static str,
        reason: String,
    },

    #[error("No session established")]
    NoSession,

    #[error("No swaps left")]
    NoSwapsLeft,

    #[error("{driver} driver does not support {operation}")]
    Unsupported {
        driver: &'static str,
        operation: &'static str,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SessionError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            SessionError::NoSwapsLeft
            | SessionError::NoSession
            | SessionError::Rejected { .. }
            | SessionError::Unsupported { .. } => ErrorSeverity::Notice,
            SessionError::Transport(_) => ErrorSeverity::Recoverable,
            SessionError::Playback(err) if err.is_recoverable() => ErrorSeverity::Recoverable,
            SessionError::InvalidSession(_)
            | SessionError::BadResponse(_)
            | SessionError::Playback(_)
            | SessionError::Internal(_) => ErrorSeverity::Fatal,
        }
    }

    /// Whether the same action may succeed when retried later.
    pub fn is_transient(&self) -> bool {
        matches!(self, SessionError::Transport(_))
    }
}

impl From<BridgeError> for SessionError {
    fn from(err: BridgeError) -> Self {
        SessionError::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
