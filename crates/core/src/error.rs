// Error handling for playback status synchronization

use std::fmt;

/// Playback controller error types
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// Operation requested before the initial load completed, or after release
    EngineNotReady,

    /// Audio focus could not be acquired; playback withheld, intent preserved
    FocusDenied(String),

    /// The media engine reported a load error
    LoadFailed(String),

    /// Rejected intent (non-positive rate, volume out of range, ...)
    InvalidIntent(String),

    /// No controller registered under this key
    UnknownController(i64),
}

impl fmt::Display for PlaybackError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PlaybackError::EngineNotReady => write!(f, "Engine not ready"),
            PlaybackError::FocusDenied(msg) => write!(f, "Audio focus denied: {}", msg),
            PlaybackError::LoadFailed(msg) => write!(f, "Load failed: {}", msg),
            PlaybackError::InvalidIntent(msg) => write!(f, "Invalid intent: {}", msg),
            PlaybackError::UnknownController(key) => write!(f, "Unknown controller: {}", key),
        }
    }
}

impl std::error::Error for PlaybackError {}

impl PlaybackError {
    /// Recoverable errors leave the controller usable; the caller may retry later.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, PlaybackError::FocusDenied(_) | PlaybackError::InvalidIntent(_))
    }
}

/// Result type alias for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
