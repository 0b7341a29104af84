// Audio focus contract

use crate::error::PlaybackError;
use crate::intent::PlaybackIntent;
use crate::Result;
use std::fmt;

/// Focus request refused by the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusDenied {
    pub reason: String,
}

impl FocusDenied {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FocusDenied {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Audio focus denied: {}", self.reason)
    }
}

impl std::error::Error for FocusDenied {}

impl From<FocusDenied> for PlaybackError {
    fn from(err: FocusDenied) -> Self {
        PlaybackError::FocusDenied(err.reason)
    }
}

/// Cooperative audio focus negotiation
pub trait AudioFocusCoordinator: Send + Sync {
    fn acquire(&self) -> std::result::Result<(), FocusDenied>;

    fn release(&self);

    /// Focus is only needed for audible playback
    fn is_focus_required(&self, intent: &PlaybackIntent) -> bool {
        intent.should_play && !intent.is_muted
    }

    /// Volume the engine should actually use, accounting for mute and ducking
    fn effective_volume(&self, is_muted: bool, volume: f32) -> f32 {
        if is_muted {
            0.0
        } else {
            volume
        }
    }
}

/// Coordinator for hosts without an audio focus concept
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysGranted;

impl AudioFocusCoordinator for AlwaysGranted {
    fn acquire(&self) -> std::result::Result<(), FocusDenied> {
        Ok(())
    }

    fn release(&self) {}
}

/// Player side of focus negotiation, driven by a coordinator when focus
/// is lost, ducked or regained.
pub trait AudioEventHandler: Send + Sync {
    /// Stop output now without touching the desired intent
    fn pause_immediately(&self);

    /// Whether the player currently plays or wants to play audibly
    fn requires_audio_focus(&self) -> bool;

    /// Re-apply volume after mute or ducking changed
    fn update_volume_mute_and_duck(&self);

    /// Resume if the intent still asks for playback
    fn play_if_eligible(&self) -> Result<()>;
}
