// Playback status snapshots and their derivation from engine readings

use crate::engine::{EngineState, MediaEngine};
use crate::intent::PlaybackIntent;

/// Point-in-time view of playback status
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    /// Total duration, `None` while unknown
    pub duration_ms: Option<i64>,
    /// Current position, clamped to `[0, duration]`
    pub position_ms: i64,
    /// Buffered position, clamped to `[position, duration]`
    pub playable_duration_ms: i64,
    pub is_playing: bool,
    pub is_buffering: bool,
    pub is_looping: bool,
    pub should_play: bool,
    pub rate: f32,
    pub should_correct_pitch: bool,
    pub volume: f32,
    pub is_muted: bool,
    /// True only in the snapshot published right after natural end of media
    pub did_just_finish: bool,
    pub progress_update_interval_ms: u64,
    /// Engine implementation name
    pub implementation: &'static str,
}

/// Raw values queried from the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineReadings {
    pub duration_ms: Option<i64>,
    pub position_ms: i64,
    pub buffered_position_ms: i64,
    pub state: EngineState,
    pub play_when_ready: bool,
}

impl EngineReadings {
    pub fn read(engine: &dyn MediaEngine) -> Self {
        Self {
            duration_ms: engine.duration_ms(),
            position_ms: engine.position_ms(),
            buffered_position_ms: engine.buffered_position_ms(),
            state: engine.playback_state(),
            play_when_ready: engine.play_when_ready(),
        }
    }
}

impl StatusSnapshot {
    /// Derive a snapshot, enforcing
    /// `0 <= position <= playable <= duration` (when duration is known)
    /// and `is_playing => !is_buffering`.
    pub fn derive(
        readings: &EngineReadings,
        intent: &PlaybackIntent,
        is_loading: bool,
        implementation: &'static str,
    ) -> Self {
        // Negative durations are the engine's "unset" marker
        let duration_ms = readings.duration_ms.filter(|d| *d >= 0);

        let (position_ms, playable_duration_ms) = match duration_ms {
            Some(duration) => {
                let position = clamp_ms(readings.position_ms, 0, duration);
                let playable = clamp_ms(readings.buffered_position_ms, position, duration);
                (position, playable)
            }
            None => {
                let position = readings.position_ms.max(0);
                (position, readings.buffered_position_ms.max(position))
            }
        };

        if position_ms != readings.position_ms {
            log::trace!(
                "{} reported position {} outside duration {:?}",
                implementation,
                readings.position_ms,
                duration_ms
            );
        }

        let is_playing = readings.state == EngineState::Ready && readings.play_when_ready;
        let is_buffering =
            !is_playing && (readings.state == EngineState::Buffering || is_loading);

        Self {
            duration_ms,
            position_ms,
            playable_duration_ms,
            is_playing,
            is_buffering,
            is_looping: intent.is_looping,
            should_play: intent.should_play,
            rate: intent.rate,
            should_correct_pitch: intent.should_correct_pitch,
            volume: intent.volume,
            is_muted: intent.is_muted,
            did_just_finish: false,
            progress_update_interval_ms: intent.progress_update_interval_ms,
            implementation,
        }
    }

    pub fn with_did_just_finish(mut self) -> Self {
        self.did_just_finish = true;
        self
    }
}

fn clamp_ms(value: i64, min: i64, max: i64) -> i64 {
    value.max(min).min(max)
}

/// Status as seen by a consumer that may query before load
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerStatus {
    Unloaded,
    Loaded(StatusSnapshot),
}

impl PlayerStatus {
    pub fn is_loaded(&self) -> bool {
        matches!(self, PlayerStatus::Loaded(_))
    }

    pub fn snapshot(&self) -> Option<&StatusSnapshot> {
        match self {
            PlayerStatus::Loaded(snapshot) => Some(snapshot),
            PlayerStatus::Unloaded => None,
        }
    }
}

/// Rendered video size, `(0, 0)` until measured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VideoGeometry {
    pub width: u32,
    pub height: u32,
}

impl VideoGeometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}
