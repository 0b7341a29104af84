// Media engine abstraction layer
// The decode/render engine is external; the controller only drives it
// through commands and reacts to the events it emits.

use std::sync::Arc;

/// Playback state reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Nothing prepared
    Idle,
    /// Not enough data to render at the current position
    Buffering,
    /// Able to render immediately
    Ready,
    /// Reached the end of the media
    Ended,
}

/// Opaque handle to a render surface owned by the host view layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u64);

/// Events emitted by the engine, in engine-defined order
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    LoadingChanged {
        is_loading: bool,
    },

    PlayerStateChanged {
        play_when_ready: bool,
        state: EngineState,
    },

    /// Source could not be loaded
    LoadError {
        message: String,
    },

    VideoSizeChanged {
        width: u32,
        height: u32,
        unapplied_rotation_degrees: i32,
        pixel_width_height_ratio: f32,
    },

    RenderedFirstFrame,

    // Accepted and ignored
    TimelineChanged,
    PositionDiscontinuity,
    PlayerError {
        message: String,
    },
    VideoTracksDisabled,
}

/// Receives engine events. Engines may call this from any thread,
/// including synchronously from inside a command.
pub trait EngineEventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

/// Media engine trait
/// Commands never fail synchronously; failures arrive as events.
pub trait MediaEngine: Send {
    /// Name reported in status snapshots
    fn implementation_name(&self) -> &'static str;

    /// Start loading the media
    fn prepare(&mut self, media_ref: &str);

    fn set_play_when_ready(&mut self, play_when_ready: bool);

    fn play_when_ready(&self) -> bool;

    /// Seek to a specific position (in milliseconds)
    fn seek_to(&mut self, position_ms: i64);

    /// Set volume (0.0 - 1.0)
    fn set_volume(&mut self, volume: f32);

    /// Set playback rate; `correct_pitch` keeps pitch at 1.0 when supported
    fn set_rate(&mut self, rate: f32, correct_pitch: bool);

    /// Whether `set_rate` can decouple pitch from speed.
    /// When false, pitch follows rate.
    fn supports_pitch_correction(&self) -> bool;

    /// Attach or detach the render surface
    fn attach_surface(&mut self, surface: Option<SurfaceHandle>);

    /// Total duration, `None` while unknown
    fn duration_ms(&self) -> Option<i64>;

    fn position_ms(&self) -> i64;

    fn buffered_position_ms(&self) -> i64;

    fn playback_state(&self) -> EngineState;

    fn audio_session_id(&self) -> i32 {
        0
    }

    /// Release all resources
    fn release(&mut self);
}

/// Builds an engine bound to one media identifier
pub trait MediaEngineFactory: Send + Sync {
    /// The returned engine must deliver every event to `sink`
    fn create_engine(
        &self,
        media_ref: &str,
        sink: Arc<dyn EngineEventSink>,
    ) -> Box<dyn MediaEngine>;
}
