// Core types and traits for Podium playback status synchronization

pub mod callback;
pub mod engine;
pub mod error;
pub mod focus;
pub mod intent;
pub mod status;

// Re-export commonly used types
pub use callback::{
    load_completion, LoadCompletionListener, StatusDispatcher, StatusEvent, StatusListener,
    ThrottledStatusListener,
};
pub use engine::{
    EngineEvent, EngineEventSink, EngineState, MediaEngine, MediaEngineFactory, SurfaceHandle,
};
pub use error::{PlaybackError, Result};
pub use focus::{AlwaysGranted, AudioEventHandler, AudioFocusCoordinator, FocusDenied};
pub use intent::{IntentPatch, PlaybackIntent, DEFAULT_PROGRESS_UPDATE_INTERVAL_MS};
pub use status::{EngineReadings, PlayerStatus, StatusSnapshot, VideoGeometry};
