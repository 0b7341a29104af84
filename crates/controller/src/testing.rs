// Test doubles: a scriptable engine, a switchable focus coordinator and
// recording listeners

use crate::config::ControllerConfig;
use crate::controller::PlaybackController;
use parking_lot::Mutex;
use podium_av_core::{
    AudioFocusCoordinator, EngineEvent, EngineEventSink, EngineState, FocusDenied,
    LoadCompletionListener, MediaEngine, MediaEngineFactory, PlaybackIntent, StatusEvent,
    StatusListener, StatusSnapshot, SurfaceHandle, VideoGeometry,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub(crate) const MEDIA: &str = "https://media.example/episode-42.mp3";
pub(crate) const FAKE_IMPLEMENTATION: &str = "FakeEngine";
pub(crate) const FAKE_AUDIO_SESSION: i32 = 17;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum EngineCommand {
    Prepare(String),
    SetPlayWhenReady(bool),
    SeekTo(i64),
    SetVolume(f32),
    SetRate(f32, bool),
    AttachSurface(Option<SurfaceHandle>),
    Release,
}

struct FakeEngineState {
    commands: Vec<EngineCommand>,
    play_when_ready: bool,
    duration_ms: Option<i64>,
    position_ms: i64,
    buffered_position_ms: i64,
    state: EngineState,
    supports_pitch_correction: bool,
    emit_on_prepare: Vec<EngineEvent>,
}

/// Test-side view of the engine the factory hands out
#[derive(Clone)]
pub(crate) struct FakeEngineHandle {
    state: Arc<Mutex<FakeEngineState>>,
    sink: Arc<Mutex<Option<Arc<dyn EngineEventSink>>>>,
}

impl FakeEngineHandle {
    fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeEngineState {
                commands: Vec::new(),
                play_when_ready: false,
                duration_ms: Some(10_000),
                position_ms: 0,
                buffered_position_ms: 0,
                state: EngineState::Idle,
                supports_pitch_correction: true,
                emit_on_prepare: Vec::new(),
            })),
            sink: Arc::new(Mutex::new(None)),
        }
    }

    /// Deliver an event as the engine would, from the calling thread
    pub(crate) fn emit(&self, event: EngineEvent) {
        let sink = self.sink.lock().clone();
        match sink {
            Some(sink) => sink.emit(event),
            None => panic!("engine was never created"),
        }
    }

    pub(crate) fn emit_on_prepare(&self, events: Vec<EngineEvent>) {
        self.state.lock().emit_on_prepare = events;
    }

    pub(crate) fn commands(&self) -> Vec<EngineCommand> {
        self.state.lock().commands.clone()
    }

    pub(crate) fn clear_commands(&self) {
        self.state.lock().commands.clear();
    }

    pub(crate) fn play_when_ready(&self) -> bool {
        self.state.lock().play_when_ready
    }

    /// Change play-when-ready behind the controller's back
    pub(crate) fn force_play_when_ready(&self, play_when_ready: bool) {
        self.state.lock().play_when_ready = play_when_ready;
    }

    pub(crate) fn set_duration(&self, duration_ms: Option<i64>) {
        self.state.lock().duration_ms = duration_ms;
    }

    pub(crate) fn set_positions(&self, position_ms: i64, buffered_position_ms: i64) {
        let mut state = self.state.lock();
        state.position_ms = position_ms;
        state.buffered_position_ms = buffered_position_ms;
    }

    pub(crate) fn set_state(&self, engine_state: EngineState) {
        self.state.lock().state = engine_state;
    }

    pub(crate) fn set_supports_pitch_correction(&self, supported: bool) {
        self.state.lock().supports_pitch_correction = supported;
    }
}

struct FakeEngine {
    state: Arc<Mutex<FakeEngineState>>,
    sink: Arc<dyn EngineEventSink>,
}

impl FakeEngine {
    fn record(&self, command: EngineCommand) {
        self.state.lock().commands.push(command);
    }
}

impl MediaEngine for FakeEngine {
    fn implementation_name(&self) -> &'static str {
        FAKE_IMPLEMENTATION
    }

    fn prepare(&mut self, media_ref: &str) {
        let events = {
            let mut state = self.state.lock();
            state.commands.push(EngineCommand::Prepare(media_ref.to_string()));
            std::mem::take(&mut state.emit_on_prepare)
        };
        for event in events {
            self.sink.emit(event);
        }
    }

    fn set_play_when_ready(&mut self, play_when_ready: bool) {
        let mut state = self.state.lock();
        state.play_when_ready = play_when_ready;
        state
            .commands
            .push(EngineCommand::SetPlayWhenReady(play_when_ready));
    }

    fn play_when_ready(&self) -> bool {
        self.state.lock().play_when_ready
    }

    fn seek_to(&mut self, position_ms: i64) {
        let mut state = self.state.lock();
        state.position_ms = position_ms;
        state.commands.push(EngineCommand::SeekTo(position_ms));
    }

    fn set_volume(&mut self, volume: f32) {
        self.record(EngineCommand::SetVolume(volume));
    }

    fn set_rate(&mut self, rate: f32, correct_pitch: bool) {
        self.record(EngineCommand::SetRate(rate, correct_pitch));
    }

    fn supports_pitch_correction(&self) -> bool {
        self.state.lock().supports_pitch_correction
    }

    fn attach_surface(&mut self, surface: Option<SurfaceHandle>) {
        self.record(EngineCommand::AttachSurface(surface));
    }

    fn duration_ms(&self) -> Option<i64> {
        self.state.lock().duration_ms
    }

    fn position_ms(&self) -> i64 {
        self.state.lock().position_ms
    }

    fn buffered_position_ms(&self) -> i64 {
        self.state.lock().buffered_position_ms
    }

    fn playback_state(&self) -> EngineState {
        self.state.lock().state
    }

    fn audio_session_id(&self) -> i32 {
        FAKE_AUDIO_SESSION
    }

    fn release(&mut self) {
        self.record(EngineCommand::Release);
    }
}

pub(crate) struct FakeFactory {
    handle: FakeEngineHandle,
    created: AtomicUsize,
}

impl FakeFactory {
    pub(crate) fn new() -> (Arc<Self>, FakeEngineHandle) {
        let handle = FakeEngineHandle::new();
        let factory = Arc::new(Self {
            handle: handle.clone(),
            created: AtomicUsize::new(0),
        });
        (factory, handle)
    }

    pub(crate) fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl MediaEngineFactory for FakeFactory {
    fn create_engine(
        &self,
        _media_ref: &str,
        sink: Arc<dyn EngineEventSink>,
    ) -> Box<dyn MediaEngine> {
        self.created.fetch_add(1, Ordering::SeqCst);
        *self.handle.sink.lock() = Some(sink.clone());
        Box::new(FakeEngine {
            state: self.handle.state.clone(),
            sink,
        })
    }
}

/// Focus coordinator that grants or denies on demand
pub(crate) struct FakeFocus {
    grant: AtomicBool,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl FakeFocus {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            grant: AtomicBool::new(true),
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        })
    }

    pub(crate) fn set_grant(&self, grant: bool) {
        self.grant.store(grant, Ordering::SeqCst);
    }

    pub(crate) fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub(crate) fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl AudioFocusCoordinator for FakeFocus {
    fn acquire(&self) -> Result<(), FocusDenied> {
        if self.grant.load(Ordering::SeqCst) {
            self.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(())
        } else {
            Err(FocusDenied::new("test denial"))
        }
    }

    fn release(&self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub(crate) struct RecordingListener {
    events: Mutex<Vec<StatusEvent>>,
}

impl RecordingListener {
    pub(crate) fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().clone()
    }

    pub(crate) fn status_updates(&self) -> Vec<StatusSnapshot> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                StatusEvent::StatusUpdate(snapshot) => Some(snapshot.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn progress_updates(&self) -> Vec<StatusSnapshot> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                StatusEvent::ProgressUpdate(snapshot) => Some(snapshot.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn finishes(&self) -> Vec<StatusSnapshot> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                StatusEvent::DidJustFinish(snapshot) => Some(snapshot.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn geometries(&self) -> Vec<VideoGeometry> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                StatusEvent::VideoGeometryUpdate(geometry) => Some(*geometry),
                _ => None,
            })
            .collect()
    }
}

impl StatusListener for RecordingListener {
    fn on_event(&self, event: StatusEvent) {
        self.events.lock().push(event);
    }
}

pub(crate) type LoadOutcomes = Arc<Mutex<Vec<Result<StatusSnapshot, String>>>>;

struct RecordingCompletion {
    outcomes: LoadOutcomes,
}

impl LoadCompletionListener for RecordingCompletion {
    fn on_load_success(self: Box<Self>, status: StatusSnapshot) {
        self.outcomes.lock().push(Ok(status));
    }

    fn on_load_error(self: Box<Self>, message: String) {
        self.outcomes.lock().push(Err(message));
    }
}

/// A controller wired to fakes
pub(crate) struct Fixture {
    pub(crate) controller: Arc<PlaybackController>,
    pub(crate) engine: FakeEngineHandle,
    pub(crate) factory: Arc<FakeFactory>,
    pub(crate) focus: Arc<FakeFocus>,
    pub(crate) listener: Arc<RecordingListener>,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self::with_config(ControllerConfig::default())
    }

    pub(crate) fn with_config(config: ControllerConfig) -> Self {
        let (factory, engine) = FakeFactory::new();
        let focus = FakeFocus::new();
        let listener = Arc::new(RecordingListener::default());
        let controller =
            PlaybackController::new(MEDIA, factory.clone(), focus.clone(), config);
        controller.set_status_listener(Some(listener.clone()));
        Self {
            controller,
            engine,
            factory,
            focus,
            listener,
        }
    }

    /// Loaded with the default intent, engine reports loading done
    pub(crate) fn loaded() -> Self {
        let fixture = Self::new();
        fixture.load_and_complete(PlaybackIntent::default());
        fixture
    }

    pub(crate) fn load(&self, intent: PlaybackIntent) -> LoadOutcomes {
        let outcomes: LoadOutcomes = Arc::new(Mutex::new(Vec::new()));
        self.controller.load(
            intent,
            Box::new(RecordingCompletion {
                outcomes: outcomes.clone(),
            }),
        );
        outcomes
    }

    pub(crate) fn load_and_complete(&self, intent: PlaybackIntent) -> LoadOutcomes {
        let outcomes = self.load(intent);
        self.engine
            .emit(EngineEvent::LoadingChanged { is_loading: false });
        outcomes
    }
}
