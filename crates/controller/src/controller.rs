// Playback controller: reconciles consumer intent with an asynchronous media engine
//
// All state lives behind one mutex. Engine events go through a mailbox and
// are drained by whichever thread holds the state lock next, so an engine
// emitting from inside a command never deadlocks. Listener notifications are
// queued while locked, in lock order, and delivered after the lock is dropped
// by one thread at a time. A command returns only after everything queued
// before it has been delivered.

use crate::config::ControllerConfig;
use crate::progress::ProgressLoop;
use parking_lot::{Mutex, ReentrantMutex};
use podium_av_core::{
    AudioEventHandler, AudioFocusCoordinator, EngineEvent, EngineEventSink, EngineReadings,
    EngineState, IntentPatch, LoadCompletionListener, MediaEngine, MediaEngineFactory,
    PlaybackError, PlaybackIntent, PlayerStatus, Result, StatusDispatcher, StatusEvent,
    StatusListener, StatusSnapshot, SurfaceHandle, VideoGeometry,
};
use std::collections::VecDeque;
use std::sync::{Arc, Weak};

/// Externally visible controller phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    Unloaded,
    Loading,
    /// Loaded, waiting for data
    Buffering,
    /// Loaded and able to render
    Active,
    /// Loaded, reached the end of the media
    Ended,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Unloaded,
    Loading,
    Ready,
    Released,
}

struct ControllerState {
    lifecycle: Lifecycle,
    engine: Option<Box<dyn MediaEngine>>,
    intent: PlaybackIntent,
    pending_load: Option<Box<dyn LoadCompletionListener>>,
    /// Intent waiting for load completion (`apply_intent_on_prepare == false`)
    intent_deferred: bool,
    last_playback_state: Option<EngineState>,
    is_loading: bool,
    first_frame_rendered: bool,
    video_geometry: Option<VideoGeometry>,
    reported_geometry: Option<VideoGeometry>,
    progress: ProgressLoop,
}

impl ControllerState {
    fn new() -> Self {
        Self {
            lifecycle: Lifecycle::Unloaded,
            engine: None,
            intent: PlaybackIntent::default(),
            pending_load: None,
            intent_deferred: false,
            last_playback_state: None,
            is_loading: false,
            first_frame_rendered: false,
            video_geometry: None,
            reported_geometry: None,
            progress: ProgressLoop::new(),
        }
    }

    fn ensure_ready(&self) -> Result<()> {
        match (self.lifecycle, &self.engine) {
            (Lifecycle::Ready, Some(_)) => Ok(()),
            _ => Err(PlaybackError::EngineNotReady),
        }
    }

    fn snapshot(&self) -> Option<StatusSnapshot> {
        let engine = self.engine.as_deref()?;
        Some(StatusSnapshot::derive(
            &EngineReadings::read(engine),
            &self.intent,
            self.is_loading,
            engine.implementation_name(),
        ))
    }

    /// Pause the engine and stop progress reporting, leaving intent untouched
    fn pause(&mut self) {
        if let Some(engine) = self.engine.as_mut() {
            engine.set_play_when_ready(false);
        }
        self.progress.stop();
    }
}

enum Notice {
    Status(StatusEvent),
    /// Tick from the given progress loop generation
    Progress(u64, StatusSnapshot),
    LoadSucceeded(Box<dyn LoadCompletionListener>, StatusSnapshot),
    LoadFailed(Box<dyn LoadCompletionListener>, String),
    ReleaseFocus,
}

/// Notifications produced under the state lock, delivered after it
struct Outbox(Vec<Notice>);

impl Outbox {
    fn new() -> Self {
        Self(Vec::new())
    }

    fn status(&mut self, snapshot: Option<StatusSnapshot>) {
        if let Some(snapshot) = snapshot {
            self.0.push(Notice::Status(StatusEvent::StatusUpdate(snapshot)));
        }
    }

    fn push(&mut self, notice: Notice) {
        self.0.push(notice);
    }
}

/// Routes events from one engine into its controller's mailbox
struct ControllerSink {
    controller: Weak<PlaybackController>,
}

impl EngineEventSink for ControllerSink {
    fn emit(&self, event: EngineEvent) {
        match self.controller.upgrade() {
            Some(controller) => controller.enqueue_event(event),
            None => log::debug!("Dropping engine event for dropped controller: {:?}", event),
        }
    }
}

/// Playback status synchronization controller, bound to one media identifier
pub struct PlaybackController {
    media_ref: String,
    config: ControllerConfig,
    factory: Arc<dyn MediaEngineFactory>,
    focus: Arc<dyn AudioFocusCoordinator>,
    dispatcher: StatusDispatcher,
    state: Mutex<ControllerState>,
    mailbox: Mutex<VecDeque<EngineEvent>>,
    notices: Mutex<VecDeque<Notice>>,
    /// Held while calling listeners; reentrant so listeners may call back in
    delivery: ReentrantMutex<()>,
    self_ref: Weak<PlaybackController>,
}

impl PlaybackController {
    pub fn new(
        media_ref: impl Into<String>,
        factory: Arc<dyn MediaEngineFactory>,
        focus: Arc<dyn AudioFocusCoordinator>,
        config: ControllerConfig,
    ) -> Arc<Self> {
        let media_ref = media_ref.into();
        log::info!("PlaybackController::new for {}", media_ref);
        Arc::new_cyclic(|self_ref| Self {
            media_ref,
            config,
            factory,
            focus,
            dispatcher: StatusDispatcher::new(),
            state: Mutex::new(ControllerState::new()),
            mailbox: Mutex::new(VecDeque::new()),
            notices: Mutex::new(VecDeque::new()),
            delivery: ReentrantMutex::new(()),
            self_ref: self_ref.clone(),
        })
    }

    pub fn media_ref(&self) -> &str {
        &self.media_ref
    }

    /// Replace all status listeners with `listener`, throttled per config
    pub fn set_status_listener(&self, listener: Option<Arc<dyn StatusListener>>) {
        self.dispatcher.clear_listeners();
        if let Some(listener) = listener {
            self.dispatcher
                .add_listener(listener, self.config.status_throttle_ms);
        }
    }

    pub fn add_status_listener(&self, listener: Arc<dyn StatusListener>, throttle_ms: u64) {
        self.dispatcher.add_listener(listener, throttle_ms);
    }

    // Lifecycle

    /// Create and prepare the engine. The outcome is reported only through
    /// `completion`, exactly once.
    pub fn load(&self, intent: PlaybackIntent, completion: Box<dyn LoadCompletionListener>) {
        self.with_state(|st, out| {
            match st.lifecycle {
                Lifecycle::Unloaded => {}
                Lifecycle::Released => {
                    log::warn!("load ignored, controller for {} is released", self.media_ref);
                    return;
                }
                Lifecycle::Loading | Lifecycle::Ready => {
                    log::warn!("load called twice for {}", self.media_ref);
                    out.push(Notice::LoadFailed(
                        completion,
                        "Controller is already loaded".to_string(),
                    ));
                    return;
                }
            }

            if let Err(e) = intent.validate() {
                log::error!("Rejected initial intent for {}: {}", self.media_ref, e);
                out.push(Notice::LoadFailed(completion, e.to_string()));
                self.release_locked(st, out);
                return;
            }

            log::info!("Loading {}", self.media_ref);
            let sink: Arc<dyn EngineEventSink> = Arc::new(ControllerSink {
                controller: self.self_ref.clone(),
            });
            let engine = self.factory.create_engine(&self.media_ref, sink);

            st.intent = intent;
            st.pending_load = Some(completion);
            st.lifecycle = Lifecycle::Loading;
            st.is_loading = true;
            st.engine.insert(engine).prepare(&self.media_ref);

            if self.config.apply_intent_on_prepare {
                self.apply_initial_intent(st);
            } else {
                st.intent_deferred = true;
            }
        });
    }

    /// Idempotent. Drops any pending load completion without firing it.
    pub fn release(&self) {
        self.with_state(|st, out| self.release_locked(st, out));
    }

    // Set status

    /// Merge `patch` into the intent and reconcile the engine against it.
    /// On `FocusDenied` the intent is still updated, only playback is withheld.
    pub fn set_status(&self, patch: IntentPatch) -> Result<StatusSnapshot> {
        self.with_state(|st, out| {
            st.ensure_ready()?;
            st.intent = st.intent.merged(&patch)?;

            let applied = self.apply_intent_locked(st, patch.position_ms, patch.is_looping);
            let snapshot = st.snapshot();
            out.status(snapshot.clone());
            applied?;
            snapshot.ok_or(PlaybackError::EngineNotReady)
        })
    }

    /// Re-apply the stored intent, optionally seeking and changing looping
    pub fn apply_intent(&self, position_ms: Option<i64>, is_looping: Option<bool>) -> Result<()> {
        if let Some(position) = position_ms {
            IntentPatch::new().position(position).validate()?;
        }
        self.with_state(|st, out| {
            st.ensure_ready()?;
            let applied = self.apply_intent_locked(st, position_ms, is_looping);
            out.status(st.snapshot());
            applied
        })
    }

    /// Start playback if the intent asks for it and focus allows it
    pub fn play_if_eligible(&self) -> Result<()> {
        self.with_state(|st, out| {
            st.ensure_ready()?;
            let played = self.play_if_eligible_locked(st);
            out.status(st.snapshot());
            played
        })
    }

    /// Emergency stop; `should_play` stays as the consumer set it
    pub fn pause_immediately(&self) {
        self.with_state(|st, out| {
            log::debug!("Pausing {} immediately", self.media_ref);
            st.pause();
            if st.ensure_ready().is_ok() {
                out.status(st.snapshot());
            }
        });
    }

    // Get status

    pub fn current_snapshot(&self) -> Result<StatusSnapshot> {
        self.with_state(|st, _| {
            st.ensure_ready()?;
            st.snapshot().ok_or(PlaybackError::EngineNotReady)
        })
    }

    pub fn status(&self) -> PlayerStatus {
        self.current_snapshot()
            .map(PlayerStatus::Loaded)
            .unwrap_or(PlayerStatus::Unloaded)
    }

    pub fn intent(&self) -> PlaybackIntent {
        self.state.lock().intent
    }

    pub fn phase(&self) -> ControllerPhase {
        let st = self.state.lock();
        match st.lifecycle {
            Lifecycle::Unloaded => ControllerPhase::Unloaded,
            Lifecycle::Loading => ControllerPhase::Loading,
            Lifecycle::Released => ControllerPhase::Released,
            Lifecycle::Ready => match st.engine.as_ref().map(|e| e.playback_state()) {
                Some(EngineState::Ended) => ControllerPhase::Ended,
                Some(EngineState::Buffering) => ControllerPhase::Buffering,
                _ if st.is_loading => ControllerPhase::Buffering,
                _ => ControllerPhase::Active,
            },
        }
    }

    pub fn is_progress_running(&self) -> bool {
        self.state.lock().progress.is_running()
    }

    // Video specific stuff

    pub fn video_geometry(&self) -> VideoGeometry {
        self.state.lock().video_geometry.unwrap_or_default()
    }

    pub fn attach_surface(&self, surface: Option<SurfaceHandle>) {
        self.with_state(|st, _| {
            if let Some(engine) = st.engine.as_mut() {
                engine.attach_surface(surface);
            }
        });
    }

    pub fn audio_session_id(&self) -> i32 {
        self.state
            .lock()
            .engine
            .as_ref()
            .map_or(0, |engine| engine.audio_session_id())
    }

    pub fn implementation_name(&self) -> Option<&'static str> {
        self.state
            .lock()
            .engine
            .as_ref()
            .map(|engine| engine.implementation_name())
    }

    // Serialization

    fn with_state<R>(&self, f: impl FnOnce(&mut ControllerState, &mut Outbox) -> R) -> R {
        let mut outbox = Outbox::new();
        let result = {
            let mut state = self.state.lock();
            let result = f(&mut state, &mut outbox);
            self.notices.lock().extend(outbox.0);
            result
        };
        self.deliver_pending();
        self.pump();
        result
    }

    fn enqueue_event(&self, event: EngineEvent) {
        self.mailbox.lock().push_back(event);
        self.pump();
    }

    /// Drain the mailbox if the state lock is free. A holder of the lock
    /// always pumps after releasing it, so no event is stranded.
    fn pump(&self) {
        loop {
            if self.mailbox.lock().is_empty() {
                return;
            }

            {
                let Some(mut state) = self.state.try_lock() else {
                    return;
                };
                let mut outbox = Outbox::new();
                loop {
                    let next = self.mailbox.lock().pop_front();
                    match next {
                        Some(event) => self.handle_event(&mut state, &mut outbox, event),
                        None => break,
                    }
                }
                self.notices.lock().extend(outbox.0);
            }
            self.deliver_pending();
        }
    }

    /// Deliver queued notices in order. Never called with the state lock held.
    fn deliver_pending(&self) {
        let _delivery = self.delivery.lock();
        loop {
            let next = self.notices.lock().pop_front();
            let Some(notice) = next else {
                return;
            };
            match notice {
                Notice::Status(event) => self.dispatcher.dispatch(event),
                Notice::Progress(generation, snapshot) => {
                    // Superseded by a stop queued after it
                    if self.state.lock().progress.is_current(generation) {
                        self.dispatcher
                            .dispatch(StatusEvent::ProgressUpdate(snapshot));
                    } else {
                        log::trace!("Dropping stale progress tick {}", generation);
                    }
                }
                Notice::LoadSucceeded(listener, status) => listener.on_load_success(status),
                Notice::LoadFailed(listener, message) => listener.on_load_error(message),
                Notice::ReleaseFocus => self.focus.release(),
            }
        }
    }

    // Reconciliation

    fn apply_initial_intent(&self, st: &mut ControllerState) {
        if let Err(e) = self.apply_intent_locked(st, None, None) {
            log::warn!("Initial intent for {} not applied: {}", self.media_ref, e);
        }
    }

    fn apply_intent_locked(
        &self,
        st: &mut ControllerState,
        position_ms: Option<i64>,
        is_looping: Option<bool>,
    ) -> Result<()> {
        if st.engine.is_none() {
            return Err(PlaybackError::EngineNotReady);
        }

        if let Some(looping) = is_looping {
            st.intent.is_looping = looping;
        }

        // Pause before seeking so a stale play state is never observed mid-seek
        if !st.intent.should_play {
            st.pause();
        }

        // Mute / volume never needs focus
        self.update_volume_locked(st);

        if let Some(position) = position_ms {
            if let Some(engine) = st.engine.as_mut() {
                log::debug!("Seeking {} to {} ms", self.media_ref, position);
                engine.seek_to(position);
            }
        }

        self.play_if_eligible_locked(st)
    }

    fn play_if_eligible_locked(&self, st: &mut ControllerState) -> Result<()> {
        if st.engine.is_none() || !st.intent.should_play {
            return Ok(());
        }

        if self.focus.is_focus_required(&st.intent) {
            if let Err(denied) = self.focus.acquire() {
                log::warn!("{} for {}", denied, self.media_ref);
                st.pause();
                return Err(denied.into());
            }
        }

        self.update_volume_locked(st);

        let intent = st.intent;
        if let Some(engine) = st.engine.as_mut() {
            let correct_pitch = intent.should_correct_pitch && engine.supports_pitch_correction();
            if intent.should_correct_pitch && !correct_pitch {
                log::debug!("Pitch correction unsupported, pitch follows rate {}", intent.rate);
            }
            engine.set_rate(intent.rate, correct_pitch);
            engine.set_play_when_ready(true);
        }

        self.start_progress_locked(st);
        Ok(())
    }

    fn update_volume_locked(&self, st: &mut ControllerState) {
        let volume = self
            .focus
            .effective_volume(st.intent.is_muted, st.intent.volume);
        if let Some(engine) = st.engine.as_mut() {
            engine.set_volume(volume);
        }
    }

    fn start_progress_locked(&self, st: &mut ControllerState) {
        let interval_ms = self
            .config
            .effective_progress_interval(st.intent.progress_update_interval_ms);
        if st.progress.is_running() && st.progress.interval_ms() != interval_ms {
            st.progress.stop();
        }
        let controller = self.self_ref.clone();
        st.progress
            .start(interval_ms, &self.config.progress_thread_name, move |generation| {
                match controller.upgrade() {
                    Some(controller) => controller.progress_tick(generation),
                    None => false,
                }
            });
    }

    fn progress_tick(&self, generation: u64) -> bool {
        self.with_state(|st, out| {
            if !st.progress.is_current(generation) {
                return false;
            }
            let playing = st
                .engine
                .as_ref()
                .map_or(false, |engine| engine.play_when_ready());
            if !playing {
                st.progress.stop();
                return false;
            }
            if let Some(snapshot) = st.snapshot() {
                out.push(Notice::Progress(generation, snapshot));
            }
            true
        })
    }

    fn release_locked(&self, st: &mut ControllerState, out: &mut Outbox) {
        if st.lifecycle == Lifecycle::Released {
            return;
        }

        log::info!("Releasing controller for {}", self.media_ref);
        st.progress.stop();
        if let Some(mut engine) = st.engine.take() {
            engine.release();
        }
        if st.pending_load.take().is_some() {
            log::debug!("Dropped pending load completion for {}", self.media_ref);
        }
        st.intent_deferred = false;
        st.lifecycle = Lifecycle::Released;
        out.push(Notice::ReleaseFocus);
    }

    // Engine events

    fn handle_event(&self, st: &mut ControllerState, out: &mut Outbox, event: EngineEvent) {
        if st.lifecycle == Lifecycle::Released {
            log::debug!("Ignoring {:?} after release", event);
            return;
        }

        match event {
            EngineEvent::LoadingChanged { is_loading } => {
                self.on_loading_changed(st, out, is_loading)
            }
            EngineEvent::PlayerStateChanged {
                play_when_ready,
                state,
            } => self.on_player_state_changed(st, out, play_when_ready, state),
            EngineEvent::LoadError { message } => self.on_load_error(st, out, message),
            EngineEvent::VideoSizeChanged { width, height, .. } => {
                self.on_video_size_changed(st, out, VideoGeometry::new(width, height))
            }
            EngineEvent::RenderedFirstFrame => self.on_rendered_first_frame(st, out),
            other => log::debug!("Ignoring engine event {:?}", other),
        }
    }

    fn on_loading_changed(&self, st: &mut ControllerState, out: &mut Outbox, is_loading: bool) {
        st.is_loading = is_loading;

        if !is_loading {
            if let Some(listener) = st.pending_load.take() {
                log::info!("Loaded {}", self.media_ref);
                st.lifecycle = Lifecycle::Ready;
                if st.intent_deferred {
                    st.intent_deferred = false;
                    self.apply_initial_intent(st);
                }
                if let Some(snapshot) = st.snapshot() {
                    out.push(Notice::LoadSucceeded(listener, snapshot));
                }
            }
        }

        out.status(st.snapshot());
    }

    fn on_player_state_changed(
        &self,
        st: &mut ControllerState,
        out: &mut Outbox,
        play_when_ready: bool,
        state: EngineState,
    ) {
        log::debug!(
            "{} player state {:?} (play_when_ready={})",
            self.media_ref,
            state,
            play_when_ready
        );

        let entered_end =
            state == EngineState::Ended && st.last_playback_state != Some(EngineState::Ended);
        st.last_playback_state = Some(state);

        if !entered_end {
            out.status(st.snapshot());
            return;
        }

        if let Some(snapshot) = st.snapshot() {
            out.push(Notice::Status(StatusEvent::DidJustFinish(
                snapshot.with_did_just_finish(),
            )));
        }

        if st.intent.is_looping {
            log::debug!("Restarting {} from the beginning", self.media_ref);
            match self.apply_intent_locked(st, Some(0), None) {
                Ok(()) => {}
                // Focus state is unchanged by a loop restart
                Err(PlaybackError::FocusDenied(reason)) => {
                    log::warn!("Loop restart of {} without focus: {}", self.media_ref, reason)
                }
                Err(e) => log::warn!("Loop restart of {} failed: {}", self.media_ref, e),
            }
        }
    }

    fn on_load_error(&self, st: &mut ControllerState, out: &mut Outbox, message: String) {
        log::error!("Load error for {}: {}", self.media_ref, message);
        if let Some(listener) = st.pending_load.take() {
            out.push(Notice::LoadFailed(listener, message));
        }
        self.release_locked(st, out);
    }

    fn on_video_size_changed(
        &self,
        st: &mut ControllerState,
        out: &mut Outbox,
        geometry: VideoGeometry,
    ) {
        st.video_geometry = Some(geometry);
        if st.first_frame_rendered && st.reported_geometry != Some(geometry) {
            st.reported_geometry = Some(geometry);
            out.push(Notice::Status(StatusEvent::VideoGeometryUpdate(geometry)));
        }
    }

    fn on_rendered_first_frame(&self, st: &mut ControllerState, out: &mut Outbox) {
        if !st.first_frame_rendered {
            if let Some(geometry) = st.video_geometry {
                st.reported_geometry = Some(geometry);
                out.push(Notice::Status(StatusEvent::VideoGeometryUpdate(geometry)));
            }
        }
        st.first_frame_rendered = true;
    }
}

impl AudioEventHandler for PlaybackController {
    fn pause_immediately(&self) {
        PlaybackController::pause_immediately(self);
    }

    fn requires_audio_focus(&self) -> bool {
        let st = self.state.lock();
        match st.engine.as_ref() {
            Some(engine) => {
                (engine.play_when_ready() || st.intent.should_play) && !st.intent.is_muted
            }
            None => false,
        }
    }

    fn update_volume_mute_and_duck(&self) {
        self.with_state(|st, _| self.update_volume_locked(st));
    }

    fn play_if_eligible(&self) -> Result<()> {
        PlaybackController::play_if_eligible(self)
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        let st = self.state.get_mut();
        st.progress.stop();
        if let Some(mut engine) = st.engine.take() {
            log::debug!("Releasing engine for dropped controller {}", self.media_ref);
            engine.release();
        }
    }
}
