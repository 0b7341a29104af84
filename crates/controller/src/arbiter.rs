// In-process audio focus arbiter
//
// Hosts forward platform focus changes here; the arbiter answers controller
// focus requests and pauses, ducks or resumes every registered controller.
// Clients are only ever called with the arbiter lock released.

use crate::controller::PlaybackController;
use parking_lot::Mutex;
use podium_av_core::{AudioEventHandler, AudioFocusCoordinator, FocusDenied};
use std::sync::{Arc, Weak};

/// Volume multiplier applied while another source ducks us
pub const DEFAULT_DUCK_VOLUME: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusState {
    /// Nobody holds focus; the next request is granted
    Abandoned,
    Granted,
    /// Granted at reduced volume
    Ducked,
    /// Lost for a while; requests are denied until regained
    Interrupted,
}

struct ArbiterState {
    focus: FocusState,
    clients: Vec<Weak<dyn AudioEventHandler>>,
}

pub struct FocusArbiter {
    state: Mutex<ArbiterState>,
    duck_volume: f32,
}

impl FocusArbiter {
    pub fn new() -> Arc<Self> {
        Self::with_duck_volume(DEFAULT_DUCK_VOLUME)
    }

    pub fn with_duck_volume(duck_volume: f32) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ArbiterState {
                focus: FocusState::Abandoned,
                clients: Vec::new(),
            }),
            duck_volume: duck_volume.clamp(0.0, 1.0),
        })
    }

    pub fn focus_state(&self) -> FocusState {
        self.state.lock().focus
    }

    /// Track a controller for focus changes. Only a weak reference is kept.
    pub fn register(&self, controller: &Arc<PlaybackController>) {
        let controller: Arc<dyn AudioEventHandler> = controller.clone();
        let mut state = self.state.lock();
        state.clients.retain(|client| client.strong_count() > 0);
        state.clients.push(Arc::downgrade(&controller));
    }

    pub fn client_count(&self) -> usize {
        self.live_clients().len()
    }

    /// Platform took focus away. Every client is paused.
    pub fn on_focus_lost(&self, transient: bool) {
        let focus = if transient {
            FocusState::Interrupted
        } else {
            FocusState::Abandoned
        };
        log::info!("Audio focus lost, now {:?}", focus);
        self.state.lock().focus = focus;

        for client in self.live_clients() {
            client.pause_immediately();
        }
    }

    /// Another source plays over us at low volume
    pub fn on_duck(&self) {
        log::info!("Audio focus ducked to {}", self.duck_volume);
        self.state.lock().focus = FocusState::Ducked;

        for client in self.live_clients() {
            client.update_volume_mute_and_duck();
        }
    }

    /// Focus is back. Volumes are restored and clients that still want to
    /// play resume.
    pub fn on_focus_regained(&self) {
        log::info!("Audio focus regained");
        self.state.lock().focus = FocusState::Granted;

        for client in self.live_clients() {
            client.update_volume_mute_and_duck();
            if client.requires_audio_focus() {
                if let Err(e) = client.play_if_eligible() {
                    log::warn!("Resume after focus regain failed: {}", e);
                }
            }
        }
    }

    fn live_clients(&self) -> Vec<Arc<dyn AudioEventHandler>> {
        self.state
            .lock()
            .clients
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }
}

impl AudioFocusCoordinator for FocusArbiter {
    fn acquire(&self) -> Result<(), FocusDenied> {
        let mut state = self.state.lock();
        match state.focus {
            FocusState::Interrupted => Err(FocusDenied::new("focus is held by another source")),
            FocusState::Abandoned => {
                log::debug!("Audio focus granted");
                state.focus = FocusState::Granted;
                Ok(())
            }
            FocusState::Granted | FocusState::Ducked => Ok(()),
        }
    }

    fn release(&self) {
        if self
            .live_clients()
            .iter()
            .any(|client| client.requires_audio_focus())
        {
            return;
        }

        let mut state = self.state.lock();
        if matches!(state.focus, FocusState::Granted | FocusState::Ducked) {
            log::debug!("Audio focus abandoned");
            state.focus = FocusState::Abandoned;
        }
    }

    fn effective_volume(&self, is_muted: bool, volume: f32) -> f32 {
        if is_muted {
            return 0.0;
        }
        match self.state.lock().focus {
            FocusState::Ducked => volume * self.duck_volume,
            _ => volume,
        }
    }
}
