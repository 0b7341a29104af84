// Status notification and one-shot load completion
// Status listeners can be throttled so periodic progress updates don't
// flood a bridge to a remote consumer.

use crate::status::{StatusSnapshot, VideoGeometry};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Status consumer event types
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    /// Status change caused by an engine event or a consumer command
    StatusUpdate(StatusSnapshot),

    /// Periodic position report while playing
    ProgressUpdate(StatusSnapshot),

    /// Natural end of media; repeats across loop restarts
    DidJustFinish(StatusSnapshot),

    /// Video size, only reported once the first frame is visible
    VideoGeometryUpdate(VideoGeometry),
}

/// Status listener trait
/// Implementations should be lightweight and non-blocking
pub trait StatusListener: Send + Sync {
    fn on_event(&self, event: StatusEvent);
}

/// Throttled listener wrapper
/// Drops progress updates arriving closer together than the interval.
/// State changes, finish and geometry notifications always pass.
pub struct ThrottledStatusListener {
    inner: Arc<dyn StatusListener>,
    last_progress_update: Mutex<Option<Instant>>,
    progress_update_interval: Duration,
}

impl ThrottledStatusListener {
    pub fn new(listener: Arc<dyn StatusListener>, update_interval_ms: u64) -> Self {
        Self {
            inner: listener,
            last_progress_update: Mutex::new(None),
            progress_update_interval: Duration::from_millis(update_interval_ms),
        }
    }
}

impl StatusListener for ThrottledStatusListener {
    fn on_event(&self, event: StatusEvent) {
        if let StatusEvent::ProgressUpdate(_) = &event {
            let mut last_update = self.last_progress_update.lock();
            if let Some(last) = *last_update {
                if last.elapsed() < self.progress_update_interval {
                    return;
                }
            }
            *last_update = Some(Instant::now());
        }
        self.inner.on_event(event);
    }
}

/// Fan-out to every registered status listener
pub struct StatusDispatcher {
    listeners: Mutex<Vec<Arc<dyn StatusListener>>>,
}

impl StatusDispatcher {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// `throttle_ms == 0` registers the listener unthrottled
    pub fn add_listener(&self, listener: Arc<dyn StatusListener>, throttle_ms: u64) {
        let listener: Arc<dyn StatusListener> = if throttle_ms > 0 {
            Arc::new(ThrottledStatusListener::new(listener, throttle_ms))
        } else {
            listener
        };
        self.listeners.lock().push(listener);
    }

    pub fn clear_listeners(&self) {
        self.listeners.lock().clear();
    }

    pub fn has_listeners(&self) -> bool {
        !self.listeners.lock().is_empty()
    }

    pub fn dispatch(&self, event: StatusEvent) {
        // Listeners may re-enter the dispatcher
        let listeners = self.listeners.lock().clone();
        for listener in listeners.iter() {
            listener.on_event(event.clone());
        }
    }
}

impl Default for StatusDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-use load outcome handle.
/// Both methods consume the listener, so it can only ever fire once.
pub trait LoadCompletionListener: Send {
    fn on_load_success(self: Box<Self>, status: StatusSnapshot);

    fn on_load_error(self: Box<Self>, message: String);
}

/// Closure-backed load completion
pub struct LoadCompletion<S, E> {
    on_success: S,
    on_error: E,
}

impl<S, E> LoadCompletionListener for LoadCompletion<S, E>
where
    S: FnOnce(StatusSnapshot) + Send,
    E: FnOnce(String) + Send,
{
    fn on_load_success(self: Box<Self>, status: StatusSnapshot) {
        let this = *self;
        (this.on_success)(status)
    }

    fn on_load_error(self: Box<Self>, message: String) {
        let this = *self;
        (this.on_error)(message)
    }
}

pub fn load_completion<S, E>(on_success: S, on_error: E) -> Box<dyn LoadCompletionListener>
where
    S: FnOnce(StatusSnapshot) + Send + 'static,
    E: FnOnce(String) + Send + 'static,
{
    Box::new(LoadCompletion {
        on_success,
        on_error,
    })
}

/// Simple listener implementation for testing
#[cfg(test)]
pub struct TestListener {
    events: Mutex<Vec<StatusEvent>>,
}

#[cfg(test)]
impl TestListener {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn get_events(&self) -> Vec<StatusEvent> {
        self.events.lock().clone()
    }
}

#[cfg(test)]
impl StatusListener for TestListener {
    fn on_event(&self, event: StatusEvent) {
        self.events.lock().push(event);
    }
}
