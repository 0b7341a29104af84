// Periodic progress reporting
// The loop thread never touches controller state directly: each tick calls
// back into the controller, which checks the generation under its own lock,
// so a tick racing a stop never publishes.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

pub(crate) struct ProgressLoop {
    generation: u64,
    stop_tx: Option<Sender<()>>,
    interval_ms: u64,
}

impl ProgressLoop {
    pub(crate) fn new() -> Self {
        Self {
            generation: 0,
            stop_tx: None,
            interval_ms: 0,
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.stop_tx.is_some()
    }

    pub(crate) fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Whether a tick from `generation` belongs to the live loop
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.is_running() && self.generation == generation
    }

    /// Start ticking every `interval_ms`. No-op when already running.
    /// `tick` returns false to end the loop.
    pub(crate) fn start<F>(&mut self, interval_ms: u64, thread_name: &str, tick: F) -> bool
    where
        F: Fn(u64) -> bool + Send + 'static,
    {
        if self.is_running() {
            return false;
        }

        self.generation += 1;
        let generation = self.generation;
        let interval = Duration::from_millis(interval_ms);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let spawned = thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || {
                log::debug!("Progress loop {} started ({} ms)", generation, interval_ms);
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            if !tick(generation) {
                                break;
                            }
                        }
                        // Stop signal or sender dropped
                        _ => break,
                    }
                }
                log::debug!("Progress loop {} exited", generation);
            });

        match spawned {
            Ok(_) => {
                self.stop_tx = Some(stop_tx);
                self.interval_ms = interval_ms;
                true
            }
            Err(e) => {
                log::error!("Failed to spawn progress loop: {}", e);
                false
            }
        }
    }

    /// Stop ticking. No-op when not running; never joins the thread.
    pub(crate) fn stop(&mut self) -> bool {
        match self.stop_tx.take() {
            Some(stop_tx) => {
                let _ = stop_tx.send(());
                log::debug!("Progress loop {} stopped", self.generation);
                true
            }
            None => false,
        }
    }
}

impl Drop for ProgressLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
