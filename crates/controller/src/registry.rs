// Process-wide controller registry
// Hosts that can only pass integers across their boundary address
// controllers by key. Controllers are cloned out of the map before use so
// the registry lock is never held across a controller call.

use crate::controller::PlaybackController;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use podium_av_core::{PlaybackError, Result};
use std::collections::HashMap;
use std::sync::Arc;

static CONTROLLER_REGISTRY: Lazy<Mutex<HashMap<i64, Arc<PlaybackController>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));
static NEXT_CONTROLLER_KEY: Lazy<Mutex<i64>> = Lazy::new(|| Mutex::new(1));

pub fn register_controller(controller: Arc<PlaybackController>) -> i64 {
    crate::init_logging();
    let mut next = NEXT_CONTROLLER_KEY.lock();
    let key = *next;
    *next += 1;
    drop(next);

    log::debug!("Registered controller {} for {}", key, controller.media_ref());
    CONTROLLER_REGISTRY.lock().insert(key, controller);
    key
}

pub fn lookup_controller(key: i64) -> Result<Arc<PlaybackController>> {
    CONTROLLER_REGISTRY
        .lock()
        .get(&key)
        .cloned()
        .ok_or(PlaybackError::UnknownController(key))
}

pub fn with_controller<R>(
    key: i64,
    f: impl FnOnce(&PlaybackController) -> Result<R>,
) -> Result<R> {
    let controller = lookup_controller(key)?;
    f(&controller)
}

/// Remove and release. Returns false for an unknown key.
pub fn release_controller(key: i64) -> bool {
    let removed = CONTROLLER_REGISTRY.lock().remove(&key);
    match removed {
        Some(controller) => {
            controller.release();
            true
        }
        None => {
            log::warn!("release_controller: unknown key {}", key);
            false
        }
    }
}
