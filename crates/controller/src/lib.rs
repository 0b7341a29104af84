// Podium playback status synchronization
// Drives a media engine from a consumer's playback intent and reports
// derived status snapshots back to registered listeners.

pub mod arbiter;
pub mod config;
pub mod controller;
mod progress;
pub mod registry;

#[cfg(test)]
mod testing;

// Re-exports
pub use arbiter::{FocusArbiter, FocusState, DEFAULT_DUCK_VOLUME};
pub use config::{ControllerConfig, MIN_PROGRESS_INTERVAL_MS};
pub use controller::{ControllerPhase, PlaybackController};
pub use registry::{lookup_controller, register_controller, release_controller, with_controller};

pub use podium_av_core::*;

use std::sync::{Arc, Once};

static INIT_LOGGER: Once = Once::new();

/// Environment variable read for the log filter on desktop targets
pub const LOG_ENV: &str = "PODIUM_AV_LOG";

// Initialize logging based on platform
pub fn init_logging() {
    INIT_LOGGER.call_once(|| {
        #[cfg(target_os = "android")]
        {
            android_logger::init_once(
                android_logger::Config::default()
                    .with_max_level(log::LevelFilter::Debug)
                    .with_tag("PodiumAV"),
            );
        }

        #[cfg(not(target_os = "android"))]
        {
            // Another logger may already be installed by the host
            let _ = env_logger::Builder::from_env(env_logger::Env::new().filter_or(LOG_ENV, "info"))
                .is_test(false)
                .try_init();
        }
    });
}

/// Create a controller with default configuration for `media_ref`
pub fn create_controller(
    media_ref: impl Into<String>,
    factory: Arc<dyn MediaEngineFactory>,
    focus: Arc<dyn AudioFocusCoordinator>,
) -> Arc<PlaybackController> {
    init_logging();
    PlaybackController::new(media_ref, factory, focus, ControllerConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeFactory, MEDIA};

    #[test]
    fn test_create_controller_starts_unloaded() {
        let (factory, _engine) = FakeFactory::new();
        let controller = create_controller(MEDIA, factory, Arc::new(AlwaysGranted));
        assert_eq!(controller.phase(), ControllerPhase::Unloaded);
        assert_eq!(controller.media_ref(), MEDIA);
        assert_eq!(controller.status(), PlayerStatus::Unloaded);
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging();
        init_logging();
    }
}
