// Controller configuration

/// Shortest progress interval honored; faster requests are raised to it
pub const MIN_PROGRESS_INTERVAL_MS: u64 = 16;

/// Throttle applied to listeners registered without an explicit one
pub const DEFAULT_STATUS_THROTTLE_MS: u64 = 0;

/// Name given to progress loop threads
pub const PROGRESS_THREAD_NAME: &str = "podium-av-progress";

#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    pub min_progress_interval_ms: u64,
    pub status_throttle_ms: u64,
    pub progress_thread_name: String,
    /// Apply the load intent right after `prepare` instead of waiting
    /// for the first loading-complete event
    pub apply_intent_on_prepare: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            min_progress_interval_ms: MIN_PROGRESS_INTERVAL_MS,
            status_throttle_ms: DEFAULT_STATUS_THROTTLE_MS,
            progress_thread_name: PROGRESS_THREAD_NAME.to_string(),
            apply_intent_on_prepare: true,
        }
    }
}

impl ControllerConfig {
    pub fn with_min_progress_interval(mut self, interval_ms: u64) -> Self {
        self.min_progress_interval_ms = interval_ms.max(1);
        self
    }

    pub fn with_status_throttle(mut self, throttle_ms: u64) -> Self {
        self.status_throttle_ms = throttle_ms;
        self
    }

    pub fn with_progress_thread_name(mut self, name: impl Into<String>) -> Self {
        self.progress_thread_name = name.into();
        self
    }

    pub fn with_apply_intent_on_prepare(mut self, apply: bool) -> Self {
        self.apply_intent_on_prepare = apply;
        self
    }

    /// Interval actually used for a requested one
    pub fn effective_progress_interval(&self, requested_ms: u64) -> u64 {
        requested_ms.max(self.min_progress_interval_ms)
    }
}
