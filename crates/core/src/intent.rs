// Consumer-desired playback configuration

use crate::error::{PlaybackError, Result};

/// Default progress update interval (milliseconds)
pub const DEFAULT_PROGRESS_UPDATE_INTERVAL_MS: u64 = 500;

/// What the consumer wants the player to do.
/// Only mutated through "set status" calls; the controller reconciles the
/// engine against it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackIntent {
    pub should_play: bool,
    /// Playback speed (1.0 = normal speed), must be > 0
    pub rate: f32,
    pub should_correct_pitch: bool,
    /// Volume (0.0 - 1.0)
    pub volume: f32,
    pub is_muted: bool,
    pub is_looping: bool,
    pub progress_update_interval_ms: u64,
}

impl Default for PlaybackIntent {
    fn default() -> Self {
        Self {
            should_play: false,
            rate: 1.0,
            should_correct_pitch: false,
            volume: 1.0,
            is_muted: false,
            is_looping: false,
            progress_update_interval_ms: DEFAULT_PROGRESS_UPDATE_INTERVAL_MS,
        }
    }
}

impl PlaybackIntent {
    pub fn validate(&self) -> Result<()> {
        validate_rate(self.rate)?;
        validate_volume(self.volume)?;
        validate_interval(self.progress_update_interval_ms)
    }

    /// Merge a patch into a copy of this intent.
    /// Nothing is returned unless every field in the patch is valid.
    pub fn merged(&self, patch: &IntentPatch) -> Result<PlaybackIntent> {
        patch.validate()?;

        let mut next = *self;
        if let Some(should_play) = patch.should_play {
            next.should_play = should_play;
        }
        if let Some(rate) = patch.rate {
            next.rate = rate;
        }
        if let Some(correct) = patch.should_correct_pitch {
            next.should_correct_pitch = correct;
        }
        if let Some(volume) = patch.volume {
            next.volume = volume;
        }
        if let Some(muted) = patch.is_muted {
            next.is_muted = muted;
        }
        if let Some(looping) = patch.is_looping {
            next.is_looping = looping;
        }
        if let Some(interval) = patch.progress_update_interval_ms {
            next.progress_update_interval_ms = interval;
        }
        Ok(next)
    }
}

/// Partial "set status" request. Every field is optional; `position_ms`
/// is a seek target rather than part of the stored intent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IntentPatch {
    pub should_play: Option<bool>,
    pub rate: Option<f32>,
    pub should_correct_pitch: Option<bool>,
    pub volume: Option<f32>,
    pub is_muted: Option<bool>,
    pub is_looping: Option<bool>,
    pub progress_update_interval_ms: Option<u64>,
    pub position_ms: Option<i64>,
}

impl IntentPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn should_play(mut self, should_play: bool) -> Self {
        self.should_play = Some(should_play);
        self
    }

    pub fn rate(mut self, rate: f32, should_correct_pitch: bool) -> Self {
        self.rate = Some(rate);
        self.should_correct_pitch = Some(should_correct_pitch);
        self
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn muted(mut self, is_muted: bool) -> Self {
        self.is_muted = Some(is_muted);
        self
    }

    pub fn looping(mut self, is_looping: bool) -> Self {
        self.is_looping = Some(is_looping);
        self
    }

    pub fn progress_update_interval(mut self, interval_ms: u64) -> Self {
        self.progress_update_interval_ms = Some(interval_ms);
        self
    }

    pub fn position(mut self, position_ms: i64) -> Self {
        self.position_ms = Some(position_ms);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(rate) = self.rate {
            validate_rate(rate)?;
        }
        if let Some(volume) = self.volume {
            validate_volume(volume)?;
        }
        if let Some(interval) = self.progress_update_interval_ms {
            validate_interval(interval)?;
        }
        if let Some(position) = self.position_ms {
            if position < 0 {
                return Err(PlaybackError::InvalidIntent(format!(
                    "Seek position must be >= 0, got {}",
                    position
                )));
            }
        }
        Ok(())
    }
}

fn validate_rate(rate: f32) -> Result<()> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(PlaybackError::InvalidIntent(format!(
            "Playback rate must be > 0, got {}",
            rate
        )));
    }
    Ok(())
}

fn validate_volume(volume: f32) -> Result<()> {
    if !(0.0..=1.0).contains(&volume) {
        return Err(PlaybackError::InvalidIntent(format!(
            "Volume out of range: {}",
            volume
        )));
    }
    Ok(())
}

fn validate_interval(interval_ms: u64) -> Result<()> {
    if interval_ms == 0 {
        return Err(PlaybackError::InvalidIntent(
            "Progress update interval must be > 0".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_intent_is_valid() {
        let intent = PlaybackIntent::default();
        assert!(intent.validate().is_ok());
        assert!(!intent.should_play);
        assert_eq!(intent.progress_update_interval_ms, 500);
    }

    #[test]
    fn test_invalid_rate_and_volume() {
        let mut intent = PlaybackIntent::default();
        intent.rate = 0.0;
        assert!(matches!(intent.validate(), Err(PlaybackError::InvalidIntent(_))));

        intent.rate = f32::NAN;
        assert!(intent.validate().is_err());

        let mut intent = PlaybackIntent::default();
        intent.volume = 1.5;
        assert!(matches!(intent.validate(), Err(PlaybackError::InvalidIntent(_))));
    }

    #[test]
    fn test_merge_only_touches_present_fields() {
        let base = PlaybackIntent {
            volume: 0.4,
            is_looping: true,
            ..PlaybackIntent::default()
        };
        let merged = base
            .merged(&IntentPatch::new().should_play(true).rate(1.5, true))
            .unwrap();

        assert!(merged.should_play);
        assert_eq!(merged.rate, 1.5);
        assert!(merged.should_correct_pitch);
        assert_eq!(merged.volume, 0.4);
        assert!(merged.is_looping);
    }

    #[test]
    fn test_rejected_patch_leaves_nothing_applied() {
        let base = PlaybackIntent::default();
        let patch = IntentPatch::new().should_play(true).volume(-0.1);
        assert!(base.merged(&patch).is_err());
        assert!(!base.should_play);
    }

    #[test]
    fn test_negative_seek_rejected() {
        assert!(IntentPatch::new().position(-1).validate().is_err());
        assert!(IntentPatch::new().position(0).validate().is_ok());
    }
}
