//! Engine configuration
//!
//! All tunables live here with serde defaults, so a partial JSON file only
//! needs to name the values it overrides.

use crate::capture::MediaConstraints;
use crate::utils::error::{MediaError, MediaResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Shortest selectable recording limit (seconds)
pub const MIN_DURATION_SECS: u32 = 60;
/// Longest selectable recording limit (seconds)
pub const MAX_DURATION_SECS: u32 = 600;
/// Selection granularity (seconds)
pub const DURATION_STEP_SECS: u32 = 60;

/// Upload ceiling: 50 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Maximum recording/upload duration chosen by the hosting form
///
/// Always 1 to 10 whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct MaxDuration(u32);

impl MaxDuration {
    pub fn try_from_secs(secs: u32) -> MediaResult<Self> {
        if !(MIN_DURATION_SECS..=MAX_DURATION_SECS).contains(&secs) || secs % DURATION_STEP_SECS != 0 {
            return Err(MediaError::InvalidConfig(format!(
                "max duration must be {}-{}s in {}s steps, got {}s",
                MIN_DURATION_SECS, MAX_DURATION_SECS, DURATION_STEP_SECS, secs
            )));
        }
        Ok(Self(secs))
    }

    pub fn from_minutes(minutes: u32) -> MediaResult<Self> {
        Self::try_from_secs(minutes.saturating_mul(60))
    }

    /// Every selectable value, shortest first
    pub fn all() -> impl Iterator<Item = MaxDuration> {
        (MIN_DURATION_SECS..=MAX_DURATION_SECS)
            .step_by(DURATION_STEP_SECS as usize)
            .map(MaxDuration)
    }

    pub fn secs(self) -> u32 {
        self.0
    }

    pub fn as_secs_f64(self) -> f64 {
        f64::from(self.0)
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_secs(u64::from(self.0))
    }
}

impl Default for MaxDuration {
    fn default() -> Self {
        Self(MIN_DURATION_SECS)
    }
}

impl TryFrom<u32> for MaxDuration {
    type Error = MediaError;

    fn try_from(secs: u32) -> Result<Self, Self::Error> {
        Self::try_from_secs(secs)
    }
}

impl From<MaxDuration> for u32 {
    fn from(value: MaxDuration) -> Self {
        value.0
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoIntroConfig {
    pub recorder: RecorderConfig,
    pub effects: EffectsConfig,
    pub processing: ProcessingConfig,
    pub upload: UploadConfig,
    pub playback: PlaybackConfig,
}

impl VideoIntroConfig {
    /// Load and validate a JSON config file
    pub fn load(path: &Path) -> MediaResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: VideoIntroConfig = serde_json::from_str(&content)
            .map_err(|e| MediaError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> MediaResult<()> {
        if self.recorder.timeslice_ms == 0 || self.recorder.tick_interval_ms == 0 {
            return Err(MediaError::InvalidConfig(
                "timesliceMs and tickIntervalMs must be positive".to_string(),
            ));
        }
        if self.effects.reapply_interval_ms == 0 {
            return Err(MediaError::InvalidConfig(
                "reapplyIntervalMs must be positive".to_string(),
            ));
        }
        if !self.processing.thumbnail_probe_secs.is_finite() || self.processing.thumbnail_probe_secs < 0.0 {
            return Err(MediaError::InvalidConfig(
                "thumbnailProbeSecs must be a non-negative number".to_string(),
            ));
        }
        if self.processing.thumbnail_max_width == 0 {
            return Err(MediaError::InvalidConfig(
                "thumbnailMaxWidth must be positive".to_string(),
            ));
        }
        if self.upload.max_bytes == 0 {
            return Err(MediaError::InvalidConfig("maxBytes must be positive".to_string()));
        }
        if self.playback.rates.is_empty() || self.playback.rates.iter().any(|r| !(*r > 0.0)) {
            return Err(MediaError::InvalidConfig(
                "playback rates must be a non-empty list of positive numbers".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.playback.default_volume) {
            return Err(MediaError::InvalidConfig(
                "defaultVolume must be within 0..=1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Recording controller settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecorderConfig {
    pub default_max_duration_secs: MaxDuration,
    /// Length of each captured chunk
    pub timeslice_ms: u64,
    /// Elapsed-time ticker period
    pub tick_interval_ms: u64,
    /// Preferred encoder output format
    pub mime_type: String,
    pub constraints: MediaConstraints,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            default_max_duration_secs: MaxDuration::default(),
            timeslice_ms: 1000,
            tick_interval_ms: 1000,
            mime_type: "video/webm;codecs=vp8,opus".to_string(),
            constraints: MediaConstraints::default(),
        }
    }
}

impl RecorderConfig {
    pub fn timeslice(&self) -> Duration {
        Duration::from_millis(self.timeslice_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Preview effects settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EffectsConfig {
    /// How often effects are reapplied to the preview (~2 Hz)
    pub reapply_interval_ms: u64,
    /// Background option id selected at startup
    pub default_background: String,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            reapply_interval_ms: 500,
            default_background: "none".to_string(),
        }
    }
}

impl EffectsConfig {
    pub fn reapply_interval(&self) -> Duration {
        Duration::from_millis(self.reapply_interval_ms)
    }
}

/// Post-processing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessingConfig {
    /// Where in the source the thumbnail frame is taken
    pub thumbnail_probe_secs: f64,
    pub thumbnail_max_width: u32,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            thumbnail_probe_secs: 1.0,
            thumbnail_max_width: 320,
        }
    }
}

/// Upload gate settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UploadConfig {
    pub max_bytes: u64,
    pub accepted_prefix: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            accepted_prefix: "video/".to_string(),
        }
    }
}

/// Playback transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaybackConfig {
    pub skip_secs: f64,
    pub auto_hide_ms: u64,
    pub rates: Vec<f32>,
    pub default_volume: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            skip_secs: 10.0,
            auto_hide_ms: 3000,
            rates: vec![0.5, 0.75, 1.0, 1.25, 1.5, 2.0],
            default_volume: 1.0,
        }
    }
}

impl PlaybackConfig {
    pub fn auto_hide_delay(&self) -> Duration {
        Duration::from_millis(self.auto_hide_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_max_duration_range() {
        let all: Vec<u32> = MaxDuration::all().map(MaxDuration::secs).collect();
        assert_eq!(all, vec![60, 120, 180, 240, 300, 360, 420, 480, 540, 600]);

        assert!(MaxDuration::try_from_secs(59).is_err());
        assert!(MaxDuration::try_from_secs(90).is_err());
        assert!(MaxDuration::try_from_secs(660).is_err());
        assert_eq!(MaxDuration::from_minutes(3).unwrap().secs(), 180);
    }

    #[test]
    fn test_defaults() {
        let config = VideoIntroConfig::default();
        assert_eq!(config.upload.max_bytes, 52_428_800);
        assert_eq!(config.effects.reapply_interval(), Duration::from_millis(500));
        assert_eq!(config.recorder.default_max_duration_secs.secs(), 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("video-intro.json");
        std::fs::write(
            &path,
            r#"{ "recorder": { "defaultMaxDurationSecs": 300 }, "effects": { "reapplyIntervalMs": 250 } }"#,
        )
        .unwrap();

        let config = VideoIntroConfig::load(&path).unwrap();
        assert_eq!(config.recorder.default_max_duration_secs.secs(), 300);
        assert_eq!(config.recorder.timeslice_ms, 1000);
        assert_eq!(config.effects.reapply_interval_ms, 250);
        assert_eq!(config.playback.rates.len(), 6);
    }

    #[test]
    fn test_load_rejects_bad_duration() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "recorder": { "defaultMaxDurationSecs": 45 } }"#).unwrap();

        assert!(matches!(
            VideoIntroConfig::load(&path),
            Err(MediaError::InvalidConfig(_))
        ));
    }
}
