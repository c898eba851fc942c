//! Playback surfaces
//!
//! The transport drives any `PlaybackSurface`. `HeadlessSurface` keeps the
//! player state in memory for hosts that render it themselves.

use crate::processing::artifact::{MediaSource, VideoArtifact};
use crate::utils::error::{MediaError, MediaResult};

/// A video element the transport can control
pub trait PlaybackSurface: Send {
    /// Load the artifact and return its duration in seconds
    fn load(&mut self, artifact: &VideoArtifact) -> MediaResult<f64>;

    fn play(&mut self) -> MediaResult<()>;

    fn pause(&mut self);

    fn seek(&mut self, secs: f64);

    fn current_time(&self) -> f64;

    fn set_volume(&mut self, volume: f32);

    fn set_muted(&mut self, muted: bool);

    fn set_rate(&mut self, rate: f32);

    /// Enter or leave fullscreen on the player container
    fn set_fullscreen(&mut self, fullscreen: bool) -> MediaResult<()>;
}

/// In-memory surface
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessSurface {
    pub loaded: Option<String>,
    pub position: f64,
    pub playing: bool,
    pub volume: f32,
    pub muted: bool,
    pub rate: f32,
    pub fullscreen: bool,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self {
            loaded: None,
            position: 0.0,
            playing: false,
            volume: 1.0,
            muted: false,
            rate: 1.0,
            fullscreen: false,
        }
    }
}

impl PlaybackSurface for HeadlessSurface {
    fn load(&mut self, artifact: &VideoArtifact) -> MediaResult<f64> {
        let file = &artifact.file;
        match file.source() {
            MediaSource::Disk(path) if !path.is_file() => {
                return Err(MediaError::PlaybackLoad(format!(
                    "{} is not readable",
                    path.display()
                )));
            }
            MediaSource::Memory(bytes) if bytes.is_empty() => {
                return Err(MediaError::PlaybackLoad(format!("{} is empty", file.name)));
            }
            _ => {}
        }

        if !artifact.duration.is_finite() || artifact.duration < 0.0 {
            return Err(MediaError::PlaybackLoad(format!(
                "{} has no usable duration",
                file.name
            )));
        }

        self.loaded = Some(file.name.clone());
        self.position = 0.0;
        self.playing = false;
        Ok(artifact.duration)
    }

    fn play(&mut self) -> MediaResult<()> {
        if self.loaded.is_none() {
            return Err(MediaError::PlaybackLoad("no source loaded".to_string()));
        }
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn seek(&mut self, secs: f64) {
        self.position = secs;
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn set_rate(&mut self, rate: f32) {
        self.rate = rate;
    }

    fn set_fullscreen(&mut self, fullscreen: bool) -> MediaResult<()> {
        self.fullscreen = fullscreen;
        Ok(())
    }
}
