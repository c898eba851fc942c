//! Playback transport
//!
//! Custom player controls for reviewing an artifact: play/pause, seeking,
//! skipping, volume with a lossless mute, discrete rates, fullscreen, and
//! controls that hide themselves while playing.
//!
//! The auto-hide timer runs on the Tokio runtime, so `play` and
//! `pointer_moved` must be called from within one.

use crate::config::PlaybackConfig;
use crate::playback::surface::PlaybackSurface;
use crate::processing::artifact::VideoArtifact;
use crate::utils::error::{MediaError, MediaResult};
use crate::utils::timers::{TimerArena, TimerKind};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Observable player state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub current_time: f64,
    pub duration: f64,
    /// Selected volume in `[0, 1]`, kept while muted
    pub volume: f32,
    pub muted: bool,
    pub playing: bool,
    pub rate: f32,
    pub fullscreen: bool,
}

impl PlaybackState {
    /// Volume actually heard
    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    /// Played fraction in `[0, 1]`
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            (self.current_time / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// What the player area shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PlayerView {
    Empty,
    Ready,
    /// Replacement shown when the source cannot be played
    Unavailable { message: String },
}

/// Horizontal bounds of the progress bar, in the same units as click offsets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressBar {
    pub left: f64,
    pub width: f64,
}

impl ProgressBar {
    /// Fraction of the bar at `x`, clamped to `[0, 1]`
    pub fn fraction_at(&self, x: f64) -> f64 {
        if !(self.width > 0.0) || !x.is_finite() {
            return 0.0;
        }
        ((x - self.left) / self.width).clamp(0.0, 1.0)
    }
}

#[derive(Debug)]
struct ControlsState {
    visible: bool,
    /// Bumped whenever a pending hide must be ignored
    epoch: u64,
}

/// Transport wrapping a playback surface
pub struct PlaybackTransport {
    surface: Box<dyn PlaybackSurface>,
    config: PlaybackConfig,
    state: PlaybackState,
    view: PlayerView,
    /// Restored on unmute when the volume was dropped to zero
    last_volume: f32,
    controls: Arc<Mutex<ControlsState>>,
    timers: TimerArena,
}

impl PlaybackTransport {
    pub fn new(surface: Box<dyn PlaybackSurface>, config: PlaybackConfig) -> Self {
        let volume = config.default_volume.clamp(0.0, 1.0);
        let mut transport = Self {
            surface,
            state: PlaybackState {
                current_time: 0.0,
                duration: 0.0,
                volume,
                muted: false,
                playing: false,
                rate: 1.0,
                fullscreen: false,
            },
            view: PlayerView::Empty,
            last_volume: if volume > 0.0 { volume } else { 1.0 },
            controls: Arc::new(Mutex::new(ControlsState {
                visible: true,
                epoch: 0,
            })),
            timers: TimerArena::new(),
            config,
        };
        transport.surface.set_volume(volume);
        transport
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn view(&self) -> &PlayerView {
        &self.view
    }

    pub fn controls_visible(&self) -> bool {
        self.controls.lock().visible
    }

    /// Number of live auto-hide timers
    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    /// Load an artifact for review. A load failure degrades the view to
    /// `Unavailable` instead of propagating further.
    pub fn load(&mut self, artifact: &VideoArtifact) -> MediaResult<()> {
        self.stop_playback();

        match self.surface.load(artifact) {
            Ok(duration) => {
                self.state.duration = duration.max(0.0);
                self.state.current_time = 0.0;
                self.surface.set_volume(self.state.volume);
                self.surface.set_muted(self.state.muted);
                self.surface.set_rate(self.state.rate);
                self.view = PlayerView::Ready;
                tracing::info!("Loaded {} for playback ({:.2}s)", artifact.file.name, duration);
                Ok(())
            }
            Err(e) => {
                self.state.duration = 0.0;
                self.state.current_time = 0.0;
                self.view = PlayerView::Unavailable {
                    message: e.to_string(),
                };
                tracing::warn!("Playback unavailable for {}: {}", artifact.file.name, e);
                Err(e)
            }
        }
    }

    /// Drop the current source
    pub fn unload(&mut self) {
        self.stop_playback();
        self.state.current_time = 0.0;
        self.state.duration = 0.0;
        self.view = PlayerView::Empty;
    }

    /// Returns whether playback is now running
    pub fn toggle_play(&mut self) -> MediaResult<bool> {
        if self.state.playing {
            self.pause();
        } else {
            self.play()?;
        }
        Ok(self.state.playing)
    }

    pub fn play(&mut self) -> MediaResult<()> {
        if self.view != PlayerView::Ready {
            return Err(MediaError::InvalidTransition {
                action: "play",
                state: "no video is loaded",
            });
        }
        if self.state.playing {
            return Ok(());
        }

        if self.state.duration > 0.0 && self.state.current_time >= self.state.duration {
            self.seek_to(0.0);
        }
        self.surface.play()?;
        self.state.playing = true;
        self.show_controls();
        self.schedule_auto_hide();
        Ok(())
    }

    /// Pause; controls stay visible while paused
    pub fn pause(&mut self) {
        if !self.state.playing {
            return;
        }
        self.surface.pause();
        self.state.playing = false;
        self.timers.cancel_kind(TimerKind::ControlsAutoHide);
        self.show_controls();
    }

    /// Jump to `secs`, clamped to `[0, duration]`. Returns the new time.
    pub fn seek_to(&mut self, secs: f64) -> f64 {
        let target = self.clamp_time(secs);
        self.surface.seek(target);
        self.state.current_time = target;
        target
    }

    /// Seek to the time under a click on the progress bar
    pub fn seek_by_click(&mut self, click_x: f64, bar: ProgressBar) -> f64 {
        let fraction = bar.fraction_at(click_x);
        self.seek_to(fraction * self.state.duration)
    }

    /// Move by `delta` seconds, clamped
    pub fn skip(&mut self, delta: f64) -> f64 {
        self.seek_to(self.state.current_time + delta)
    }

    pub fn skip_forward(&mut self) -> f64 {
        self.skip(self.config.skip_secs)
    }

    pub fn skip_backward(&mut self) -> f64 {
        self.skip(-self.config.skip_secs)
    }

    /// Set the volume, clamped to `[0, 1]`. The mute flag is left alone.
    pub fn set_volume(&mut self, volume: f32) -> f32 {
        let volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        self.state.volume = volume;
        if volume > 0.0 {
            self.last_volume = volume;
        }
        self.surface.set_volume(volume);
        volume
    }

    /// Returns whether the player is now muted
    pub fn toggle_mute(&mut self) -> bool {
        if self.state.muted {
            self.state.muted = false;
            if self.state.volume == 0.0 {
                self.state.volume = self.last_volume;
                self.surface.set_volume(self.last_volume);
            }
        } else {
            self.state.muted = true;
        }
        self.surface.set_muted(self.state.muted);
        self.state.muted
    }

    /// Change the playback rate without moving the position
    pub fn set_rate(&mut self, rate: f32) -> MediaResult<()> {
        let supported = self
            .config
            .rates
            .iter()
            .any(|r| (r - rate).abs() < f32::EPSILON);
        if !supported {
            return Err(MediaError::UnsupportedRate(rate));
        }

        self.surface.set_rate(rate);
        self.state.rate = rate;
        tracing::debug!("Playback rate {}x at {:.2}s", rate, self.state.current_time);
        Ok(())
    }

    pub fn rates(&self) -> &[f32] {
        &self.config.rates
    }

    /// Returns whether the player is now fullscreen
    pub fn toggle_fullscreen(&mut self) -> MediaResult<bool> {
        let next = !self.state.fullscreen;
        self.surface.set_fullscreen(next)?;
        self.state.fullscreen = next;
        Ok(next)
    }

    /// Pointer activity over the player: show controls and restart the
    /// hide countdown
    pub fn pointer_moved(&mut self) {
        self.show_controls();
        if self.state.playing {
            self.schedule_auto_hide();
        }
    }

    /// Position reported by the surface while playing
    pub fn sync_time(&mut self, secs: f64) {
        self.state.current_time = self.clamp_time(secs);
    }

    /// Reached the end of the source
    pub fn on_ended(&mut self) {
        self.surface.pause();
        self.state.playing = false;
        self.state.current_time = self.state.duration;
        self.timers.cancel_kind(TimerKind::ControlsAutoHide);
        self.show_controls();
    }

    fn stop_playback(&mut self) {
        if self.state.playing {
            self.surface.pause();
            self.state.playing = false;
        }
        self.timers.cancel_all();
        self.show_controls();
    }

    fn clamp_time(&self, secs: f64) -> f64 {
        if secs.is_nan() {
            return 0.0;
        }
        secs.clamp(0.0, self.state.duration.max(0.0))
    }

    fn show_controls(&self) {
        let mut controls = self.controls.lock();
        controls.visible = true;
        controls.epoch += 1;
    }

    fn schedule_auto_hide(&mut self) {
        self.timers.cancel_kind(TimerKind::ControlsAutoHide);

        let controls = Arc::clone(&self.controls);
        let epoch = controls.lock().epoch;
        let delay = self.config.auto_hide_delay();
        self.timers.spawn(TimerKind::ControlsAutoHide, async move {
            tokio::time::sleep(delay).await;
            let mut controls = controls.lock();
            if controls.epoch == epoch {
                controls.visible = false;
            }
        });
    }
}

/// Format seconds as "M:SS", or "H:MM:SS" past an hour
pub fn format_timestamp(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 { secs.floor() as u64 } else { 0 };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
