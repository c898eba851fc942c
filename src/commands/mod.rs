//! Host command handlers
//!
//! This module contains the entry points a hosting UI calls. Each handler
//! takes the shared `VideoIntroState` and returns `ErrorResponse` on failure
//! so the message can be shown inline.

pub mod effects;
pub mod playback;
pub mod recording;

use crate::capture::{MediaAcquisition, PreviewSurface, SharedSurface};
use crate::config::VideoIntroConfig;
use crate::playback::{HeadlessSurface, PlaybackSurface, PlaybackTransport};
use crate::processing::MediaDecoder;
use crate::recorder::RecordingController;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Application state shared by every command
pub struct VideoIntroState {
    pub config: VideoIntroConfig,
    pub controller: RecordingController,
    pub preview: SharedSurface,
    pub transport: Arc<Mutex<PlaybackTransport>>,
}

impl VideoIntroState {
    pub fn new(
        config: VideoIntroConfig,
        acquisition: Arc<dyn MediaAcquisition>,
        decoder: Arc<dyn MediaDecoder>,
    ) -> Self {
        Self::with_playback_surface(config, acquisition, decoder, Box::new(HeadlessSurface::new()))
    }

    pub fn with_playback_surface(
        config: VideoIntroConfig,
        acquisition: Arc<dyn MediaAcquisition>,
        decoder: Arc<dyn MediaDecoder>,
        playback: Box<dyn PlaybackSurface>,
    ) -> Self {
        let preview = PreviewSurface::shared();
        let controller = RecordingController::new(&config, acquisition, decoder, Arc::clone(&preview));
        let transport = PlaybackTransport::new(playback, config.playback.clone());

        Self {
            config,
            controller,
            preview,
            transport: Arc::new(Mutex::new(transport)),
        }
    }
}
