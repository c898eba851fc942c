//! Capture trait definitions
//!
//! Platform-agnostic capability interfaces for camera/microphone acquisition
//! and chunked encoding. Any device stack (browser bridge, ffmpeg, native
//! bindings) plugs in behind these traits.

use crate::utils::error::MediaResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Identifier of an acquired media session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub uuid::Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which way the camera should face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    User,
    Environment,
}

/// Requested video characteristics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoConstraints {
    /// Ideal width in pixels
    pub width: u32,
    /// Ideal height in pixels
    pub height: u32,
    pub frame_rate: u32,
    pub facing_mode: FacingMode,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            frame_rate: 30,
            facing_mode: FacingMode::User,
        }
    }
}

/// Requested audio characteristics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioConstraints {
    pub enabled: bool,
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
}

impl Default for AudioConstraints {
    fn default() -> Self {
        Self {
            enabled: true,
            echo_cancellation: true,
            noise_suppression: true,
        }
    }
}

/// Constraints passed to `MediaAcquisition::acquire`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaConstraints {
    pub video: VideoConstraints,
    pub audio: AudioConstraints,
}

/// Kind of device track in a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

/// Information about one device track
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub kind: TrackKind,
    /// Device label
    pub label: String,
    /// False once the track has been stopped
    pub live: bool,
}

/// Encoder settings derived from the recorder config
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderOptions {
    /// Preferred container/codec, e.g. "video/webm;codecs=vp8,opus"
    pub mime_type: String,
    /// Length of each emitted chunk
    pub timeslice: Duration,
}

/// A live, exclusively owned camera/microphone stream
pub trait MediaSession: Send {
    fn id(&self) -> SessionId;

    /// True while at least one track is live
    fn is_ready(&self) -> bool;

    fn tracks(&self) -> Vec<TrackInfo>;

    fn active_track_count(&self) -> usize {
        self.tracks().iter().filter(|t| t.live).count()
    }

    /// Stop every device track. Must be idempotent.
    fn stop_tracks(&mut self);

    /// Build an encoder bound to this session's tracks
    fn create_encoder(&mut self, options: &EncoderOptions) -> MediaResult<Box<dyn MediaEncoder>>;
}

/// Stops an encoder's capture from outside the encoder
///
/// Usable while the encoder itself is borrowed by an in-flight `stop`.
#[derive(Clone)]
pub struct CaptureAbort(Arc<dyn Fn() + Send + Sync>);

impl CaptureAbort {
    pub fn new<F>(abort: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self(Arc::new(abort))
    }

    /// Stop capturing now. Safe to call more than once.
    pub fn abort(&self) {
        (self.0)()
    }
}

impl fmt::Debug for CaptureAbort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CaptureAbort")
    }
}

/// Chunked encoder over a session
///
/// Chunks are opaque container fragments; concatenating them in order
/// yields the complete recording.
#[async_trait]
pub trait MediaEncoder: Send {
    /// Container/codec actually produced
    fn mime_type(&self) -> &str;

    /// Begin capture, emitting a chunk roughly every `timeslice`
    fn start(&mut self, timeslice: Duration) -> MediaResult<()>;

    /// Whether `pause`/`resume` suspend capture natively
    fn supports_pause(&self) -> bool;

    fn pause(&mut self) -> MediaResult<()>;

    fn resume(&mut self) -> MediaResult<()>;

    /// Chunks produced since the previous call
    fn take_chunks(&mut self) -> Vec<Vec<u8>>;

    /// Stop capture and return every chunk not yet taken
    async fn stop(&mut self) -> MediaResult<Vec<Vec<u8>>>;

    /// Synchronous kill switch, also effective during `stop`
    fn abort_handle(&self) -> CaptureAbort;
}

/// Camera/microphone acquisition capability
#[async_trait]
pub trait MediaAcquisition: Send + Sync {
    /// Request the devices. Resolves once the permission prompt (if any)
    /// has been answered.
    async fn acquire(&self, constraints: &MediaConstraints) -> MediaResult<Box<dyn MediaSession>>;

    /// Stop every track of `session` and drop it. Safe on `None`.
    fn release(&self, session: &mut Option<Box<dyn MediaSession>>) {
        if let Some(mut session) = session.take() {
            session.stop_tracks();
            tracing::info!("Released media session {}", session.id());
        }
    }

    /// Backend name for logging
    fn name(&self) -> &str;
}
