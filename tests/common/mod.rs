//! Test doubles for the capture and decode capabilities

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use video_intro::capture::{
    CaptureAbort, EncoderOptions, MediaAcquisition, MediaConstraints, MediaEncoder, MediaSession, PreviewSurface,
    SessionId, SharedSurface, TrackInfo, TrackKind,
};
use video_intro::processing::{MediaDecoder, RasterFrame};
use video_intro::{MediaError, MediaResult, RecordingController, VideoArtifact, VideoIntroConfig};

const TRACKS_PER_SESSION: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AcquireOutcome {
    Grant,
    Deny,
    NoDevice,
}

/// Acquisition backend with a global live-track counter
pub struct FakeAcquisition {
    pub outcome: Mutex<AcquireOutcome>,
    pub live_tracks: Arc<AtomicUsize>,
    pub acquired: AtomicUsize,
    pub native_pause: bool,
    pub fail_encoder: Arc<AtomicBool>,
    /// True while an encoder holds the devices
    pub capturing: Arc<AtomicBool>,
    /// How long an encoder's final flush takes
    pub flush_delay: Arc<Mutex<Duration>>,
    /// Simulates the camera being unplugged
    pub disconnected: Arc<AtomicBool>,
}

impl FakeAcquisition {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::build(false))
    }

    pub fn with_native_pause() -> Arc<Self> {
        Arc::new(Self::build(true))
    }

    fn build(native_pause: bool) -> Self {
        Self {
            outcome: Mutex::new(AcquireOutcome::Grant),
            live_tracks: Arc::new(AtomicUsize::new(0)),
            acquired: AtomicUsize::new(0),
            native_pause,
            fail_encoder: Arc::new(AtomicBool::new(false)),
            capturing: Arc::new(AtomicBool::new(false)),
            flush_delay: Arc::new(Mutex::new(Duration::ZERO)),
            disconnected: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    pub fn set_outcome(&self, outcome: AcquireOutcome) {
        *self.outcome.lock() = outcome;
    }

    pub fn live_tracks(&self) -> usize {
        self.live_tracks.load(Ordering::SeqCst)
    }

    pub fn session(&self) -> Box<dyn MediaSession> {
        self.live_tracks.fetch_add(TRACKS_PER_SESSION, Ordering::SeqCst);
        Box::new(FakeSession {
            id: SessionId::new(),
            live: true,
            live_tracks: Arc::clone(&self.live_tracks),
            native_pause: self.native_pause,
            fail_encoder: Arc::clone(&self.fail_encoder),
            capturing: Arc::clone(&self.capturing),
            flush_delay: Arc::clone(&self.flush_delay),
            disconnected: Arc::clone(&self.disconnected),
        })
    }
}

#[async_trait]
impl MediaAcquisition for FakeAcquisition {
    async fn acquire(&self, _constraints: &MediaConstraints) -> MediaResult<Box<dyn MediaSession>> {
        let outcome = *self.outcome.lock();
        match outcome {
            AcquireOutcome::Grant => {
                self.acquired.fetch_add(1, Ordering::SeqCst);
                Ok(self.session())
            }
            AcquireOutcome::Deny => Err(MediaError::PermissionDenied("user dismissed the prompt".into())),
            AcquireOutcome::NoDevice => Err(MediaError::DeviceUnavailable("no camera".into())),
        }
    }

    fn name(&self) -> &str {
        "fake"
    }
}

pub struct FakeSession {
    id: SessionId,
    live: bool,
    live_tracks: Arc<AtomicUsize>,
    native_pause: bool,
    fail_encoder: Arc<AtomicBool>,
    capturing: Arc<AtomicBool>,
    flush_delay: Arc<Mutex<Duration>>,
    disconnected: Arc<AtomicBool>,
}

impl MediaSession for FakeSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn is_ready(&self) -> bool {
        self.live && !self.disconnected.load(Ordering::SeqCst)
    }

    fn tracks(&self) -> Vec<TrackInfo> {
        vec![
            TrackInfo {
                kind: TrackKind::Video,
                label: "Fake Camera".into(),
                live: self.live,
            },
            TrackInfo {
                kind: TrackKind::Audio,
                label: "Fake Microphone".into(),
                live: self.live,
            },
        ]
    }

    fn stop_tracks(&mut self) {
        if self.live {
            self.live = false;
            self.live_tracks.fetch_sub(TRACKS_PER_SESSION, Ordering::SeqCst);
        }
    }

    fn create_encoder(&mut self, options: &EncoderOptions) -> MediaResult<Box<dyn MediaEncoder>> {
        Ok(Box::new(FakeEncoder {
            mime_type: options.mime_type.clone(),
            native_pause: self.native_pause,
            fail_start: self.fail_encoder.load(Ordering::SeqCst),
            capturing: Arc::clone(&self.capturing),
            flush_delay: *self.flush_delay.lock(),
            started: false,
            paused: false,
            taken: 0,
        }))
    }
}

/// Emits one 8-byte chunk per `take_chunks` call and a tail on stop
pub struct FakeEncoder {
    mime_type: String,
    native_pause: bool,
    fail_start: bool,
    capturing: Arc<AtomicBool>,
    flush_delay: Duration,
    started: bool,
    paused: bool,
    taken: u8,
}

#[async_trait]
impl MediaEncoder for FakeEncoder {
    fn mime_type(&self) -> &str {
        &self.mime_type
    }

    fn start(&mut self, _timeslice: Duration) -> MediaResult<()> {
        if self.fail_start {
            return Err(MediaError::EncoderStartFailure("codec unavailable".into()));
        }
        self.started = true;
        self.capturing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn supports_pause(&self) -> bool {
        self.native_pause
    }

    fn pause(&mut self) -> MediaResult<()> {
        self.paused = true;
        Ok(())
    }

    fn resume(&mut self) -> MediaResult<()> {
        self.paused = false;
        Ok(())
    }

    fn take_chunks(&mut self) -> Vec<Vec<u8>> {
        if !self.started || self.paused {
            return Vec::new();
        }
        self.taken = self.taken.wrapping_add(1);
        vec![vec![self.taken; 8]]
    }

    async fn stop(&mut self) -> MediaResult<Vec<Vec<u8>>> {
        if !self.flush_delay.is_zero() {
            tokio::time::sleep(self.flush_delay).await;
        }
        self.started = false;
        self.capturing.store(false, Ordering::SeqCst);
        Ok(vec![b"tail".to_vec()])
    }

    fn abort_handle(&self) -> CaptureAbort {
        let capturing = Arc::clone(&self.capturing);
        CaptureAbort::new(move || capturing.store(false, Ordering::SeqCst))
    }
}

/// Decoder reporting a configurable duration and a 4x4 frame
pub struct FakeDecoder {
    pub duration: Mutex<f64>,
    pub fail_frames: AtomicBool,
    pub fail_probe: AtomicBool,
    pub frame_delay: Mutex<Duration>,
    pub frames: AtomicUsize,
}

impl FakeDecoder {
    pub fn new(duration: f64) -> Arc<Self> {
        Arc::new(Self {
            duration: Mutex::new(duration),
            fail_frames: AtomicBool::new(false),
            fail_probe: AtomicBool::new(false),
            frame_delay: Mutex::new(Duration::ZERO),
            frames: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl MediaDecoder for FakeDecoder {
    async fn probe_duration(&self, source: &Path) -> MediaResult<f64> {
        if self.fail_probe.load(Ordering::SeqCst) || !source.exists() {
            return Err(MediaError::DurationProbe("metadata did not load".into()));
        }
        Ok(*self.duration.lock())
    }

    async fn grab_frame(&self, source: &Path, _at_secs: f64, _max_width: u32) -> MediaResult<RasterFrame> {
        let delay = *self.frame_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_frames.load(Ordering::SeqCst) || !source.exists() {
            return Err(MediaError::ThumbnailExtraction("seek failed".into()));
        }
        self.frames.fetch_add(1, Ordering::SeqCst);
        RasterFrame::new(4, 4, vec![90; 48])
    }
}

/// Controller wired to fakes, plus the handles tests inspect
pub struct Harness {
    pub controller: RecordingController,
    pub acquisition: Arc<FakeAcquisition>,
    pub decoder: Arc<FakeDecoder>,
    pub surface: SharedSurface,
    pub changes: Arc<Mutex<Vec<Option<VideoArtifact>>>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with(FakeAcquisition::new(), FakeDecoder::new(0.0), VideoIntroConfig::default())
    }

    pub fn with(acquisition: Arc<FakeAcquisition>, decoder: Arc<FakeDecoder>, config: VideoIntroConfig) -> Self {
        let surface = PreviewSurface::shared();
        let controller = RecordingController::new(
            &config,
            acquisition.clone(),
            decoder.clone(),
            Arc::clone(&surface),
        );

        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&changes);
        controller.set_on_video_change(move |artifact| sink.lock().push(artifact));

        Self {
            controller,
            acquisition,
            decoder,
            surface,
            changes,
        }
    }

    pub fn overlay_count(&self) -> usize {
        self.surface.lock().overlay_count()
    }

    /// Assert nothing is left running or allocated
    pub fn assert_clean(&self) {
        let status = self.controller.status();
        assert_eq!(status.active_tracks, 0, "device tracks still active");
        assert_eq!(status.pending_timers, 0, "timers still pending");
        assert_eq!(self.acquisition.live_tracks(), 0, "sessions not released");
        assert_eq!(self.overlay_count(), 0, "overlay nodes left on the preview");
        assert!(self.controller.urls().is_empty(), "object URLs not revoked");
        assert!(self.surface.lock().bound_stream().is_none());
        assert!(!self.acquisition.capturing(), "encoder still capturing");
    }
}
