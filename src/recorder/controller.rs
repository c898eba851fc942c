//! Recording controller
//!
//! Owns the media session, the encoder and every timer of a recording
//! lifecycle, and drives the state machine
//! `Idle -> CameraReady -> Recording <-> Paused -> Stopped -> Reviewing`.
//!
//! All mutable state sits in one `Lifecycle` record behind a mutex that is
//! never held across an await point. Timer tasks hold only a weak reference
//! to the controller and check a generation counter, so a `reset` makes any
//! in-flight work inert.

use crate::capture::preview::SharedSurface;
use crate::capture::traits::{CaptureAbort, EncoderOptions, MediaAcquisition, MediaEncoder, MediaSession};
use crate::config::{MaxDuration, RecorderConfig, VideoIntroConfig};
use crate::effects::background::find_background;
use crate::effects::compositor::EffectsCompositor;
use crate::processing::artifact::{MediaFile, VideoArtifact};
use crate::processing::decoder::MediaDecoder;
use crate::processing::post::PostProcessor;
use crate::recorder::recording::Recording;
use crate::recorder::state::{ElapsedClock, RecorderState, RecorderStatus, RecordingEvent, RecordingSegment};
use crate::upload::UploadValidator;
use crate::utils::error::{MediaError, MediaResult};
use crate::utils::object_url::ObjectUrlRegistry;
use crate::utils::timers::{TimerArena, TimerKind};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};

/// Callback invoked whenever the usable artifact is produced, replaced or cleared
pub type VideoChangeCallback = Arc<dyn Fn(Option<VideoArtifact>) + Send + Sync>;

/// Everything one recording lifecycle owns
struct Lifecycle {
    state: RecorderState,
    session: Option<Box<dyn MediaSession>>,
    encoder: Option<Box<dyn MediaEncoder>>,
    /// Kill switch of the encoder `stop` is flushing
    flushing: Option<CaptureAbort>,
    timers: TimerArena,
    clock: ElapsedClock,
    max: MaxDuration,
    /// Chunks taken from the encoder so far
    chunks: Vec<Vec<u8>>,
    segments: Vec<RecordingSegment>,
    mime_type: String,
    /// Recording whose processing failed, kept for a retry
    pending: Option<Recording>,
    artifact: Option<VideoArtifact>,
    /// Bumped by every reset
    generation: u64,
}

impl Lifecycle {
    fn new(config: &RecorderConfig) -> Self {
        Self {
            state: RecorderState::Idle,
            session: None,
            encoder: None,
            flushing: None,
            timers: TimerArena::new(),
            clock: ElapsedClock::new(),
            max: config.default_max_duration_secs,
            chunks: Vec::new(),
            segments: Vec::new(),
            mime_type: config.mime_type.clone(),
            pending: None,
            artifact: None,
            generation: 0,
        }
    }

    fn invalid(&self, action: &'static str) -> MediaError {
        MediaError::InvalidTransition {
            action,
            state: self.state.as_str(),
        }
    }

    fn session_live(&self) -> bool {
        self.session.as_ref().map(|s| s.is_ready()).unwrap_or(false)
    }

    fn elapsed_ms(&self, now: Instant) -> f64 {
        self.clock.elapsed(now).as_secs_f64() * 1000.0
    }

    /// Stop capture synchronously, including an encoder mid-flush
    fn abort_capture(&mut self) {
        if let Some(abort) = self.flushing.take() {
            abort.abort();
        }
        if let Some(encoder) = self.encoder.take() {
            encoder.abort_handle().abort();
        }
    }
}

impl Drop for Lifecycle {
    fn drop(&mut self) {
        self.abort_capture();
        if let Some(mut session) = self.session.take() {
            session.stop_tracks();
        }
    }
}

struct Shared {
    lifecycle: Mutex<Lifecycle>,
    acquisition: Arc<dyn MediaAcquisition>,
    compositor: Arc<EffectsCompositor>,
    processor: Arc<PostProcessor>,
    validator: UploadValidator,
    urls: ObjectUrlRegistry,
    config: RecorderConfig,
    events: broadcast::Sender<RecordingEvent>,
    on_video_change: Mutex<Option<VideoChangeCallback>>,
}

/// Drives capture, processing and upload into a single artifact
///
/// Cloning yields another handle to the same controller.
#[derive(Clone)]
pub struct RecordingController {
    shared: Arc<Shared>,
}

impl RecordingController {
    /// Wire a controller around an acquisition backend, a decoder and the
    /// preview surface the live stream is shown on
    pub fn new(
        config: &VideoIntroConfig,
        acquisition: Arc<dyn MediaAcquisition>,
        decoder: Arc<dyn MediaDecoder>,
        surface: SharedSurface,
    ) -> Self {
        let urls = ObjectUrlRegistry::new();
        let processor = Arc::new(PostProcessor::new(
            decoder,
            urls.clone(),
            config.processing.clone(),
        ));
        let validator = UploadValidator::new(Arc::clone(&processor), config.upload.clone());

        let compositor = Arc::new(EffectsCompositor::new(
            surface,
            config.effects.reapply_interval(),
        ));
        match find_background(&config.effects.default_background) {
            Some(option) => compositor.set_background(option),
            None => tracing::warn!(
                "Unknown default background {:?}, using none",
                config.effects.default_background
            ),
        }

        let (events, _) = broadcast::channel(100);

        tracing::info!("Recording controller ready (backend: {})", acquisition.name());

        Self {
            shared: Arc::new(Shared {
                lifecycle: Mutex::new(Lifecycle::new(&config.recorder)),
                acquisition,
                compositor,
                processor,
                validator,
                urls,
                config: config.recorder.clone(),
                events,
                on_video_change: Mutex::new(None),
            }),
        }
    }

    /// Register the single artifact callback of the hosting form
    pub fn set_on_video_change<F>(&self, callback: F)
    where
        F: Fn(Option<VideoArtifact>) + Send + Sync + 'static,
    {
        *self.shared.on_video_change.lock() = Some(Arc::new(callback));
    }

    /// Subscribe to recording events
    pub fn subscribe(&self) -> broadcast::Receiver<RecordingEvent> {
        self.shared.events.subscribe()
    }

    pub fn compositor(&self) -> &Arc<EffectsCompositor> {
        &self.shared.compositor
    }

    pub fn processor(&self) -> &Arc<PostProcessor> {
        &self.shared.processor
    }

    pub fn urls(&self) -> &ObjectUrlRegistry {
        &self.shared.urls
    }

    pub fn state(&self) -> RecorderState {
        self.shared.lifecycle.lock().state
    }

    /// The artifact currently under review
    pub fn artifact(&self) -> Option<VideoArtifact> {
        self.shared.lifecycle.lock().artifact.clone()
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.shared.lifecycle.lock().clock.elapsed(Instant::now()).as_secs_f64()
    }

    /// Snapshot for the host UI
    pub fn status(&self) -> RecorderStatus {
        let lc = self.shared.lifecycle.lock();
        let elapsed = lc.clock.elapsed(Instant::now()).as_secs_f64();
        let max = lc.max.as_secs_f64();

        RecorderStatus {
            state: lc.state,
            elapsed_secs: elapsed,
            max_duration_secs: lc.max.secs(),
            remaining_secs: (max - elapsed).max(0.0),
            has_artifact: lc.artifact.is_some(),
            has_pending_recording: lc.pending.is_some(),
            active_tracks: lc.session.as_ref().map(|s| s.active_track_count()).unwrap_or(0),
            pending_timers: lc.timers.pending(),
        }
    }

    /// Acquire the camera with the configured constraints: Idle -> CameraReady
    pub async fn open_camera(&self) -> MediaResult<()> {
        let generation = {
            let lc = self.shared.lifecycle.lock();
            match lc.state {
                RecorderState::Idle => lc.generation,
                RecorderState::CameraReady => return Ok(()),
                _ => return Err(lc.invalid("open the camera")),
            }
        };

        tracing::info!("Requesting camera via {}", self.shared.acquisition.name());
        let session = match self.shared.acquisition.acquire(&self.shared.config.constraints).await {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("Camera acquisition failed: {}", e);
                self.emit(RecordingEvent::Error(e.to_string()));
                return Err(e);
            }
        };

        if self.shared.lifecycle.lock().generation != generation {
            let mut session = Some(session);
            self.shared.acquisition.release(&mut session);
            tracing::warn!("Reset during camera acquisition, released new session");
            return Err(MediaError::Aborted);
        }

        self.attach_session(session)
    }

    /// Take exclusive ownership of an acquired session: Idle -> CameraReady
    ///
    /// A session that cannot be attached is released.
    pub fn attach_session(&self, session: Box<dyn MediaSession>) -> MediaResult<()> {
        let mut lc = self.shared.lifecycle.lock();
        let mut session = Some(session);

        if lc.state != RecorderState::Idle {
            let err = lc.invalid("attach a camera");
            self.shared.acquisition.release(&mut session);
            return Err(err);
        }

        let Some(session) = session else {
            return Err(MediaError::DeviceUnavailable("no session".to_string()));
        };
        if !session.is_ready() {
            let mut session = Some(session);
            self.shared.acquisition.release(&mut session);
            return Err(MediaError::DeviceUnavailable(
                "session has no live tracks".to_string(),
            ));
        }

        let id = session.id();
        self.shared.compositor.surface().lock().bind_stream(id);
        self.shared.compositor.activate();

        lc.session = Some(session);
        lc.state = RecorderState::CameraReady;
        self.spawn_effects_ticker(&mut lc);
        drop(lc);

        tracing::info!("Camera ready (session {})", id);
        self.emit(RecordingEvent::CameraReady);
        Ok(())
    }

    /// Begin recording: Idle/CameraReady -> Recording
    ///
    /// From Idle the camera is opened first. An encoder that fails to start
    /// leaves the controller in CameraReady.
    pub async fn start(&self, max: MaxDuration) -> MediaResult<()> {
        if self.state() == RecorderState::Idle {
            self.open_camera().await?;
        }

        let result = self.start_encoder(max);
        if let Err(e) = &result {
            tracing::error!("Failed to start recording: {}", e);
            self.emit(RecordingEvent::Error(e.to_string()));
        }
        result
    }

    fn start_encoder(&self, max: MaxDuration) -> MediaResult<()> {
        let mut lc = self.shared.lifecycle.lock();
        if lc.state != RecorderState::CameraReady {
            return Err(lc.invalid("start recording"));
        }

        let options = EncoderOptions {
            mime_type: self.shared.config.mime_type.clone(),
            timeslice: self.shared.config.timeslice(),
        };

        let session = match lc.session.as_mut() {
            Some(session) if session.is_ready() => session,
            _ => {
                return Err(MediaError::DeviceUnavailable(
                    "camera session is no longer live".to_string(),
                ))
            }
        };

        let mut encoder = session.create_encoder(&options).map_err(as_encoder_failure)?;
        encoder.start(options.timeslice).map_err(as_encoder_failure)?;

        let now = Instant::now();
        lc.mime_type = encoder.mime_type().to_string();
        lc.encoder = Some(encoder);
        lc.max = max;
        lc.chunks.clear();
        lc.segments = vec![RecordingSegment::new(0, 0.0)];
        lc.clock.start(now);
        if lc.pending.take().is_some() {
            tracing::info!("Discarded unprocessed recording");
        }
        lc.state = RecorderState::Recording;

        self.spawn_elapsed_ticker(&mut lc);
        if !lc.timers.is_active(TimerKind::EffectsTicker) {
            self.spawn_effects_ticker(&mut lc);
        }
        drop(lc);

        tracing::info!("Recording started (max {}s, {})", max.secs(), options.mime_type);
        self.emit(RecordingEvent::Started);
        Ok(())
    }

    /// Freeze the recording: Recording -> Paused
    pub fn pause(&self) -> MediaResult<()> {
        let mut lc = self.shared.lifecycle.lock();
        if lc.state != RecorderState::Recording {
            return Err(lc.invalid("pause"));
        }

        let (taken, paused) = match lc.encoder.as_mut() {
            Some(encoder) => {
                let taken = encoder.take_chunks();
                let paused = if encoder.supports_pause() {
                    encoder.pause().map(|_| true)
                } else {
                    Ok(false)
                };
                (taken, paused)
            }
            None => (Vec::new(), Ok(false)),
        };
        lc.chunks.extend(taken);
        if !paused? {
            tracing::debug!("Encoder lacks native pause, buffering until resume");
        }

        let now = Instant::now();
        lc.clock.pause(now);
        let elapsed_ms = lc.elapsed_ms(now);
        if let Some(segment) = lc.segments.last_mut() {
            segment.end(elapsed_ms);
        }

        lc.timers.cancel_kind(TimerKind::ElapsedTicker);
        lc.timers.cancel_kind(TimerKind::EffectsTicker);
        lc.state = RecorderState::Paused;
        drop(lc);

        tracing::info!("Recording paused at {:.3}s", elapsed_ms / 1000.0);
        self.emit(RecordingEvent::Paused(elapsed_ms / 1000.0));
        Ok(())
    }

    /// Continue the recording: Paused -> Recording
    pub fn resume(&self) -> MediaResult<()> {
        let mut lc = self.shared.lifecycle.lock();
        if lc.state != RecorderState::Paused {
            return Err(lc.invalid("resume"));
        }
        if !lc.session_live() {
            // Keep what was recorded before the pause and let go of the device
            self.shared.acquisition.release(&mut lc.session);
            self.shared.compositor.surface().lock().unbind_stream();
            self.shared.compositor.teardown();
            drop(lc);

            let err = MediaError::DeviceUnavailable("camera session ended while paused".to_string());
            tracing::warn!("Cannot resume, finishing the recording: {}", err);
            self.emit(RecordingEvent::Error(err.to_string()));
            self.spawn_stop();
            return Err(err);
        }

        if let Some(encoder) = lc.encoder.as_mut() {
            if encoder.supports_pause() {
                encoder.resume().map_err(as_encoder_failure)?;
            } else {
                let discarded = encoder.take_chunks();
                if !discarded.is_empty() {
                    tracing::debug!("Dropped {} chunk(s) captured while paused", discarded.len());
                }
            }
        }

        let now = Instant::now();
        lc.clock.resume(now);
        let index = lc.segments.len();
        let offset_ms = lc.elapsed_ms(now);
        lc.segments.push(RecordingSegment::new(index, offset_ms));
        lc.state = RecorderState::Recording;

        self.spawn_elapsed_ticker(&mut lc);
        self.spawn_effects_ticker(&mut lc);
        drop(lc);

        tracing::info!("Recording resumed at {:.3}s", offset_ms / 1000.0);
        self.emit(RecordingEvent::Resumed);
        Ok(())
    }

    /// Finish the recording and process it: Recording/Paused -> Stopped
    ///
    /// Success moves to Reviewing, releases the camera and hands the artifact
    /// to the callback. Failure returns to CameraReady with the camera still
    /// live, or to Idle if the camera is gone, and keeps the recording for
    /// `retry_processing`. A reset during the flush kills the capture at once
    /// and makes this return `Aborted`.
    pub async fn stop(&self) -> MediaResult<VideoArtifact> {
        let (mut encoder, mut chunks, segments, mime_type, elapsed, max, generation) = {
            let mut lc = self.shared.lifecycle.lock();
            let was_paused = match lc.state {
                RecorderState::Recording => false,
                RecorderState::Paused => true,
                _ => return Err(lc.invalid("stop")),
            };

            let now = Instant::now();
            lc.clock.pause(now);
            let elapsed_ms = lc.elapsed_ms(now);
            if !was_paused {
                if let Some(segment) = lc.segments.last_mut() {
                    segment.end(elapsed_ms);
                }
            }

            lc.timers.cancel_kind(TimerKind::ElapsedTicker);
            lc.timers.cancel_kind(TimerKind::EffectsTicker);

            let mut encoder = lc.encoder.take();
            lc.flushing = encoder.as_ref().map(|e| e.abort_handle());
            let mut chunks = std::mem::take(&mut lc.chunks);
            if let Some(encoder) = encoder.as_mut() {
                let taken = encoder.take_chunks();
                if was_paused && !encoder.supports_pause() {
                    tracing::debug!("Dropped {} chunk(s) captured while paused", taken.len());
                } else {
                    chunks.extend(taken);
                }
            }

            lc.state = RecorderState::Stopped;
            (
                encoder,
                chunks,
                std::mem::take(&mut lc.segments),
                lc.mime_type.clone(),
                elapsed_ms / 1000.0,
                lc.max,
                lc.generation,
            )
        };

        tracing::info!("Recording stopped at {:.3}s", elapsed);
        self.emit(RecordingEvent::Stopped);

        if let Some(encoder) = encoder.as_mut() {
            match encoder.stop().await {
                Ok(tail) => chunks.extend(tail),
                Err(e) => tracing::warn!("Encoder did not flush cleanly: {}", e),
            }
        }
        drop(encoder);

        {
            let mut lc = self.shared.lifecycle.lock();
            if lc.generation != generation {
                tracing::warn!("Controller was reset while flushing, recording discarded");
                return Err(MediaError::Aborted);
            }
            lc.flushing = None;
        }

        let recording = Recording::merge(chunks, mime_type, elapsed, segments);
        self.process(recording, max, generation).await
    }

    /// Process the recording kept after a failed pass: CameraReady/Idle -> Stopped
    pub async fn retry_processing(&self) -> MediaResult<VideoArtifact> {
        let (recording, max, generation) = {
            let mut lc = self.shared.lifecycle.lock();
            if !matches!(lc.state, RecorderState::CameraReady | RecorderState::Idle) {
                return Err(lc.invalid("retry processing"));
            }
            let Some(recording) = lc.pending.take() else {
                return Err(MediaError::InvalidTransition {
                    action: "retry processing",
                    state: "no recording is pending",
                });
            };
            lc.timers.cancel_kind(TimerKind::EffectsTicker);
            lc.state = RecorderState::Stopped;
            (recording, lc.max, lc.generation)
        };

        tracing::info!("Retrying processing of {} byte recording", recording.size());
        self.process(recording, max, generation).await
    }

    async fn process(&self, recording: Recording, max: MaxDuration, generation: u64) -> MediaResult<VideoArtifact> {
        let result = self.shared.processor.from_recording(&recording, max).await;

        let mut lc = self.shared.lifecycle.lock();
        if lc.generation != generation {
            drop(lc);
            if let Ok(artifact) = &result {
                self.shared.urls.revoke(&artifact.thumbnail);
            }
            tracing::warn!("Controller was reset during processing, result discarded");
            return Err(MediaError::Aborted);
        }

        match result {
            Ok(artifact) => {
                self.shared.acquisition.release(&mut lc.session);
                self.shared.compositor.surface().lock().unbind_stream();
                self.shared.compositor.teardown();
                lc.timers.cancel_all();

                let previous = lc.artifact.replace(artifact.clone());
                lc.state = RecorderState::Reviewing;
                drop(lc);

                if let Some(previous) = previous {
                    self.shared.urls.revoke(&previous.thumbnail);
                }

                tracing::info!("Artifact ready: {} ({:.2}s)", artifact.file.name, artifact.duration);
                self.emit(RecordingEvent::ArtifactReady(artifact.duration));
                self.notify(Some(artifact.clone()));
                Ok(artifact)
            }
            Err(e) => {
                lc.pending = Some(recording);
                if lc.session_live() {
                    lc.state = RecorderState::CameraReady;
                    self.spawn_effects_ticker(&mut lc);
                } else {
                    self.shared.acquisition.release(&mut lc.session);
                    self.shared.compositor.surface().lock().unbind_stream();
                    self.shared.compositor.teardown();
                    lc.state = RecorderState::Idle;
                }
                drop(lc);

                tracing::error!("Processing failed, recording kept for retry: {}", e);
                self.emit(RecordingEvent::Error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Validate and process a selected file: Idle/CameraReady/Reviewing -> Reviewing
    ///
    /// A rejected file leaves the controller untouched.
    pub async fn accept_upload(&self, file: MediaFile, max: MaxDuration) -> MediaResult<VideoArtifact> {
        let generation = {
            let lc = self.shared.lifecycle.lock();
            if !accepts_upload(lc.state) {
                return Err(lc.invalid("upload a video"));
            }
            lc.generation
        };

        let artifact = match self.process_upload(file, max).await {
            Ok(artifact) => artifact,
            Err(e) => {
                tracing::warn!("Upload rejected: {}", e);
                self.emit(RecordingEvent::Error(e.to_string()));
                return Err(e);
            }
        };

        let mut lc = self.shared.lifecycle.lock();
        if lc.generation != generation || !accepts_upload(lc.state) {
            let err = if lc.generation != generation {
                MediaError::Aborted
            } else {
                lc.invalid("upload a video")
            };
            drop(lc);
            self.shared.urls.revoke(&artifact.thumbnail);
            return Err(err);
        }

        lc.timers.cancel_all();
        lc.abort_capture();
        self.shared.acquisition.release(&mut lc.session);
        self.shared.compositor.surface().lock().unbind_stream();
        self.shared.compositor.teardown();

        let previous = lc.artifact.replace(artifact.clone());
        lc.pending = None;
        lc.clock.reset();
        lc.max = max;
        lc.state = RecorderState::Reviewing;
        drop(lc);

        if let Some(previous) = previous {
            self.shared.urls.revoke(&previous.thumbnail);
        }

        self.emit(RecordingEvent::ArtifactReady(artifact.duration));
        self.notify(Some(artifact.clone()));
        Ok(artifact)
    }

    async fn process_upload(&self, file: MediaFile, max: MaxDuration) -> MediaResult<VideoArtifact> {
        let upload = self.shared.validator.validate(file, max).await?;
        self.shared
            .processor
            .from_probed_file(upload.file, upload.duration)
            .await
    }

    /// Abort everything and return to Idle
    ///
    /// Synchronously stops every device track, cancels every timer, revokes
    /// every object URL and removes every preview overlay.
    pub fn reset(&self) {
        let had_artifact = {
            let mut lc = self.shared.lifecycle.lock();
            let from = lc.state;

            let timers = lc.timers.cancel_all();
            lc.abort_capture();
            self.shared.acquisition.release(&mut lc.session);
            self.shared.compositor.surface().lock().unbind_stream();
            self.shared.compositor.teardown();
            let urls = self.shared.urls.revoke_all();

            lc.chunks.clear();
            lc.segments.clear();
            lc.pending = None;
            lc.clock.reset();
            lc.generation += 1;
            lc.state = RecorderState::Idle;

            tracing::info!(
                "Reset from {}: cancelled {} timer(s), revoked {} URL(s)",
                from.as_str(),
                timers,
                urls
            );
            lc.artifact.take().is_some()
        };

        self.emit(RecordingEvent::Reset);
        if had_artifact {
            self.notify(None);
        }
    }

    fn spawn_effects_ticker(&self, lc: &mut Lifecycle) {
        lc.timers.cancel_kind(TimerKind::EffectsTicker);

        let compositor = Arc::clone(&self.shared.compositor);
        let cadence = compositor.cadence().max(Duration::from_millis(1));
        lc.timers.spawn(TimerKind::EffectsTicker, async move {
            let mut interval = tokio::time::interval_at(Instant::now() + cadence, cadence);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                compositor.reapply();
            }
        });
    }

    fn spawn_elapsed_ticker(&self, lc: &mut Lifecycle) {
        lc.timers.cancel_kind(TimerKind::ElapsedTicker);

        let weak = Arc::downgrade(&self.shared);
        let period = self.shared.config.tick_interval().max(Duration::from_millis(1));
        let generation = lc.generation;
        lc.timers.spawn(TimerKind::ElapsedTicker, elapsed_ticker(weak, period, generation));
    }

    /// Finish the recording from a task of its own
    fn spawn_stop(&self) {
        let controller = self.clone();
        tokio::spawn(async move {
            if let Err(e) = controller.stop().await {
                tracing::error!("Automatic stop failed: {}", e);
            }
        });
    }

    fn emit(&self, event: RecordingEvent) {
        let _ = self.shared.events.send(event);
    }

    fn notify(&self, artifact: Option<VideoArtifact>) {
        let callback = self.shared.on_video_change.lock().clone();
        if let Some(callback) = callback {
            callback(artifact);
        }
    }
}

/// 1 Hz elapsed-time ticker
///
/// Ticks land on whole multiples of `period` of recording time and the last
/// wait is cut to the time remaining, so the auto-stop fires exactly at the
/// maximum duration.
async fn elapsed_ticker(weak: Weak<Shared>, period: Duration, generation: u64) {
    loop {
        let wait = {
            let Some(shared) = weak.upgrade() else { return };
            let lc = shared.lifecycle.lock();
            if lc.state != RecorderState::Recording || lc.generation != generation {
                return;
            }
            let elapsed = lc.clock.elapsed(Instant::now());
            let remaining = lc.max.as_duration().saturating_sub(elapsed);
            next_tick_wait(elapsed, period).min(remaining)
        };

        tokio::time::sleep(wait).await;

        let Some(shared) = weak.upgrade() else { return };
        let (elapsed, reached, live) = {
            let lc = shared.lifecycle.lock();
            if lc.state != RecorderState::Recording || lc.generation != generation {
                return;
            }
            let elapsed = lc.clock.elapsed(Instant::now());
            (elapsed, elapsed >= lc.max.as_duration(), lc.session_live())
        };

        let _ = shared.events.send(RecordingEvent::Progress(elapsed.as_secs_f64()));

        if reached || !live {
            if reached {
                tracing::info!("Maximum duration reached, stopping");
            } else {
                tracing::warn!("Camera session ended during recording, stopping");
            }
            RecordingController { shared }.spawn_stop();
            return;
        }
    }
}

/// Time until the next whole multiple of `period`
fn next_tick_wait(elapsed: Duration, period: Duration) -> Duration {
    let period_ns = period.as_nanos().max(1);
    let into = elapsed.as_nanos() % period_ns;
    Duration::from_nanos((period_ns - into) as u64)
}

fn accepts_upload(state: RecorderState) -> bool {
    matches!(
        state,
        RecorderState::Idle | RecorderState::CameraReady | RecorderState::Reviewing
    )
}

fn as_encoder_failure(e: MediaError) -> MediaError {
    match e {
        MediaError::EncoderStartFailure(_) => e,
        other => MediaError::EncoderStartFailure(other.to_string()),
    }
}
