//! FFmpeg-backed camera capture
//!
//! Records camera and microphone through `ffmpeg` child processes that
//! write WebM to stdout, one process per stretch between pauses. Clusters
//! are cut on the requested timeslice. A pause finalizes the running
//! segment and a resume starts the next one.

use crate::capture::traits::{
    CaptureAbort, EncoderOptions, MediaAcquisition, MediaConstraints, MediaEncoder, MediaSession, SessionId,
    TrackInfo, TrackKind,
};
use crate::utils::error::{MediaError, MediaResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio::time::Instant;

const OUTPUT_MIME: &str = "video/webm;codecs=vp8,opus";
const READ_BUFFER_BYTES: usize = 64 * 1024;
const STOP_TIMEOUT: Duration = Duration::from_secs(5);
const EXIT_POLL: Duration = Duration::from_millis(50);

/// Platform input description for ffmpeg
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureInput {
    /// ffmpeg demuxer, e.g. "v4l2" or "avfoundation"
    pub video_format: String,
    pub video_device: String,
    /// Separate audio demuxer and device, if the platform needs one
    pub audio: Option<(String, String)>,
    /// Device node to check before spawning, if any
    pub device_node: Option<PathBuf>,
}

impl CaptureInput {
    /// Default devices for the current platform
    pub fn system_default() -> MediaResult<Self> {
        #[cfg(target_os = "linux")]
        {
            Ok(Self {
                video_format: "v4l2".to_string(),
                video_device: "/dev/video0".to_string(),
                audio: Some(("alsa".to_string(), "default".to_string())),
                device_node: Some(PathBuf::from("/dev/video0")),
            })
        }

        #[cfg(target_os = "macos")]
        {
            Ok(Self {
                video_format: "avfoundation".to_string(),
                video_device: "0:0".to_string(),
                audio: None,
                device_node: None,
            })
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            Err(MediaError::NotSupported(
                "ffmpeg camera capture is only available on Linux and macOS".to_string(),
            ))
        }
    }
}

/// Acquires capture sessions that record through ffmpeg
pub struct FfmpegAcquisition {
    program: PathBuf,
    input: Option<CaptureInput>,
}

impl FfmpegAcquisition {
    /// Use `ffmpeg` from PATH with the platform default devices
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            input: None,
        }
    }

    pub fn with_input(mut self, input: CaptureInput) -> Self {
        self.input = Some(input);
        self
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    async fn check_ffmpeg(&self) -> MediaResult<()> {
        let status = Command::new(&self.program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => {
                    MediaError::NotSupported(format!("{} not found", self.program.display()))
                }
                _ => MediaError::NotSupported(format!("Failed to run ffmpeg: {}", e)),
            })?;

        if !status.success() {
            return Err(MediaError::NotSupported(format!(
                "ffmpeg exited with {}",
                status
            )));
        }
        Ok(())
    }
}

impl Default for FfmpegAcquisition {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaAcquisition for FfmpegAcquisition {
    async fn acquire(&self, constraints: &MediaConstraints) -> MediaResult<Box<dyn MediaSession>> {
        let input = match &self.input {
            Some(input) => input.clone(),
            None => CaptureInput::system_default()?,
        };

        self.check_ffmpeg().await?;

        if let Some(node) = &input.device_node {
            if let Err(e) = tokio::fs::File::open(node).await {
                return Err(match e.kind() {
                    ErrorKind::NotFound => {
                        MediaError::DeviceUnavailable(format!("{} does not exist", node.display()))
                    }
                    ErrorKind::PermissionDenied => {
                        MediaError::PermissionDenied(format!("cannot open {}", node.display()))
                    }
                    _ => MediaError::DeviceUnavailable(format!("{}: {}", node.display(), e)),
                });
            }
        }

        let session = FfmpegSession::new(self.program.clone(), input, constraints.clone());
        tracing::info!("Acquired ffmpeg capture session {}", session.id);
        Ok(Box::new(session))
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Session holding the selected devices until an encoder opens them
pub struct FfmpegSession {
    id: SessionId,
    program: PathBuf,
    input: CaptureInput,
    constraints: MediaConstraints,
    tracks: Vec<TrackInfo>,
}

impl FfmpegSession {
    fn new(program: PathBuf, input: CaptureInput, constraints: MediaConstraints) -> Self {
        let mut tracks = vec![TrackInfo {
            kind: TrackKind::Video,
            label: input.video_device.clone(),
            live: true,
        }];
        if constraints.audio.enabled {
            let label = input
                .audio
                .as_ref()
                .map(|(_, device)| device.clone())
                .unwrap_or_else(|| input.video_device.clone());
            tracks.push(TrackInfo {
                kind: TrackKind::Audio,
                label,
                live: true,
            });
        }

        Self {
            id: SessionId::new(),
            program,
            input,
            constraints,
            tracks,
        }
    }
}

impl MediaSession for FfmpegSession {
    fn id(&self) -> SessionId {
        self.id
    }

    fn is_ready(&self) -> bool {
        self.tracks.iter().any(|t| t.live)
    }

    fn tracks(&self) -> Vec<TrackInfo> {
        self.tracks.clone()
    }

    fn stop_tracks(&mut self) {
        for track in &mut self.tracks {
            track.live = false;
        }
    }

    fn create_encoder(&mut self, options: &EncoderOptions) -> MediaResult<Box<dyn MediaEncoder>> {
        if !self.is_ready() {
            return Err(MediaError::EncoderStartFailure(
                "session has no live tracks".to_string(),
            ));
        }
        if !options.mime_type.starts_with("video/webm") {
            tracing::warn!(
                "ffmpeg capture only produces WebM, ignoring requested {}",
                options.mime_type
            );
        }

        let args = capture_args(&self.input, &self.constraints, options.timeslice);
        Ok(Box::new(FfmpegEncoder::new(self.program.clone(), args)))
    }
}

/// Build the ffmpeg command line for a capture
pub fn capture_args(
    input: &CaptureInput,
    constraints: &MediaConstraints,
    timeslice: Duration,
) -> Vec<String> {
    let video = &constraints.video;
    let mut args = vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        input.video_format.clone(),
        "-framerate".to_string(),
        video.frame_rate.to_string(),
        "-video_size".to_string(),
        format!("{}x{}", video.width, video.height),
        "-i".to_string(),
        input.video_device.clone(),
    ];

    let with_audio = constraints.audio.enabled;
    if with_audio {
        if let Some((format, device)) = &input.audio {
            args.extend(["-f".to_string(), format.clone(), "-i".to_string(), device.clone()]);
        }
    }

    args.extend([
        "-c:v".to_string(),
        "libvpx".to_string(),
        "-deadline".to_string(),
        "realtime".to_string(),
        "-cpu-used".to_string(),
        "8".to_string(),
        "-b:v".to_string(),
        "1M".to_string(),
    ]);

    if with_audio {
        args.extend([
            "-c:a".to_string(),
            "libopus".to_string(),
            "-b:a".to_string(),
            "96k".to_string(),
        ]);
    } else {
        args.push("-an".to_string());
    }

    args.extend([
        "-f".to_string(),
        "webm".to_string(),
        "-cluster_time_limit".to_string(),
        timeslice.as_millis().to_string(),
        "-flush_packets".to_string(),
        "1".to_string(),
        "pipe:1".to_string(),
    ]);

    args
}

/// Running ffmpeg processes of one encoder, keyed by segment index
///
/// Kept behind a lock so they can be killed without awaiting anything.
#[derive(Clone, Default)]
struct ProcessSet(Arc<Mutex<HashMap<usize, Child>>>);

impl ProcessSet {
    fn insert(&self, index: usize, child: Child) {
        self.0.lock().insert(index, child);
    }

    fn kill_all(&self) -> usize {
        let mut children = self.0.lock();
        let count = children.len();
        for (index, mut child) in children.drain() {
            if let Err(e) = child.start_kill() {
                tracing::debug!("ffmpeg segment {} already exited: {}", index, e);
            }
        }
        count
    }

    /// Wait for a segment's process to exit, killing it after `timeout`
    async fn wait(&self, index: usize, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        loop {
            {
                let mut children = self.0.lock();
                let Some(child) = children.get_mut(&index) else {
                    return;
                };
                match child.try_wait() {
                    Ok(Some(status)) => {
                        tracing::debug!("ffmpeg segment {} exited with {}", index, status);
                        children.remove(&index);
                        return;
                    }
                    Ok(None) if Instant::now() >= deadline => {
                        tracing::warn!("ffmpeg segment {} did not exit in time, killing it", index);
                        if let Some(mut child) = children.remove(&index) {
                            if let Err(e) = child.start_kill() {
                                tracing::warn!("Failed to kill ffmpeg: {}", e);
                            }
                        }
                        return;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!("Failed to wait for ffmpeg: {}", e);
                        children.remove(&index);
                        return;
                    }
                }
            }
            tokio::time::sleep(EXIT_POLL).await;
        }
    }
}

/// One ffmpeg process, covering one stretch between pauses
struct SegmentCapture {
    index: usize,
    stdin: Option<ChildStdin>,
    reader: JoinHandle<Vec<u8>>,
}

/// Encoder running one ffmpeg process per pause/resume cycle
///
/// Every segment is a complete WebM file. `stop` joins them with ffmpeg's
/// concat demuxer, which also closes the paused gaps in the timeline, so
/// nothing is handed out through `take_chunks` before then.
pub struct FfmpegEncoder {
    program: PathBuf,
    args: Vec<String>,
    processes: ProcessSet,
    current: Option<SegmentCapture>,
    finishing: Vec<JoinHandle<Vec<u8>>>,
    next_index: usize,
    started: bool,
}

impl FfmpegEncoder {
    fn new(program: PathBuf, args: Vec<String>) -> Self {
        Self {
            program,
            args,
            processes: ProcessSet::default(),
            current: None,
            finishing: Vec::new(),
            next_index: 0,
            started: false,
        }
    }

    fn spawn_segment(&mut self) -> MediaResult<()> {
        let index = self.next_index;
        tracing::info!("Starting ffmpeg capture segment {}: {:?}", index, self.args);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| MediaError::EncoderStartFailure(format!("Failed to start ffmpeg: {}", e)))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            MediaError::EncoderStartFailure("Failed to capture ffmpeg stdout".to_string())
        })?;
        let stdin = child.stdin.take();

        self.processes.insert(index, child);
        self.current = Some(SegmentCapture {
            index,
            stdin,
            reader: tokio::spawn(read_segment(stdout)),
        });
        self.next_index += 1;
        Ok(())
    }

    /// Ask the current segment's ffmpeg to finish its file in the background
    fn finish_current(&mut self) {
        if let Some(segment) = self.current.take() {
            tracing::debug!("Finalizing ffmpeg capture segment {}", segment.index);
            let processes = self.processes.clone();
            self.finishing.push(tokio::spawn(finish_segment(processes, segment)));
        }
    }
}

async fn read_segment(mut stdout: ChildStdout) -> Vec<u8> {
    let mut data = Vec::new();
    let mut buf = vec![0u8; READ_BUFFER_BYTES];
    loop {
        match stdout.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => data.extend_from_slice(&buf[..n]),
            Err(e) => {
                tracing::warn!("ffmpeg capture read failed: {}", e);
                break;
            }
        }
    }
    data
}

async fn finish_segment(processes: ProcessSet, segment: SegmentCapture) -> Vec<u8> {
    let SegmentCapture {
        index,
        stdin,
        reader,
    } = segment;

    // 'q' asks ffmpeg to write the container trailer and exit
    if let Some(mut stdin) = stdin {
        if let Err(e) = stdin.write_all(b"q").await {
            tracing::debug!("ffmpeg segment {} stdin already closed: {}", index, e);
        }
    }
    processes.wait(index, STOP_TIMEOUT).await;

    match reader.await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("ffmpeg reader task failed: {}", e);
            Vec::new()
        }
    }
}

/// Concat demuxer list for `paths`
pub fn concat_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| {
            let escaped = path.to_string_lossy().replace('\'', r"'\''");
            format!("file '{}'\n", escaped)
        })
        .collect()
}

/// Join WebM segments into one file, rebasing timestamps
pub async fn concat_segments(program: &Path, segments: Vec<Vec<u8>>) -> MediaResult<Vec<u8>> {
    let mut segments: Vec<Vec<u8>> = segments.into_iter().filter(|s| !s.is_empty()).collect();
    if segments.len() <= 1 {
        return Ok(segments.pop().unwrap_or_default());
    }

    let dir = tempfile::tempdir()?;
    let mut paths = Vec::with_capacity(segments.len());
    for (i, bytes) in segments.iter().enumerate() {
        let path = dir.path().join(format!("segment-{:03}.webm", i));
        tokio::fs::write(&path, bytes).await?;
        paths.push(path);
    }
    let list = dir.path().join("segments.txt");
    tokio::fs::write(&list, concat_list(&paths)).await?;

    let output = Command::new(program)
        .args(["-v", "error", "-f", "concat", "-safe", "0", "-i"])
        .arg(&list)
        .args(["-c", "copy", "-f", "webm", "pipe:1"])
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| MediaError::EncoderFinalize(format!("Failed to run ffmpeg: {}", e)))?;

    if !output.status.success() {
        return Err(MediaError::EncoderFinalize(format!(
            "ffmpeg concat failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    tracing::info!(
        "Joined {} capture segments into {} bytes",
        segments.len(),
        output.stdout.len()
    );
    Ok(output.stdout)
}

#[async_trait]
impl MediaEncoder for FfmpegEncoder {
    fn mime_type(&self) -> &str {
        OUTPUT_MIME
    }

    fn start(&mut self, _timeslice: Duration) -> MediaResult<()> {
        if self.started {
            return Err(MediaError::EncoderStartFailure(
                "encoder already started".to_string(),
            ));
        }
        self.spawn_segment()?;
        self.started = true;
        Ok(())
    }

    fn supports_pause(&self) -> bool {
        true
    }

    fn pause(&mut self) -> MediaResult<()> {
        self.finish_current();
        Ok(())
    }

    fn resume(&mut self) -> MediaResult<()> {
        if !self.started || self.current.is_some() {
            return Ok(());
        }
        self.spawn_segment()
    }

    /// Segments are only released, joined, by `stop`
    fn take_chunks(&mut self) -> Vec<Vec<u8>> {
        Vec::new()
    }

    async fn stop(&mut self) -> MediaResult<Vec<Vec<u8>>> {
        self.finish_current();
        self.started = false;

        let mut segments = Vec::new();
        for handle in std::mem::take(&mut self.finishing) {
            match handle.await {
                Ok(bytes) => segments.push(bytes),
                Err(e) => tracing::warn!("ffmpeg segment task failed: {}", e),
            }
        }

        let merged = concat_segments(&self.program, segments).await?;
        Ok(if merged.is_empty() { Vec::new() } else { vec![merged] })
    }

    fn abort_handle(&self) -> CaptureAbort {
        let processes = self.processes.clone();
        CaptureAbort::new(move || {
            let killed = processes.kill_all();
            if killed > 0 {
                tracing::info!("Killed {} ffmpeg capture process(es)", killed);
            }
        })
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        self.processes.kill_all();
        if let Some(segment) = self.current.take() {
            segment.reader.abort();
        }
        for handle in self.finishing.drain(..) {
            handle.abort();
        }
    }
}
