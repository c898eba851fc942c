//! Recording state management
//!
//! Defines the recorder state machine, the wall-clock elapsed timer and
//! per-segment bookkeeping.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

/// Current state of the recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecorderState {
    /// No camera, no recording
    Idle,
    /// Camera is live and previewing
    CameraReady,
    /// Currently recording
    Recording,
    /// Recording is paused
    Paused,
    /// Capture finished, post-processing in progress
    Stopped,
    /// Artifact produced and under review
    Reviewing,
}

impl RecorderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecorderState::Idle => "idle",
            RecorderState::CameraReady => "camera ready",
            RecorderState::Recording => "recording",
            RecorderState::Paused => "paused",
            RecorderState::Stopped => "processing",
            RecorderState::Reviewing => "reviewing",
        }
    }

    /// States in which the bound session must be live
    pub fn is_capturing(&self) -> bool {
        matches!(self, RecorderState::Recording | RecorderState::Paused)
    }
}

impl Default for RecorderState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Wall-clock elapsed time that can be frozen and resumed
///
/// Elapsed time is derived from instants, never from tick counts.
#[derive(Debug, Clone, Default)]
pub struct ElapsedClock {
    accumulated: Duration,
    running_since: Option<Instant>,
}

impl ElapsedClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) counting from zero
    pub fn start(&mut self, now: Instant) {
        self.accumulated = Duration::ZERO;
        self.running_since = Some(now);
    }

    /// Freeze at the current value
    pub fn pause(&mut self, now: Instant) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += now.saturating_duration_since(since);
        }
    }

    /// Continue counting from the frozen value
    pub fn resume(&mut self, now: Instant) {
        if self.running_since.is_none() {
            self.running_since = Some(now);
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        match self.running_since {
            Some(since) => self.accumulated + now.saturating_duration_since(since),
            None => self.accumulated,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn reset(&mut self) {
        self.accumulated = Duration::ZERO;
        self.running_since = None;
    }
}

/// One continuous stretch of recording between pauses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSegment {
    /// Segment index (0, 1, 2, ...)
    pub index: usize,

    /// Duration of this segment in milliseconds
    pub duration_ms: f64,

    /// Recording time when the segment started
    pub start_offset_ms: f64,

    /// Recording time when the segment ended
    pub end_offset_ms: f64,

    /// Unix timestamp when the segment started
    pub unix_start_ms: u64,

    /// Unix timestamp when the segment ended
    pub unix_end_ms: u64,
}

impl RecordingSegment {
    /// Open a segment at `offset_ms` of recording time
    pub fn new(index: usize, offset_ms: f64) -> Self {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        Self {
            index,
            duration_ms: 0.0,
            start_offset_ms: offset_ms,
            end_offset_ms: offset_ms,
            unix_start_ms: now,
            unix_end_ms: now,
        }
    }

    /// Close the segment at `offset_ms`
    pub fn end(&mut self, offset_ms: f64) {
        self.end_offset_ms = offset_ms;
        self.duration_ms = self.end_offset_ms - self.start_offset_ms;
        self.unix_end_ms = Utc::now().timestamp_millis().max(0) as u64;
    }
}

/// Events emitted by the recorder
#[derive(Debug, Clone, PartialEq)]
pub enum RecordingEvent {
    /// Camera acquired and previewing
    CameraReady,
    Started,
    /// Elapsed seconds, once per tick
    Progress(f64),
    /// Elapsed seconds at the moment of pausing
    Paused(f64),
    Resumed,
    /// Capture finished, processing begins
    Stopped,
    /// Artifact produced (duration in seconds)
    ArtifactReady(f64),
    Error(String),
    Reset,
}

/// Snapshot of the recorder for the host UI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderStatus {
    pub state: RecorderState,
    pub elapsed_secs: f64,
    pub max_duration_secs: u32,
    pub remaining_secs: f64,
    pub has_artifact: bool,
    pub has_pending_recording: bool,
    pub active_tracks: usize,
    pub pending_timers: usize,
}

impl RecorderStatus {
    /// Elapsed time as "MM:SS"
    pub fn elapsed_display(&self) -> String {
        format_clock(self.elapsed_secs)
    }

    /// Time left as "MM:SS"
    pub fn remaining_display(&self) -> String {
        format_clock(self.remaining_secs)
    }
}

/// Format whole seconds as "MM:SS"
pub fn format_clock(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 { secs.floor() as u64 } else { 0 };
    format!("{:02}:{:02}", total / 60, total % 60)
}
