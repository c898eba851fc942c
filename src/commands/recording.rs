//! Recording-related commands

use crate::commands::VideoIntroState;
use crate::config::MaxDuration;
use crate::processing::{MediaFile, VideoArtifact};
use crate::recorder::{RecorderStatus, RecordingEvent};
use crate::utils::error::{ErrorResponse, MediaError};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

/// Recorder status plus display strings for the countdown
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderStatusView {
    #[serde(flatten)]
    pub status: RecorderStatus,
    pub elapsed_display: String,
    pub remaining_display: String,
}

/// Selectable maximum durations, in seconds
pub fn get_duration_options() -> Vec<u32> {
    MaxDuration::all().map(MaxDuration::secs).collect()
}

/// Ask for the camera and start previewing
pub async fn open_camera(state: &VideoIntroState) -> Result<(), ErrorResponse> {
    state.controller.open_camera().await.map_err(ErrorResponse::from)
}

/// Start recording with the given maximum duration
pub async fn start_recording(state: &VideoIntroState, max_duration_secs: u32) -> Result<(), ErrorResponse> {
    let max = MaxDuration::try_from_secs(max_duration_secs)?;
    state.controller.start(max).await.map_err(ErrorResponse::from)
}

pub async fn pause_recording(state: &VideoIntroState) -> Result<(), ErrorResponse> {
    state.controller.pause().map_err(ErrorResponse::from)
}

pub async fn resume_recording(state: &VideoIntroState) -> Result<(), ErrorResponse> {
    state.controller.resume().map_err(ErrorResponse::from)
}

/// Stop recording and produce the artifact
pub async fn stop_recording(state: &VideoIntroState) -> Result<VideoArtifact, ErrorResponse> {
    state.controller.stop().await.map_err(ErrorResponse::from)
}

/// Record for `seconds`, or until the maximum duration stops it first
///
/// When the deadline and the automatic stop coincide, whichever stop loses
/// waits for the winner's artifact.
pub async fn record_for(
    state: &VideoIntroState,
    max_duration_secs: u32,
    seconds: u64,
) -> Result<VideoArtifact, ErrorResponse> {
    let mut events = state.controller.subscribe();
    start_recording(state, max_duration_secs).await?;

    let deadline = tokio::time::sleep(Duration::from_secs(seconds));
    tokio::pin!(deadline);
    let mut deadline_passed = false;

    loop {
        tokio::select! {
            _ = &mut deadline, if !deadline_passed => {
                deadline_passed = true;
                match state.controller.stop().await {
                    Ok(artifact) => return Ok(artifact),
                    Err(MediaError::InvalidTransition { state: current, .. }) => {
                        tracing::debug!("Recording already {}, waiting for its outcome", current);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            event = events.recv() => match event {
                Ok(RecordingEvent::Progress(secs)) => tracing::info!("Recording {:.0}s", secs),
                Ok(RecordingEvent::ArtifactReady(_)) => {
                    if let Some(artifact) = state.controller.artifact() {
                        return Ok(artifact);
                    }
                }
                Ok(RecordingEvent::Error(message)) => {
                    return Err(ErrorResponse {
                        code: "RECORDING_FAILED".to_string(),
                        message,
                    });
                }
                Ok(RecordingEvent::Reset) => return Err(MediaError::Aborted.into()),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Missed {} recording event(s)", skipped);
                }
                Err(RecvError::Closed) => return Err(MediaError::Aborted.into()),
            },
        }
    }
}

/// Process the last recording again after a failure
pub async fn retry_processing(state: &VideoIntroState) -> Result<VideoArtifact, ErrorResponse> {
    state.controller.retry_processing().await.map_err(ErrorResponse::from)
}

/// Discard everything and go back to the start
pub async fn reset_recording(state: &VideoIntroState) -> Result<(), ErrorResponse> {
    state.transport.lock().await.unload();
    state.controller.reset();
    Ok(())
}

/// Validate and process a file picked by the user
pub async fn upload_video(
    state: &VideoIntroState,
    path: String,
    max_duration_secs: u32,
) -> Result<VideoArtifact, ErrorResponse> {
    let max = MaxDuration::try_from_secs(max_duration_secs)?;
    let file = MediaFile::from_path(&path)?;

    state
        .controller
        .accept_upload(file, max)
        .await
        .map_err(ErrorResponse::from)
}

pub async fn get_recorder_status(state: &VideoIntroState) -> Result<RecorderStatusView, ErrorResponse> {
    let status = state.controller.status();
    Ok(RecorderStatusView {
        elapsed_display: status.elapsed_display(),
        remaining_display: status.remaining_display(),
        status,
    })
}

/// Local `file://` URL of a thumbnail, while it is still live
pub async fn get_thumbnail_path(state: &VideoIntroState, artifact: VideoArtifact) -> Result<String, ErrorResponse> {
    state
        .controller
        .urls()
        .file_url(&artifact.thumbnail)
        .ok_or_else(|| ErrorResponse {
            code: "THUMBNAIL_REVOKED".to_string(),
            message: format!("Thumbnail {} is no longer available", artifact.thumbnail),
        })
}
