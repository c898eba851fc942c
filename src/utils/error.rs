//! Error types and handling
//!
//! Every failure the capture, processing and playback engine can report,
//! plus the response shape handed to the hosting form for inline messages.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Engine-wide error type
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Camera or microphone permission denied: {0}")]
    PermissionDenied(String),

    #[error("No camera or microphone available: {0}")]
    DeviceUnavailable(String),

    #[error("Video capture is not supported here: {0}")]
    NotSupported(String),

    #[error("Failed to start recording: {0}")]
    EncoderStartFailure(String),

    #[error("Failed to finalize recording: {0}")]
    EncoderFinalize(String),

    #[error("Failed to extract thumbnail: {0}")]
    ThumbnailExtraction(String),

    #[error("Failed to read video duration: {0}")]
    DurationProbe(String),

    #[error("Invalid file type '{0}', please select a video file")]
    InvalidMediaType(String),

    #[error("File is too large ({size} bytes), the maximum is {max} bytes")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Video is {duration:.1}s long, the maximum is {max}s")]
    DurationExceeded { duration: f64, max: u32 },

    #[error("Failed to load video for playback: {0}")]
    PlaybackLoad(String),

    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("Unsupported playback rate: {0}")]
    UnsupportedRate(f32),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Operation aborted by reset")]
    Aborted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MediaError {
    /// Stable code used by the host to pick a message or affordance
    pub fn code(&self) -> &'static str {
        match self {
            MediaError::PermissionDenied(_) => "PERMISSION_DENIED",
            MediaError::DeviceUnavailable(_) => "DEVICE_UNAVAILABLE",
            MediaError::NotSupported(_) => "NOT_SUPPORTED",
            MediaError::EncoderStartFailure(_) => "ENCODER_START_FAILURE",
            MediaError::EncoderFinalize(_) => "ENCODER_FINALIZE_ERROR",
            MediaError::ThumbnailExtraction(_) => "THUMBNAIL_EXTRACTION_ERROR",
            MediaError::DurationProbe(_) => "DURATION_PROBE_ERROR",
            MediaError::InvalidMediaType(_) => "INVALID_MEDIA_TYPE",
            MediaError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            MediaError::DurationExceeded { .. } => "DURATION_EXCEEDED",
            MediaError::PlaybackLoad(_) => "PLAYBACK_LOAD_ERROR",
            MediaError::InvalidTransition { .. } => "INVALID_TRANSITION",
            MediaError::UnsupportedRate(_) => "UNSUPPORTED_RATE",
            MediaError::InvalidConfig(_) => "INVALID_CONFIG",
            MediaError::Aborted => "ABORTED",
            MediaError::Io(_) => "IO_ERROR",
        }
    }

    /// Whether the error belongs to the upload validation group
    pub fn is_upload_rejection(&self) -> bool {
        matches!(
            self,
            MediaError::InvalidMediaType(_)
                | MediaError::FileTooLarge { .. }
                | MediaError::DurationExceeded { .. }
        )
    }
}

/// Error response for the hosting form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&MediaError> for ErrorResponse {
    fn from(error: &MediaError) -> Self {
        ErrorResponse {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

impl From<MediaError> for ErrorResponse {
    fn from(error: MediaError) -> Self {
        ErrorResponse::from(&error)
    }
}

/// Result type alias using MediaError
pub type MediaResult<T> = Result<T, MediaError>;
