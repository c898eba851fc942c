//! Camera and microphone capture
//!
//! Capability traits for acquisition and encoding, the preview surface the
//! live stream is bound to, and an ffmpeg-backed implementation.

pub mod ffmpeg;
pub mod preview;
pub mod traits;

pub use ffmpeg::{CaptureInput, FfmpegAcquisition};
pub use preview::{
    FilterOp, OverlayId, OverlayLayer, OverlayNode, PreviewStyle, PreviewSurface, SharedSurface,
};
pub use traits::{
    AudioConstraints, CaptureAbort, EncoderOptions, FacingMode, MediaAcquisition, MediaConstraints,
    MediaEncoder, MediaSession, SessionId, TrackInfo, TrackKind, VideoConstraints,
};
