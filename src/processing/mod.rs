//! Post-processing
//!
//! Thumbnail extraction and duration probing for recordings and uploads.

pub mod artifact;
pub mod decoder;
pub mod ffmpeg;
pub mod post;
pub mod thumbnail;

pub use artifact::{MediaFile, MediaSource, VideoArtifact};
pub use decoder::{MediaDecoder, RasterFrame};
pub use ffmpeg::FfmpegDecoder;
pub use post::{compress, PostProcessor};
