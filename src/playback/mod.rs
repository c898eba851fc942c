//! Artifact playback
//!
//! Review player for produced artifacts.

pub mod surface;
pub mod transport;

pub use surface::{HeadlessSurface, PlaybackSurface};
pub use transport::{format_timestamp, PlaybackState, PlaybackTransport, PlayerView, ProgressBar};
