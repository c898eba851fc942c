//! Video Intro - record, review and upload a short video introduction.
//!
//! This is the main library crate of the video introduction engine. It
//! covers camera acquisition, live preview effects, the recording state
//! machine, thumbnail/duration post-processing, upload validation and the
//! review player. Hosts drive it through `commands` and receive finished
//! artifacts through a single callback.

pub mod capture;
pub mod commands;
pub mod config;
pub mod effects;
pub mod playback;
pub mod processing;
pub mod recorder;
pub mod upload;
pub mod utils;

pub use config::{MaxDuration, VideoIntroConfig};
pub use processing::{MediaFile, VideoArtifact};
pub use recorder::{RecorderState, RecordingController, RecordingEvent};
pub use utils::{ErrorResponse, MediaError, MediaResult};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging
///
/// `RUST_LOG` overrides the default `video_intro=debug` filter.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "video_intro=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Video Intro v{}", env!("CARGO_PKG_VERSION"));
}
