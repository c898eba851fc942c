//! Recording system module
//!
//! This module implements the recording lifecycle:
//! - RecorderState machine and wall-clock elapsed timing
//! - Recording, the merged chunks of one take
//! - RecordingController owning the session, encoder and timers

pub mod controller;
pub mod recording;
pub mod state;

pub use controller::{RecordingController, VideoChangeCallback};
pub use recording::Recording;
pub use state::{
    format_clock, ElapsedClock, RecorderState, RecorderStatus, RecordingEvent, RecordingSegment,
};
