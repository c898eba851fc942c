//! Utility modules
//!
//! Errors, timer ownership and temporary object URLs shared by every
//! component.

pub mod error;
pub mod object_url;
pub mod timers;

pub use error::{ErrorResponse, MediaError, MediaResult};
pub use object_url::{ObjectUrl, ObjectUrlRegistry};
pub use timers::{TimerArena, TimerId, TimerKind};
