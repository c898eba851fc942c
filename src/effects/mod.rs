//! Live preview effects
//!
//! Blur and virtual-background approximations applied to the camera preview.

pub mod background;
pub mod compositor;

pub use background::{
    builtin_backgrounds, find_background, BackgroundKind, BackgroundOption, BlendMode, Fill,
    VisualSpec,
};
pub use compositor::EffectsCompositor;
