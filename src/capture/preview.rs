//! Preview surface model
//!
//! The presentation state of the element showing the live camera: which
//! stream is bound, its filter/transform style and the overlay nodes layered
//! on top of or behind it. The host renders from this model.

use crate::capture::traits::SessionId;
use crate::effects::background::{BlendMode, Fill};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared handle to the preview surface
pub type SharedSurface = Arc<Mutex<PreviewSurface>>;

/// A single CSS-style filter function
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "value")]
pub enum FilterOp {
    /// Gaussian blur radius in pixels
    Blur(f32),
    Brightness(f32),
    Contrast(f32),
}

impl FilterOp {
    pub fn css(&self) -> String {
        match self {
            FilterOp::Blur(px) => format!("blur({}px)", px),
            FilterOp::Brightness(v) => format!("brightness({})", v),
            FilterOp::Contrast(v) => format!("contrast({})", v),
        }
    }
}

/// Presentation attributes of the preview element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewStyle {
    pub filters: Vec<FilterOp>,
    pub scale: f32,
    /// Selfie-style horizontal flip
    pub mirrored: bool,
}

impl Default for PreviewStyle {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            scale: 1.0,
            mirrored: true,
        }
    }
}

impl PreviewStyle {
    /// CSS `filter` value
    pub fn css_filter(&self) -> String {
        if self.filters.is_empty() {
            return "none".to_string();
        }
        self.filters
            .iter()
            .map(FilterOp::css)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// CSS `transform` value
    pub fn css_transform(&self) -> String {
        let flip = if self.mirrored { -1.0 } else { 1.0 };
        format!("scale({}, {})", self.scale * flip, self.scale)
    }

    pub fn is_unfiltered(&self) -> bool {
        self.filters.is_empty() && (self.scale - 1.0).abs() < f32::EPSILON
    }
}

/// Whether an overlay sits above or behind the video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayLayer {
    Above,
    Behind,
}

/// Overlay node injected next to the preview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayNode {
    pub fill: Fill,
    pub blend: BlendMode,
    pub opacity: f32,
    pub layer: OverlayLayer,
}

/// Handle to an overlay node on a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OverlayId(u64);

/// Preview element state
#[derive(Debug, Default)]
pub struct PreviewSurface {
    stream: Option<SessionId>,
    style: PreviewStyle,
    overlays: Vec<(OverlayId, OverlayNode)>,
    next_overlay: u64,
}

impl PreviewSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedSurface {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Show a live stream on the surface
    pub fn bind_stream(&mut self, session: SessionId) {
        tracing::debug!("Preview bound to session {}", session);
        self.stream = Some(session);
    }

    pub fn unbind_stream(&mut self) -> Option<SessionId> {
        self.stream.take()
    }

    pub fn bound_stream(&self) -> Option<SessionId> {
        self.stream
    }

    pub fn style(&self) -> &PreviewStyle {
        &self.style
    }

    pub fn set_style(&mut self, style: PreviewStyle) {
        self.style = style;
    }

    /// Drop filters and scale, as a re-render of the element would
    pub fn reset_style(&mut self) {
        self.style.filters.clear();
        self.style.scale = 1.0;
    }

    pub fn insert_overlay(&mut self, node: OverlayNode) -> OverlayId {
        let id = OverlayId(self.next_overlay);
        self.next_overlay += 1;
        self.overlays.push((id, node));
        id
    }

    pub fn remove_overlay(&mut self, id: OverlayId) -> bool {
        let before = self.overlays.len();
        self.overlays.retain(|(existing, _)| *existing != id);
        self.overlays.len() != before
    }

    pub fn has_overlay(&self, id: OverlayId) -> bool {
        self.overlays.iter().any(|(existing, _)| *existing == id)
    }

    pub fn overlay(&self, id: OverlayId) -> Option<&OverlayNode> {
        self.overlays
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, node)| node)
    }

    pub fn overlays(&self) -> impl Iterator<Item = &OverlayNode> {
        self.overlays.iter().map(|(_, node)| node)
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }
}
