//! Preview effects compositor
//!
//! Applies the selected background option to the preview surface. The
//! compositor only touches presentation attributes; it never sees the media
//! session. Reapplication is driven by a ticker owned by the recording
//! lifecycle.

use crate::capture::preview::{FilterOp, OverlayId, OverlayNode, PreviewStyle, SharedSurface};
use crate::capture::PreviewSurface;
use crate::effects::background::{BackgroundOption, VisualSpec};
use parking_lot::Mutex;
use std::time::Duration;

struct CompositorState {
    selected: BackgroundOption,
    /// Effects are only shown while a session is live
    live: bool,
    overlay: Option<OverlayId>,
    /// Style of the preview before any effect touched it
    original: Option<PreviewStyle>,
}

/// Applies background effects to a preview surface
pub struct EffectsCompositor {
    surface: SharedSurface,
    cadence: Duration,
    state: Mutex<CompositorState>,
}

impl EffectsCompositor {
    pub fn new(surface: SharedSurface, cadence: Duration) -> Self {
        Self {
            surface,
            cadence,
            state: Mutex::new(CompositorState {
                selected: BackgroundOption::none(),
                live: false,
                overlay: None,
                original: None,
            }),
        }
    }

    pub fn surface(&self) -> &SharedSurface {
        &self.surface
    }

    /// Interval at which the lifecycle should call `reapply`
    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    pub fn selected(&self) -> BackgroundOption {
        self.state.lock().selected.clone()
    }

    pub fn is_live(&self) -> bool {
        self.state.lock().live
    }

    /// Select a background. Previous effects are removed first.
    pub fn set_background(&self, option: BackgroundOption) {
        let mut state = self.state.lock();
        let mut surface = self.surface.lock();

        Self::clear(&mut state, &mut surface);
        tracing::info!("Background set to {}", option.id);
        state.selected = option;

        if state.live {
            Self::apply(&mut state, &mut surface);
        }
    }

    /// Start showing effects, called when a session goes live
    pub fn activate(&self) {
        let mut state = self.state.lock();
        let mut surface = self.surface.lock();
        state.live = true;
        Self::apply(&mut state, &mut surface);
    }

    /// Restore styles and overlays if something reset them.
    /// Returns false when there is nothing to apply.
    pub fn reapply(&self) -> bool {
        let mut state = self.state.lock();
        if !state.live || state.selected.is_none() {
            return false;
        }
        let mut surface = self.surface.lock();
        Self::apply(&mut state, &mut surface);
        true
    }

    /// Remove every effect, called when the session ends
    pub fn teardown(&self) {
        let mut state = self.state.lock();
        let mut surface = self.surface.lock();
        Self::clear(&mut state, &mut surface);
        state.live = false;
    }

    fn apply(state: &mut CompositorState, surface: &mut PreviewSurface) {
        if state.selected.is_none() {
            return;
        }

        let base = match &state.original {
            Some(original) => original.clone(),
            None => {
                let original = surface.style().clone();
                state.original = Some(original.clone());
                original
            }
        };

        match &state.selected.visual {
            VisualSpec::None => {}
            VisualSpec::Blur { radius_px, scale } => {
                let mut style = base.clone();
                style.filters.push(FilterOp::Blur(*radius_px));
                style.scale = base.scale * scale;
                surface.set_style(style);
            }
            VisualSpec::Virtual {
                fill,
                blend,
                opacity,
                layer,
                brightness,
                contrast,
            } => {
                let mut style = base;
                style.filters.push(FilterOp::Brightness(*brightness));
                style.filters.push(FilterOp::Contrast(*contrast));
                surface.set_style(style);

                let present = state.overlay.map(|id| surface.has_overlay(id)).unwrap_or(false);
                if !present {
                    let id = surface.insert_overlay(OverlayNode {
                        fill: fill.clone(),
                        blend: *blend,
                        opacity: *opacity,
                        layer: *layer,
                    });
                    state.overlay = Some(id);
                }
            }
        }
    }

    fn clear(state: &mut CompositorState, surface: &mut PreviewSurface) {
        if let Some(id) = state.overlay.take() {
            surface.remove_overlay(id);
        }
        if let Some(original) = state.original.take() {
            surface.set_style(original);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::background::{builtin_backgrounds, find_background};

    fn compositor() -> EffectsCompositor {
        EffectsCompositor::new(PreviewSurface::shared(), Duration::from_millis(500))
    }

    fn overlay_count(compositor: &EffectsCompositor) -> usize {
        compositor.surface().lock().overlay_count()
    }

    #[test]
    fn test_blur_scales_preview() {
        let compositor = compositor();
        compositor.activate();
        compositor.set_background(BackgroundOption::blur());

        let style = compositor.surface().lock().style().clone();
        assert_eq!(style.filters, vec![FilterOp::Blur(10.0)]);
        assert!((style.scale - 1.1).abs() < 1e-6);
        assert_eq!(overlay_count(&compositor), 0);
    }

    #[test]
    fn test_virtual_to_none_restores_everything() {
        let compositor = compositor();
        compositor.activate();
        let original = compositor.surface().lock().style().clone();

        for option in builtin_backgrounds().into_iter().filter(|o| o.id.starts_with("virtual-")) {
            compositor.set_background(option);
            assert_eq!(overlay_count(&compositor), 1);
            assert!(!compositor.surface().lock().style().is_unfiltered());

            compositor.set_background(BackgroundOption::none());
            assert_eq!(overlay_count(&compositor), 0);
            assert_eq!(compositor.surface().lock().style(), &original);
        }
    }

    #[test]
    fn test_reapply_survives_external_reset() {
        let compositor = compositor();
        compositor.activate();
        compositor.set_background(find_background("virtual-office").unwrap());
        let applied = compositor.surface().lock().style().clone();

        compositor.surface().lock().reset_style();
        assert!(compositor.reapply());
        assert_eq!(compositor.surface().lock().style(), &applied);

        // Repeated reapplication does not stack filters or overlays
        assert!(compositor.reapply());
        assert_eq!(compositor.surface().lock().style(), &applied);
        assert_eq!(overlay_count(&compositor), 1);
    }

    #[test]
    fn test_selection_waits_for_live_session() {
        let compositor = compositor();
        compositor.set_background(find_background("virtual-studio").unwrap());
        assert_eq!(overlay_count(&compositor), 0);
        assert!(!compositor.reapply());

        compositor.activate();
        assert_eq!(overlay_count(&compositor), 1);

        compositor.teardown();
        assert_eq!(overlay_count(&compositor), 0);
        assert!(compositor.surface().lock().style().is_unfiltered());
        assert_eq!(compositor.selected().id, "virtual-studio");
    }
}
