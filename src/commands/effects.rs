//! Background effect commands

use crate::capture::OverlayLayer;
use crate::commands::VideoIntroState;
use crate::effects::{builtin_backgrounds, find_background, BackgroundOption};
use crate::utils::error::ErrorResponse;
use serde::Serialize;

/// CSS the host applies to the preview element and its overlays
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewCss {
    pub filter: String,
    pub transform: String,
    pub overlays: Vec<OverlayCss>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayCss {
    pub background: String,
    pub mix_blend_mode: String,
    pub opacity: f32,
    pub behind: bool,
}

pub fn list_backgrounds() -> Vec<BackgroundOption> {
    builtin_backgrounds()
}

/// Select a background by id
pub async fn set_background(state: &VideoIntroState, id: String) -> Result<BackgroundOption, ErrorResponse> {
    let option = find_background(&id).ok_or_else(|| ErrorResponse {
        code: "UNKNOWN_BACKGROUND".to_string(),
        message: format!("Unknown background: {}", id),
    })?;

    state.controller.compositor().set_background(option.clone());
    Ok(option)
}

/// Current rendering of the preview surface
pub async fn get_preview_css(state: &VideoIntroState) -> Result<PreviewCss, ErrorResponse> {
    let surface = state.preview.lock();
    let style = surface.style();

    Ok(PreviewCss {
        filter: style.css_filter(),
        transform: style.css_transform(),
        overlays: surface
            .overlays()
            .map(|node| OverlayCss {
                background: node.fill.css(),
                mix_blend_mode: node.blend.css().to_string(),
                opacity: node.opacity,
                behind: node.layer == OverlayLayer::Behind,
            })
            .collect(),
    })
}
