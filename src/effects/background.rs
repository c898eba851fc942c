//! Background options
//!
//! Virtual backgrounds are a styling approximation: a color or gradient
//! layer blended with the camera image. No foreground segmentation happens.

use crate::capture::preview::OverlayLayer;
use serde::{Deserialize, Serialize};

/// Blur radius applied by the `blur` option (pixels)
pub const BLUR_RADIUS_PX: f32 = 10.0;
/// Scale that pushes blurred edges outside the preview frame
pub const BLUR_EDGE_SCALE: f32 = 1.1;

/// Effect family of an option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundKind {
    None,
    Blur,
    Virtual,
}

/// How an overlay combines with the video underneath
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    Normal,
    Multiply,
    Overlay,
    Screen,
    SoftLight,
}

impl BlendMode {
    /// CSS `mix-blend-mode` value
    pub fn css(&self) -> &'static str {
        match self {
            BlendMode::Normal => "normal",
            BlendMode::Multiply => "multiply",
            BlendMode::Overlay => "overlay",
            BlendMode::Screen => "screen",
            BlendMode::SoftLight => "soft-light",
        }
    }
}

/// Paint of an overlay node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "value")]
pub enum Fill {
    Solid(String),
    LinearGradient { angle_deg: f32, stops: Vec<String> },
}

impl Fill {
    /// CSS `background` value
    pub fn css(&self) -> String {
        match self {
            Fill::Solid(color) => color.clone(),
            Fill::LinearGradient { angle_deg, stops } => {
                format!("linear-gradient({}deg, {})", angle_deg, stops.join(", "))
            }
        }
    }
}

/// What an option does to the preview
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum VisualSpec {
    None,
    Blur {
        radius_px: f32,
        scale: f32,
    },
    Virtual {
        fill: Fill,
        blend: BlendMode,
        opacity: f32,
        layer: OverlayLayer,
        brightness: f32,
        contrast: f32,
    },
}

/// A selectable background
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundOption {
    pub id: String,
    pub name: String,
    pub kind: BackgroundKind,
    pub visual: VisualSpec,
}

impl BackgroundOption {
    pub fn none() -> Self {
        Self {
            id: "none".to_string(),
            name: "None".to_string(),
            kind: BackgroundKind::None,
            visual: VisualSpec::None,
        }
    }

    pub fn blur() -> Self {
        Self {
            id: "blur".to_string(),
            name: "Blur".to_string(),
            kind: BackgroundKind::Blur,
            visual: VisualSpec::Blur {
                radius_px: BLUR_RADIUS_PX,
                scale: BLUR_EDGE_SCALE,
            },
        }
    }

    /// A virtual background painted with `fill`
    pub fn virtual_fill(id: &str, name: &str, fill: Fill, blend: BlendMode) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: BackgroundKind::Virtual,
            visual: VisualSpec::Virtual {
                fill,
                blend,
                opacity: 0.35,
                layer: OverlayLayer::Above,
                brightness: 1.1,
                contrast: 1.1,
            },
        }
    }

    pub fn is_none(&self) -> bool {
        self.kind == BackgroundKind::None
    }
}

impl Default for BackgroundOption {
    fn default() -> Self {
        Self::none()
    }
}

/// Options offered to the user, in display order
pub fn builtin_backgrounds() -> Vec<BackgroundOption> {
    vec![
        BackgroundOption::none(),
        BackgroundOption::blur(),
        BackgroundOption::virtual_fill(
            "virtual-office",
            "Office",
            Fill::LinearGradient {
                angle_deg: 180.0,
                stops: vec!["#d7d2cc".to_string(), "#304352".to_string()],
            },
            BlendMode::Multiply,
        ),
        BackgroundOption::virtual_fill(
            "virtual-nature",
            "Nature",
            Fill::LinearGradient {
                angle_deg: 135.0,
                stops: vec!["#a8e063".to_string(), "#56ab2f".to_string()],
            },
            BlendMode::SoftLight,
        ),
        BackgroundOption::virtual_fill(
            "virtual-gradient",
            "Gradient",
            Fill::LinearGradient {
                angle_deg: 135.0,
                stops: vec!["#667eea".to_string(), "#764ba2".to_string()],
            },
            BlendMode::Overlay,
        ),
        BackgroundOption::virtual_fill(
            "virtual-studio",
            "Studio",
            Fill::Solid("#1f2937".to_string()),
            BlendMode::Multiply,
        ),
    ]
}

/// Look up a built-in option by id
pub fn find_background(id: &str) -> Option<BackgroundOption> {
    builtin_backgrounds().into_iter().find(|option| option.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_ids_are_unique() {
        let options = builtin_backgrounds();
        let mut ids: Vec<&str> = options.iter().map(|o| o.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), options.len());
        assert!(options
            .iter()
            .filter(|o| o.id.starts_with("virtual-"))
            .all(|o| o.kind == BackgroundKind::Virtual));
    }

    #[test]
    fn test_fill_css() {
        let fill = Fill::LinearGradient {
            angle_deg: 135.0,
            stops: vec!["#667eea".to_string(), "#764ba2".to_string()],
        };
        assert_eq!(fill.css(), "linear-gradient(135deg, #667eea, #764ba2)");
        assert_eq!(BlendMode::SoftLight.css(), "soft-light");
    }

    #[test]
    fn test_find_background() {
        assert_eq!(find_background("blur"), Some(BackgroundOption::blur()));
        assert!(find_background("virtual-moon").is_none());
    }
}
