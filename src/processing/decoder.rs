//! Decoder capability used by post-processing and upload probing

use crate::utils::error::{MediaError, MediaResult};
use async_trait::async_trait;
use std::path::Path;

/// A decoded RGB24 frame
#[derive(Debug, Clone, PartialEq)]
pub struct RasterFrame {
    pub width: u32,
    pub height: u32,
    /// Packed RGB, row-major
    pub rgb: Vec<u8>,
}

impl RasterFrame {
    pub fn new(width: u32, height: u32, rgb: Vec<u8>) -> MediaResult<Self> {
        let expected = width as usize * height as usize * 3;
        if width == 0 || height == 0 || rgb.len() != expected {
            return Err(MediaError::ThumbnailExtraction(format!(
                "frame {}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                rgb.len()
            )));
        }
        Ok(Self { width, height, rgb })
    }
}

/// Off-screen media loading
#[async_trait]
pub trait MediaDecoder: Send + Sync {
    /// Load metadata only and return the duration in seconds
    async fn probe_duration(&self, source: &Path) -> MediaResult<f64>;

    /// Seek to `at_secs` and return that frame, scaled down to at most
    /// `max_width` pixels wide
    async fn grab_frame(&self, source: &Path, at_secs: f64, max_width: u32) -> MediaResult<RasterFrame>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_frame_size_check() {
        assert!(RasterFrame::new(2, 2, vec![0; 12]).is_ok());
        assert!(RasterFrame::new(2, 2, vec![0; 11]).is_err());
        assert!(RasterFrame::new(0, 2, Vec::new()).is_err());
    }
}
