//! FFmpeg decoder
//!
//! Duration comes from ffprobe's container metadata; thumbnails are a single
//! frame piped out of ffmpeg as PNG.

use crate::processing::decoder::{MediaDecoder, RasterFrame};
use crate::processing::thumbnail::decode_png;
use crate::utils::error::{MediaError, MediaResult};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Decoder shelling out to `ffprobe`/`ffmpeg`
pub struct FfmpegDecoder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegDecoder {
    pub fn new() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }

    pub fn with_programs(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaDecoder for FfmpegDecoder {
    async fn probe_duration(&self, source: &Path) -> MediaResult<f64> {
        let output = Command::new(&self.ffprobe)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(source)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| MediaError::DurationProbe(format!("Failed to run ffprobe: {}", e)))?;

        if !output.status.success() {
            return Err(MediaError::DurationProbe(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_duration(&String::from_utf8_lossy(&output.stdout))
    }

    async fn grab_frame(&self, source: &Path, at_secs: f64, max_width: u32) -> MediaResult<RasterFrame> {
        let scale = format!("scale='min({},iw)':-2", max_width);
        let output = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-ss", &format!("{:.3}", at_secs.max(0.0)), "-i"])
            .arg(source)
            .args([
                "-frames:v",
                "1",
                "-vf",
                &scale,
                "-f",
                "image2pipe",
                "-vcodec",
                "png",
                "-pix_fmt",
                "rgb24",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| MediaError::ThumbnailExtraction(format!("Failed to run ffmpeg: {}", e)))?;

        if !output.status.success() {
            return Err(MediaError::ThumbnailExtraction(format!(
                "ffmpeg failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        tracing::debug!(
            "Grabbed frame at {:.3}s from {:?} ({} bytes)",
            at_secs,
            source,
            output.stdout.len()
        );
        decode_png(&output.stdout)
    }
}

/// Parse ffprobe's bare `format=duration` output
pub fn parse_duration(stdout: &str) -> MediaResult<f64> {
    let value = stdout.trim();
    let duration: f64 = value
        .parse()
        .map_err(|_| MediaError::DurationProbe(format!("no usable duration in {:?}", value)))?;

    if !duration.is_finite() || duration < 0.0 {
        return Err(MediaError::DurationProbe(format!("invalid duration {}", duration)));
    }
    Ok(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert!((parse_duration("30.023000\n").unwrap() - 30.023).abs() < 1e-9);
        assert!(matches!(parse_duration("N/A\n"), Err(MediaError::DurationProbe(_))));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("-1").is_err());
    }
}
