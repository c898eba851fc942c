//! Post-processing of finished recordings and selected files
//!
//! Produces a `VideoArtifact`: the file itself, a PNG thumbnail exposed as an
//! object URL, and the duration in seconds. Only one pass runs at a time.

use crate::config::{MaxDuration, ProcessingConfig};
use crate::processing::artifact::{MediaFile, VideoArtifact};
use crate::processing::decoder::MediaDecoder;
use crate::processing::thumbnail::{encode_png, thumbnail_probe_time, THUMBNAIL_MIME};
use crate::recorder::recording::Recording;
use crate::utils::error::{MediaError, MediaResult};
use crate::utils::object_url::{ObjectUrl, ObjectUrlRegistry};
use std::path::Path;
use std::sync::Arc;

/// Turns raw media into a reviewable artifact
pub struct PostProcessor {
    decoder: Arc<dyn MediaDecoder>,
    urls: ObjectUrlRegistry,
    config: ProcessingConfig,
    serial: tokio::sync::Mutex<()>,
}

impl PostProcessor {
    pub fn new(decoder: Arc<dyn MediaDecoder>, urls: ObjectUrlRegistry, config: ProcessingConfig) -> Self {
        Self {
            decoder,
            urls,
            config,
            serial: tokio::sync::Mutex::new(()),
        }
    }

    /// Registry holding the thumbnails this processor creates
    pub fn urls(&self) -> &ObjectUrlRegistry {
        &self.urls
    }

    /// Build the artifact for a finished recording
    ///
    /// The duration is the wall-clock recording time, capped at `max`.
    pub async fn from_recording(&self, recording: &Recording, max: MaxDuration) -> MediaResult<VideoArtifact> {
        let _guard = self.serial.lock().await;

        if recording.is_empty() {
            return Err(MediaError::ThumbnailExtraction(
                "recording produced no data".to_string(),
            ));
        }

        let duration = recording.elapsed_secs.max(0.0).min(max.as_secs_f64());
        let file = compress(recording.to_file());

        tracing::info!(
            "Processing recording: {} chunks, {} bytes, {:.2}s",
            recording.chunk_count(),
            recording.size(),
            duration
        );

        let staged = file.stage()?;
        let thumbnail = self.extract_thumbnail(staged.path(), duration).await?;

        Ok(VideoArtifact {
            file,
            thumbnail,
            duration,
        })
    }

    /// Build the artifact for a selected file, probing its duration
    pub async fn from_file(&self, file: MediaFile) -> MediaResult<VideoArtifact> {
        let duration = self.probe_file_duration(&file).await?;
        self.from_probed_file(file, duration).await
    }

    /// Build the artifact for a file whose duration is already known
    pub async fn from_probed_file(&self, file: MediaFile, duration: f64) -> MediaResult<VideoArtifact> {
        let _guard = self.serial.lock().await;

        let file = compress(file);
        let staged = file.stage()?;
        let thumbnail = self.extract_thumbnail(staged.path(), duration).await?;

        tracing::info!("Processed {} ({} bytes, {:.2}s)", file.name, file.size, duration);

        Ok(VideoArtifact {
            file,
            thumbnail,
            duration,
        })
    }

    /// Grab one frame near the start of `source` and expose it as a PNG URL
    pub async fn extract_thumbnail(&self, source: &Path, duration: f64) -> MediaResult<ObjectUrl> {
        let at = thumbnail_probe_time(duration, self.config.thumbnail_probe_secs);

        let frame = self
            .decoder
            .grab_frame(source, at, self.config.thumbnail_max_width)
            .await
            .map_err(|e| match e {
                MediaError::ThumbnailExtraction(_) => e,
                other => MediaError::ThumbnailExtraction(other.to_string()),
            })?;

        let png = encode_png(&frame)?;
        let url = self.urls.create(&png, THUMBNAIL_MIME)?;

        tracing::debug!(
            "Thumbnail {}x{} at {:.3}s -> {}",
            frame.width,
            frame.height,
            at,
            url
        );
        Ok(url)
    }

    /// Metadata-only duration load
    pub async fn probe_duration(&self, source: &Path) -> MediaResult<f64> {
        self.decoder.probe_duration(source).await.map_err(|e| match e {
            MediaError::DurationProbe(_) => e,
            other => MediaError::DurationProbe(other.to_string()),
        })
    }

    pub async fn probe_file_duration(&self, file: &MediaFile) -> MediaResult<f64> {
        let staged = file.stage()?;
        self.probe_duration(staged.path()).await
    }
}

/// Reserved for re-encoding before upload; files pass through unchanged
pub fn compress(file: MediaFile) -> MediaFile {
    file
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::decoder::RasterFrame;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct StubDecoder {
        duration: f64,
        fail_frames: bool,
        grabbed_at_ms: AtomicU32,
    }

    #[async_trait]
    impl MediaDecoder for StubDecoder {
        async fn probe_duration(&self, _source: &Path) -> MediaResult<f64> {
            Ok(self.duration)
        }

        async fn grab_frame(&self, source: &Path, at_secs: f64, _max_width: u32) -> MediaResult<RasterFrame> {
            assert!(source.exists());
            self.grabbed_at_ms.store((at_secs * 1000.0) as u32, Ordering::SeqCst);
            if self.fail_frames {
                return Err(MediaError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "corrupt stream",
                )));
            }
            RasterFrame::new(2, 2, vec![128; 12])
        }
    }

    fn processor(duration: f64, fail_frames: bool) -> (PostProcessor, Arc<StubDecoder>) {
        let decoder = Arc::new(StubDecoder {
            duration,
            fail_frames,
            grabbed_at_ms: AtomicU32::new(u32::MAX),
        });
        let processor = PostProcessor::new(decoder.clone(), ObjectUrlRegistry::new(), ProcessingConfig::default());
        (processor, decoder)
    }

    #[tokio::test]
    async fn test_recording_duration_capped_at_max() {
        let (processor, decoder) = processor(0.0, false);
        let recording = Recording::merge(vec![vec![1u8; 64]], "video/webm", 61.7, Vec::new());

        let artifact = processor
            .from_recording(&recording, MaxDuration::default())
            .await
            .unwrap();

        assert_eq!(artifact.duration, 60.0);
        assert_eq!(decoder.grabbed_at_ms.load(Ordering::SeqCst), 1000);
        assert_eq!(processor.urls().mime_type(&artifact.thumbnail).as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn test_short_file_thumbnail_at_midpoint() {
        let (processor, decoder) = processor(0.5, false);
        let file = MediaFile::from_bytes("clip.webm", "video/webm", vec![0u8; 16]);

        let artifact = processor.from_file(file).await.unwrap();
        assert_eq!(artifact.duration, 0.5);
        assert_eq!(decoder.grabbed_at_ms.load(Ordering::SeqCst), 250);
    }

    #[tokio::test]
    async fn test_frame_failure_is_thumbnail_error() {
        let (processor, _) = processor(3.0, true);
        let file = MediaFile::from_bytes("clip.webm", "video/webm", vec![0u8; 16]);

        let err = processor.from_file(file).await.unwrap_err();
        assert!(matches!(err, MediaError::ThumbnailExtraction(_)));
        assert!(processor.urls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_recording_rejected() {
        let (processor, _) = processor(0.0, false);
        let recording = Recording::merge(Vec::new(), "video/webm", 2.0, Vec::new());
        assert!(processor
            .from_recording(&recording, MaxDuration::default())
            .await
            .is_err());
    }
}
