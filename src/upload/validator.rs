//! Upload gate
//!
//! A selected file must be a video, fit under the size ceiling, and probe to
//! a duration within the chosen maximum before it reaches post-processing.

use crate::config::{MaxDuration, UploadConfig};
use crate::processing::artifact::MediaFile;
use crate::processing::post::PostProcessor;
use crate::utils::error::{MediaError, MediaResult};
use std::sync::Arc;

/// A file that passed every upload check
#[derive(Debug, Clone)]
pub struct ValidatedUpload {
    pub file: MediaFile,
    /// Probed duration in seconds
    pub duration: f64,
}

/// Gatekeeper for externally supplied files
pub struct UploadValidator {
    processor: Arc<PostProcessor>,
    config: UploadConfig,
}

impl UploadValidator {
    pub fn new(processor: Arc<PostProcessor>, config: UploadConfig) -> Self {
        Self { processor, config }
    }

    pub fn max_bytes(&self) -> u64 {
        self.config.max_bytes
    }

    /// Run the type, size and duration checks in that order
    pub async fn validate(&self, file: MediaFile, max: MaxDuration) -> MediaResult<ValidatedUpload> {
        self.check_media_type(&file)?;
        self.check_size(&file)?;

        let duration = self.processor.probe_file_duration(&file).await?;
        if duration > max.as_secs_f64() {
            tracing::warn!(
                "Rejected {}: {:.1}s exceeds {}s",
                file.name,
                duration,
                max.secs()
            );
            return Err(MediaError::DurationExceeded {
                duration,
                max: max.secs(),
            });
        }

        tracing::info!("Accepted upload {} ({} bytes, {:.2}s)", file.name, file.size, duration);
        Ok(ValidatedUpload { file, duration })
    }

    pub fn check_media_type(&self, file: &MediaFile) -> MediaResult<()> {
        let mime = file.mime_type.trim().to_ascii_lowercase();
        if mime.starts_with(&self.config.accepted_prefix) {
            Ok(())
        } else {
            tracing::warn!("Rejected {}: media type {:?}", file.name, file.mime_type);
            Err(MediaError::InvalidMediaType(file.mime_type.clone()))
        }
    }

    pub fn check_size(&self, file: &MediaFile) -> MediaResult<()> {
        if file.size > self.config.max_bytes {
            tracing::warn!("Rejected {}: {} bytes", file.name, file.size);
            return Err(MediaError::FileTooLarge {
                size: file.size,
                max: self.config.max_bytes,
            });
        }
        Ok(())
    }
}
