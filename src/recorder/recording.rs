//! Finished recordings

use crate::processing::artifact::MediaFile;
use crate::recorder::state::RecordingSegment;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// All chunks of one recording merged into a single payload
#[derive(Debug, Clone)]
pub struct Recording {
    /// Size of each captured chunk, in capture order
    pub chunk_sizes: Vec<usize>,
    pub payload: Arc<[u8]>,
    pub mime_type: String,
    /// Wall-clock recording time, pauses excluded
    pub elapsed_secs: f64,
    pub segments: Vec<RecordingSegment>,
    pub created_at: DateTime<Utc>,
}

impl Recording {
    /// Concatenate `chunks` in order
    pub fn merge(
        chunks: Vec<Vec<u8>>,
        mime_type: impl Into<String>,
        elapsed_secs: f64,
        segments: Vec<RecordingSegment>,
    ) -> Self {
        let chunk_sizes: Vec<usize> = chunks.iter().map(Vec::len).collect();
        let mut payload = Vec::with_capacity(chunk_sizes.iter().sum());
        for chunk in chunks {
            payload.extend_from_slice(&chunk);
        }

        Self {
            chunk_sizes,
            payload: payload.into(),
            mime_type: mime_type.into(),
            elapsed_secs,
            segments,
            created_at: Utc::now(),
        }
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_sizes.len()
    }

    pub fn size(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Wrap the payload as a media file
    pub fn to_file(&self) -> MediaFile {
        let essence = self.mime_type.split(';').next().unwrap_or("").trim();
        let extension = if essence == "video/mp4" { "mp4" } else { "webm" };
        let name = format!(
            "video-intro-{}.{}",
            self.created_at.format("%Y%m%d-%H%M%S"),
            extension
        );
        MediaFile::from_bytes(name, essence, Arc::clone(&self.payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_order() {
        let recording = Recording::merge(
            vec![b"ab".to_vec(), b"c".to_vec(), b"def".to_vec()],
            "video/webm;codecs=vp8,opus",
            3.0,
            Vec::new(),
        );
        assert_eq!(&recording.payload[..], b"abcdef");
        assert_eq!(recording.chunk_sizes, vec![2, 1, 3]);
        assert_eq!(recording.chunk_count(), 3);

        let file = recording.to_file();
        assert_eq!(file.mime_type, "video/webm");
        assert!(file.name.ends_with(".webm"));
        assert_eq!(file.size, 6);
    }
}
