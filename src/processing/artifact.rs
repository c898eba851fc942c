//! Media files and the produced artifact
//!
//! `VideoArtifact` is the only value that leaves the engine; the hosting
//! form owns it once it is emitted.

use crate::utils::error::MediaResult;
use crate::utils::object_url::ObjectUrl;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;

/// Where the bytes of a media file live
#[derive(Clone)]
pub enum MediaSource {
    /// Recorded payload held in memory
    Memory(Arc<[u8]>),
    /// User-selected file on disk
    Disk(PathBuf),
}

impl std::fmt::Debug for MediaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaSource::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
            MediaSource::Disk(path) => write!(f, "Disk({})", path.display()),
        }
    }
}

/// A video file, recorded or selected by the user
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFile {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    #[serde(skip)]
    source: MediaSource,
}

impl MediaFile {
    pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size: bytes.len() as u64,
            source: MediaSource::Memory(bytes),
        }
    }

    /// Open a file from disk, guessing its media type from the extension
    pub fn from_path(path: impl AsRef<Path>) -> MediaResult<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            name,
            mime_type: mime_from_extension(path).to_string(),
            size: metadata.len(),
            source: MediaSource::Disk(path.to_path_buf()),
        })
    }

    /// Override the media type reported by the selection surface
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn source(&self) -> &MediaSource {
        &self.source
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            MediaSource::Disk(path) => Some(path.as_path()),
            MediaSource::Memory(_) => None,
        }
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.source {
            MediaSource::Memory(bytes) => Some(bytes.as_ref()),
            MediaSource::Disk(_) => None,
        }
    }

    /// Copy the file contents to `dest`
    pub fn write_to(&self, dest: &Path) -> MediaResult<()> {
        match &self.source {
            MediaSource::Memory(bytes) => std::fs::write(dest, &bytes[..])?,
            MediaSource::Disk(path) => {
                std::fs::copy(path, dest)?;
            }
        }
        Ok(())
    }

    /// Make the file readable by path for the duration of a processing pass
    pub fn stage(&self) -> MediaResult<StagedSource> {
        match &self.source {
            MediaSource::Disk(path) => Ok(StagedSource::Borrowed(path.clone())),
            MediaSource::Memory(bytes) => {
                let mut temp = tempfile::Builder::new()
                    .prefix("video-intro-stage-")
                    .suffix(extension_for(&self.mime_type))
                    .tempfile()?;
                temp.write_all(bytes)?;
                temp.flush()?;
                Ok(StagedSource::Temp(temp.into_temp_path()))
            }
        }
    }
}

/// A file path that stays valid while this value lives
pub enum StagedSource {
    Borrowed(PathBuf),
    Temp(TempPath),
}

impl StagedSource {
    pub fn path(&self) -> &Path {
        match self {
            StagedSource::Borrowed(path) => path.as_path(),
            StagedSource::Temp(path) => &**path,
        }
    }
}

/// Finished video with its derived thumbnail and duration
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoArtifact {
    pub file: MediaFile,
    pub thumbnail: ObjectUrl,
    /// Seconds
    pub duration: f64,
}

/// Guess a media type from a file extension
pub fn mime_from_extension(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "ogv" => "video/ogg",
        "avi" => "video/x-msvideo",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "txt" => "text/plain",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    if mime_type.starts_with("video/mp4") {
        ".mp4"
    } else if mime_type.starts_with("video/quicktime") {
        ".mov"
    } else {
        ".webm"
    }
}
