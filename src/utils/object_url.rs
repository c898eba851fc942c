//! Temporary object URLs
//!
//! Previews and thumbnails are exposed to the host as opaque `blob:` style
//! URLs. Each one is backed by a temp file that is deleted when the URL is
//! revoked.

use crate::utils::error::MediaResult;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempPath;

const URL_SCHEME: &str = "blob:video-intro/";

/// Opaque reference to a temporary object
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

struct ObjectEntry {
    path: TempPath,
    mime_type: String,
    size: u64,
}

/// Registry of live object URLs
///
/// Cloning shares the same registry.
#[derive(Clone, Default)]
pub struct ObjectUrlRegistry {
    entries: Arc<Mutex<HashMap<ObjectUrl, ObjectEntry>>>,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` in a temp file and hand out a URL for it
    pub fn create(&self, bytes: &[u8], mime_type: &str) -> MediaResult<ObjectUrl> {
        let mut file = tempfile::Builder::new()
            .prefix("video-intro-")
            .suffix(extension_for_mime(mime_type))
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;

        let url = ObjectUrl(format!("{}{}", URL_SCHEME, uuid::Uuid::new_v4()));
        let entry = ObjectEntry {
            path: file.into_temp_path(),
            mime_type: mime_type.to_string(),
            size: bytes.len() as u64,
        };

        tracing::debug!("Created object URL {} ({} bytes, {})", url, entry.size, mime_type);
        self.entries.lock().insert(url.clone(), entry);
        Ok(url)
    }

    /// Path of the backing file while the URL is live
    pub fn resolve(&self, url: &ObjectUrl) -> Option<PathBuf> {
        self.entries
            .lock()
            .get(url)
            .map(|entry| entry.path.to_path_buf())
    }

    pub fn mime_type(&self, url: &ObjectUrl) -> Option<String> {
        self.entries.lock().get(url).map(|entry| entry.mime_type.clone())
    }

    pub fn size(&self, url: &ObjectUrl) -> Option<u64> {
        self.entries.lock().get(url).map(|entry| entry.size)
    }

    /// `file://` URL the host can load directly
    pub fn file_url(&self, url: &ObjectUrl) -> Option<String> {
        self.resolve(url).map(|path| file_url_for(&path))
    }

    /// Revoke one URL and delete its backing file
    pub fn revoke(&self, url: &ObjectUrl) -> bool {
        let removed = self.entries.lock().remove(url);
        match removed {
            Some(entry) => {
                if let Err(e) = entry.path.close() {
                    tracing::warn!("Failed to delete object backing file for {}: {}", url, e);
                }
                tracing::debug!("Revoked object URL {}", url);
                true
            }
            None => false,
        }
    }

    /// Revoke every live URL
    pub fn revoke_all(&self) -> usize {
        let drained: Vec<(ObjectUrl, ObjectEntry)> = self.entries.lock().drain().collect();
        let count = drained.len();
        for (url, entry) in drained {
            if let Err(e) = entry.path.close() {
                tracing::warn!("Failed to delete object backing file for {}: {}", url, e);
            }
        }
        if count > 0 {
            tracing::debug!("Revoked {} object URL(s)", count);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Percent-encode each path segment into a `file://` URL
pub fn file_url_for(path: &Path) -> String {
    let encoded: Vec<String> = path
        .to_string_lossy()
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    let joined = encoded.join("/");
    if joined.starts_with('/') {
        format!("file://{}", joined)
    } else {
        format!("file:///{}", joined)
    }
}

fn extension_for_mime(mime_type: &str) -> &'static str {
    let essence = mime_type.split(';').next().unwrap_or("").trim();
    match essence {
        "image/png" => ".png",
        "image/jpeg" => ".jpg",
        "video/webm" => ".webm",
        "video/mp4" => ".mp4",
        "video/quicktime" => ".mov",
        "video/x-matroska" => ".mkv",
        "video/ogg" => ".ogv",
        _ => ".bin",
    }
}
