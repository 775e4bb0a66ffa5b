use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Metadata of a remote object available for chunked retrieval.
///
/// Supplied by the caller (usually from a file catalog record); this crate
/// never creates one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    pub file_id: String,
    pub total_size: u64,
    pub content_type: String,
    /// Name used when saving a download
    #[serde(default)]
    pub filename: Option<String>,
}

impl MediaDescriptor {
    pub fn new(file_id: impl Into<String>, total_size: u64, content_type: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
            total_size,
            content_type: content_type.into(),
            filename: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn download_name(&self) -> String {
        self.filename.clone().unwrap_or_else(|| self.file_id.clone())
    }
}

/// Response of a byte-range read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChunk {
    pub data: Bytes,
    pub total_size: u64,
}

/// An assembled, playable object: either the leading chunks of a file or
/// the whole of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaHandle {
    pub file_id: String,
    pub content_type: String,
    pub data: Bytes,
    /// `true` when `data` holds every byte of the remote object.
    pub complete: bool,
}

impl MediaHandle {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn bytes(&self) -> Bytes {
        self.data.clone()
    }

    /// Write the assembled object to `path`, creating parent directories.
    pub async fn save_to(&self, path: &Path) -> std::io::Result<PathBuf> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &self.data).await?;
        Ok(path.to_path_buf())
    }
}
