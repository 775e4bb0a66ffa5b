use crate::domain::chunks::{ChunkLayout, ChunkSplitter};
use crate::error::TransferError;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default upper bound on a single upload: 100 MiB.
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 100 * 1024 * 1024;

/// A local media object waiting to be uploaded.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

impl MediaFile {
    pub fn new(filename: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// Read a file from disk. The content type is taken from `content_type`
    /// when given, otherwise guessed from the extension.
    pub async fn from_path(path: &Path, content_type: Option<&str>) -> Result<Self, TransferError> {
        let data = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| TransferError::InvalidFile(format!("no file name in {:?}", path)))?
            .to_string();
        let content_type = match content_type {
            Some(ct) => ct.to_string(),
            None => mime_guess::from_path(path)
                .first_or_octet_stream()
                .to_string(),
        };
        Ok(Self::new(filename, content_type, Bytes::from(data)))
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Only non-empty audio or video objects up to `max_size` bytes are accepted.
    pub fn validate(&self, max_size: u64) -> Result<(), TransferError> {
        if !self.content_type.starts_with("video/") && !self.content_type.starts_with("audio/") {
            return Err(TransferError::InvalidFile(format!(
                "unsupported content type `{}`, must be video or audio",
                self.content_type
            )));
        }
        if self.data.is_empty() {
            return Err(TransferError::InvalidFile("file is empty".to_string()));
        }
        if self.size() > max_size {
            return Err(TransferError::InvalidFile(format!(
                "file size {} exceeds maximum of {} bytes",
                self.size(),
                max_size
            )));
        }
        Ok(())
    }

    pub fn splitter(&self, chunk_size: u64) -> ChunkSplitter {
        ChunkSplitter::new(self.data.clone(), chunk_size)
    }

    /// Parameters for opening an upload session for this file.
    pub fn start_request(&self, chunk_size: u64) -> StartUploadRequest {
        let layout = ChunkLayout::new(self.size(), chunk_size);
        StartUploadRequest {
            filename: self.filename.clone(),
            content_type: self.content_type.clone(),
            total_size: layout.total_size,
            total_chunks: layout.chunk_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartUploadRequest {
    pub filename: String,
    pub content_type: String,
    pub total_size: u64,
    pub total_chunks: u64,
}

/// Client-side record of an open upload session.
///
/// Lives for one upload only and is dropped on completion or abandonment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    /// Opaque id assigned by the backend
    pub session_id: String,
    pub filename: String,
    pub content_type: String,
    pub total_size: u64,
    pub total_chunks: u64,
}

impl UploadSession {
    pub fn from_request(session_id: String, request: StartUploadRequest) -> Self {
        Self {
            session_id,
            filename: request.filename,
            content_type: request.content_type,
            total_size: request.total_size,
            total_chunks: request.total_chunks,
        }
    }
}

/// Chunk counts reported by the backend for an open session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadStatus {
    pub uploaded_chunks: u64,
    pub total_chunks: u64,
}

/// Result of a successful orchestration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub file_id: String,
    pub transcription_job_id: String,
    pub transcription_text: String,
    pub summary_text: String,
}
