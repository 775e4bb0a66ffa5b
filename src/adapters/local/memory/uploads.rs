use super::{new_id, InMemoryBackend, Session, StoredFile};
use crate::domain::upload::{StartUploadRequest, UploadStatus};
use crate::error::BackendError;
use crate::ports::upload::UploadPort;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::collections::BTreeMap;
use tracing::{debug, info};

#[async_trait]
impl UploadPort for InMemoryBackend {
    async fn start_upload(&self, request: &StartUploadRequest) -> Result<String, BackendError> {
        if request.total_chunks == 0 || request.total_size == 0 {
            return Err(BackendError::rejected("File is empty"));
        }
        if request.total_size > self.settings.max_upload_size {
            return Err(BackendError::rejected(format!(
                "File too large, maximum is {} bytes",
                self.settings.max_upload_size
            )));
        }

        let session_id = new_id();
        self.store.lock().sessions.insert(
            session_id.clone(),
            Session {
                request: request.clone(),
                chunks: BTreeMap::new(),
            },
        );
        info!(session_id = %session_id, filename = %request.filename, "session opened");
        Ok(session_id)
    }

    async fn upload_chunk(
        &self,
        session_id: &str,
        index: u64,
        bytes: Bytes,
    ) -> Result<(), BackendError> {
        let mut store = self.store.lock();
        let session = store
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| BackendError::rejected("Upload session not found"))?;

        if index >= session.request.total_chunks {
            return Err(BackendError::rejected(format!(
                "Invalid chunk index {index}, session has {} chunks",
                session.request.total_chunks
            )));
        }
        session.chunks.entry(index).or_insert(bytes);
        debug!(session_id, index, "chunk stored");
        Ok(())
    }

    async fn get_upload_status(&self, session_id: &str) -> Result<UploadStatus, BackendError> {
        let store = self.store.lock();
        let session = store
            .sessions
            .get(session_id)
            .ok_or_else(|| BackendError::rejected("Upload session not found"))?;
        Ok(UploadStatus {
            uploaded_chunks: session.chunks.len() as u64,
            total_chunks: session.request.total_chunks,
        })
    }

    async fn complete_upload(&self, session_id: &str) -> Result<String, BackendError> {
        let mut store = self.store.lock();
        let session = store
            .sessions
            .get(session_id)
            .ok_or_else(|| BackendError::rejected("Upload session not found"))?;

        if (session.chunks.len() as u64) < session.request.total_chunks {
            return Err(BackendError::Incomplete(
                "Not all chunks have been uploaded".to_string(),
            ));
        }

        let mut data = BytesMut::with_capacity(session.request.total_size as usize);
        for part in session.chunks.values() {
            data.extend_from_slice(part);
        }
        if data.len() as u64 != session.request.total_size {
            return Err(BackendError::rejected(format!(
                "Size mismatch: expected {} bytes, received {}",
                session.request.total_size,
                data.len()
            )));
        }

        let Some(session) = store.sessions.remove(session_id) else {
            return Err(BackendError::rejected("Upload session not found"));
        };
        let file_id = new_id();
        store.files.insert(
            file_id.clone(),
            StoredFile {
                filename: session.request.filename,
                content_type: session.request.content_type,
                data: data.freeze(),
            },
        );
        info!(session_id, file_id = %file_id, "upload assembled");
        Ok(file_id)
    }
}
