use crate::domain::upload::{StartUploadRequest, UploadStatus};
use crate::error::BackendError;
use async_trait::async_trait;
use bytes::Bytes;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UploadPort: Send + Sync {
    /// Open an upload session, returning its opaque id
    async fn start_upload(&self, request: &StartUploadRequest) -> Result<String, BackendError>;

    /// Submit one chunk. The backend accepts chunks in any order and
    /// tolerates resubmission of the same index.
    async fn upload_chunk(
        &self,
        session_id: &str,
        index: u64,
        data: Bytes,
    ) -> Result<(), BackendError>;

    /// Chunk counts received so far for an open session
    async fn get_upload_status(&self, session_id: &str) -> Result<UploadStatus, BackendError>;

    /// Finalize the session into a durable file, returning the file id
    async fn complete_upload(&self, session_id: &str) -> Result<String, BackendError>;
}
