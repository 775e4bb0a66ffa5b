use crate::domain::media::FileChunk;
use crate::error::BackendError;
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaPort: Send + Sync {
    /// Read `length` bytes of a stored file starting at `start`
    async fn get_file_chunk(
        &self,
        file_id: &str,
        start: u64,
        length: u64,
    ) -> Result<FileChunk, BackendError>;
}
