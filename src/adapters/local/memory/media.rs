use super::InMemoryBackend;
use crate::domain::media::FileChunk;
use crate::error::BackendError;
use crate::ports::media::MediaPort;
use async_trait::async_trait;

#[async_trait]
impl MediaPort for InMemoryBackend {
    async fn get_file_chunk(
        &self,
        file_id: &str,
        start: u64,
        length: u64,
    ) -> Result<FileChunk, BackendError> {
        let store = self.store.lock();
        let file = store
            .files
            .get(file_id)
            .ok_or_else(|| BackendError::rejected("File not found"))?;

        let total_size = file.data.len() as u64;
        if start >= total_size {
            return Err(BackendError::rejected("Invalid start position"));
        }
        let end = start.saturating_add(length).min(total_size);
        Ok(FileChunk {
            data: file.data.slice(start as usize..end as usize),
            total_size,
        })
    }
}
