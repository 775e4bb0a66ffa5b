use crate::domain::chunks::{Chunk, ChunkSplitter, DEFAULT_CHUNK_SIZE};
use crate::domain::upload::{
    StartUploadRequest, UploadSession, UploadStatus, DEFAULT_MAX_UPLOAD_SIZE,
};
use crate::error::TransferError;
use crate::ports::upload::UploadPort;
use futures::stream::{FuturesUnordered, StreamExt};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Number of chunks in flight at once.
pub const DEFAULT_BATCH_WIDTH: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct UploadConfig {
    pub chunk_size: u64,
    pub batch_width: usize,
    /// Pause between consecutive batches
    pub batch_delay: Duration,
    pub max_upload_size: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            batch_width: DEFAULT_BATCH_WIDTH,
            batch_delay: Duration::from_millis(50),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
        }
    }
}

/// Drives the chunked upload protocol against an [`UploadPort`].
pub struct UploadSessionClient<U> {
    port: U,
    config: UploadConfig,
}

impl<U> UploadSessionClient<U>
where
    U: UploadPort,
{
    pub fn new(port: U, config: UploadConfig) -> Self {
        Self { port, config }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    pub async fn start(&self, request: StartUploadRequest) -> Result<UploadSession, TransferError> {
        let session_id = self
            .port
            .start_upload(&request)
            .await
            .map_err(TransferError::from_backend)?;

        info!(
            session_id = %session_id,
            filename = %request.filename,
            total_size = request.total_size,
            total_chunks = request.total_chunks,
            "upload session started"
        );
        Ok(UploadSession::from_request(session_id, request))
    }

    pub async fn upload_chunk(
        &self,
        session: &UploadSession,
        chunk: &Chunk,
    ) -> Result<(), TransferError> {
        if chunk.index >= session.total_chunks {
            return Err(TransferError::ChunkOutOfRange {
                index: chunk.index,
                total: session.total_chunks,
            });
        }

        self.port
            .upload_chunk(&session.session_id, chunk.index, chunk.bytes.clone())
            .await
            .map_err(|e| TransferError::from_chunk(chunk.index, e))?;

        debug!(session_id = %session.session_id, index = chunk.index, len = chunk.len(), "chunk accepted");
        Ok(())
    }

    /// Upload every chunk of `splitter` in index-ordered batches of
    /// `batch_width`. Calls within a batch overlap; the next batch is only
    /// issued once the current one has settled. The first failure aborts the
    /// upload. `on_progress(completed, total)` runs after every accepted chunk.
    pub async fn upload_all<F>(
        &self,
        session: &UploadSession,
        splitter: &ChunkSplitter,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<(), TransferError>
    where
        F: FnMut(u64, u64),
    {
        let total = session.total_chunks;
        let width = self.config.batch_width.max(1);
        let mut completed = 0u64;
        let mut chunks = splitter.chunks().peekable();

        while chunks.peek().is_some() {
            if cancel.is_cancelled() {
                return Err(TransferError::Cancelled);
            }

            let batch: Vec<Chunk> = chunks.by_ref().take(width).collect();
            let mut in_flight: FuturesUnordered<_> = batch
                .iter()
                .map(|chunk| self.upload_chunk(session, chunk))
                .collect();

            loop {
                let next = tokio::select! {
                    _ = cancel.cancelled() => return Err(TransferError::Cancelled),
                    next = in_flight.next() => next,
                };
                match next {
                    Some(result) => {
                        result?;
                        completed += 1;
                        on_progress(completed, total);
                    }
                    None => break,
                }
            }

            if chunks.peek().is_some() && !self.config.batch_delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(TransferError::Cancelled),
                    _ = tokio::time::sleep(self.config.batch_delay) => {}
                }
            }
        }

        info!(session_id = %session.session_id, chunks = completed, "all chunks uploaded");
        Ok(())
    }

    pub async fn status(&self, session: &UploadSession) -> Result<UploadStatus, TransferError> {
        self.port
            .get_upload_status(&session.session_id)
            .await
            .map_err(TransferError::from_backend)
    }

    /// Finalize the session. Consumes it: a session is never reused.
    pub async fn complete(&self, session: UploadSession) -> Result<String, TransferError> {
        let file_id = self
            .port
            .complete_upload(&session.session_id)
            .await
            .map_err(TransferError::from_backend)?;

        info!(session_id = %session.session_id, file_id = %file_id, "upload session completed");
        Ok(file_id)
    }
}
