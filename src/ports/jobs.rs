use crate::domain::jobs::JobStatus;
use crate::error::BackendError;
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobPort: Send + Sync {
    async fn start_transcription(&self, file_id: &str) -> Result<String, BackendError>;

    async fn get_transcription_status(&self, job_id: &str) -> Result<JobStatus, BackendError>;

    async fn get_transcription_result(&self, job_id: &str) -> Result<String, BackendError>;

    async fn start_summarization(&self, file_id: &str) -> Result<String, BackendError>;

    /// Keyed by file rather than job. A `Rejected` answer means the summary
    /// is not ready yet.
    async fn get_summary_result(&self, file_id: &str) -> Result<String, BackendError>;
}
