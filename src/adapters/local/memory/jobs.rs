use super::{new_id, InMemoryBackend, Job};
use crate::domain::jobs::JobStatus;
use crate::error::BackendError;
use crate::ports::jobs::JobPort;
use async_trait::async_trait;
use tracing::info;

#[async_trait]
impl JobPort for InMemoryBackend {
    async fn start_transcription(&self, file_id: &str) -> Result<String, BackendError> {
        let mut store = self.store.lock();
        let file = store
            .files
            .get(file_id)
            .ok_or_else(|| BackendError::rejected("File not found"))?;

        let outcome = match store.failing.get(file_id) {
            Some(reason) => Err(reason.clone()),
            None => Ok(format!(
                "Transcript of {} ({} bytes of {})",
                file.filename,
                file.data.len(),
                file.content_type
            )),
        };
        let job_id = new_id();
        store.transcriptions.insert(
            job_id.clone(),
            Job {
                file_id: file_id.to_string(),
                polls_left: self.settings.pending_polls,
                outcome,
            },
        );
        info!(file_id, job_id = %job_id, "transcription queued");
        Ok(job_id)
    }

    async fn get_transcription_status(&self, job_id: &str) -> Result<JobStatus, BackendError> {
        let mut store = self.store.lock();
        let job = store
            .transcriptions
            .get_mut(job_id)
            .ok_or_else(|| BackendError::rejected("Transcription job not found"))?;

        if !job.poll() {
            return Ok(JobStatus::Pending);
        }
        Ok(match &job.outcome {
            Ok(_) => JobStatus::Completed(job_id.to_string()),
            Err(reason) => JobStatus::Failed(reason.clone()),
        })
    }

    async fn get_transcription_result(&self, job_id: &str) -> Result<String, BackendError> {
        let store = self.store.lock();
        let job = store
            .transcriptions
            .get(job_id)
            .ok_or_else(|| BackendError::rejected("Transcription job not found"))?;

        if job.polls_left > 0 {
            return Err(BackendError::rejected("Transcription not ready"));
        }
        job.outcome.clone().map_err(BackendError::Rejected)
    }

    async fn start_summarization(&self, file_id: &str) -> Result<String, BackendError> {
        let mut store = self.store.lock();
        if !store.files.contains_key(file_id) {
            return Err(BackendError::rejected("File not found"));
        }

        let transcript = store
            .transcriptions
            .values()
            .find(|job| job.file_id == file_id)
            .and_then(|job| job.outcome.as_ref().ok())
            .cloned()
            .unwrap_or_default();
        let outcome = match store.failing.get(file_id) {
            Some(reason) => Err(reason.clone()),
            None => Ok(format!("Summary: {}", summarize(&transcript))),
        };

        let job_id = new_id();
        store.summaries.insert(
            file_id.to_string(),
            Job {
                file_id: file_id.to_string(),
                polls_left: self.settings.pending_polls,
                outcome,
            },
        );
        info!(file_id, job_id = %job_id, "summarization queued");
        Ok(job_id)
    }

    async fn get_summary_result(&self, file_id: &str) -> Result<String, BackendError> {
        let mut store = self.store.lock();
        let job = store
            .summaries
            .get_mut(file_id)
            .ok_or_else(|| BackendError::rejected("Summary not found"))?;

        if !job.poll() {
            return Err(BackendError::rejected("Summary not ready"));
        }
        Ok(match &job.outcome {
            Ok(text) => text.clone(),
            Err(reason) => format!("Err: {reason}"),
        })
    }
}

/// First sentence of the transcript, or a placeholder.
fn summarize(transcript: &str) -> String {
    match transcript.split('.').next().map(str::trim) {
        Some(first) if !first.is_empty() => first.to_string(),
        _ => "nothing to summarize".to_string(),
    }
}
