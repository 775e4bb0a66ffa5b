use super::cancellable;
use super::poller::{JobPoller, PollPolicy};
use super::upload::{UploadConfig, UploadSessionClient};
use crate::domain::jobs::{JobHandle, JobStatus, PollOutcome};
use crate::domain::progress::{self, ProgressLock, UploadStage, UploadState};
use crate::domain::upload::{MediaFile, UploadOutcome};
use crate::error::{BackendError, TransferError};
use crate::ports::clock::Clock;
use crate::ports::jobs::JobPort;
use crate::ports::upload::UploadPort;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub upload: UploadConfig,
    pub transcription_poll: PollPolicy,
    pub summary_poll: PollPolicy,
}

impl OrchestratorConfig {
    pub fn new(upload: UploadConfig) -> Self {
        Self {
            upload,
            transcription_poll: PollPolicy::transcription(),
            summary_poll: PollPolicy::summarization(),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::new(UploadConfig::default())
    }
}

/// Runs the whole pipeline for one file: chunked upload, session
/// completion, transcription, summarization.
///
/// Progress and stage are published through a `watch` channel and only ever
/// move forward during a run. Any failure aborts the run, resets progress to
/// 0 and sets the stage to `error`.
pub struct UploadOrchestrator<U, J, C> {
    uploads: UploadSessionClient<U>,
    jobs: J,
    poller: JobPoller<C>,
    transcription_poll: PollPolicy,
    summary_poll: PollPolicy,
    state: watch::Sender<UploadState>,
    progress: Mutex<ProgressLock>,
    running: AtomicBool,
}

struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<U, J, C> UploadOrchestrator<U, J, C>
where
    U: UploadPort,
    J: JobPort,
    C: Clock,
{
    pub fn new(uploads: U, jobs: J, clock: C, config: OrchestratorConfig) -> Self {
        let (state, _) = watch::channel(UploadState::default());
        Self {
            uploads: UploadSessionClient::new(uploads, config.upload),
            jobs,
            poller: JobPoller::new(clock),
            transcription_poll: config.transcription_poll,
            summary_poll: config.summary_poll,
            state,
            progress: Mutex::new(ProgressLock::new()),
            running: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> UploadState {
        self.state.borrow().clone()
    }

    /// Run the pipeline to its single terminal outcome.
    ///
    /// Cancellation returns `Err(Cancelled)` and puts the state back to
    /// `idle` without an error message.
    pub async fn run(
        &self,
        file: &MediaFile,
        cancel: &CancellationToken,
    ) -> Result<UploadOutcome, TransferError> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(TransferError::UploadInProgress);
        }
        let _running = RunGuard(&self.running);

        self.progress.lock().reset();
        self.state.send_modify(|s| {
            *s = UploadState {
                progress: 0.0,
                stage: UploadStage::Uploading,
                error: None,
            }
        });

        let result = self.pipeline(file, cancel).await;

        match &result {
            Ok(outcome) => {
                self.report(progress::DONE);
                self.set_stage(UploadStage::Complete);
                info!(file_id = %outcome.file_id, filename = %file.filename, "upload processed");
            }
            Err(e) if e.is_cancelled() => {
                info!(filename = %file.filename, "upload cancelled");
                self.reset_to(UploadStage::Idle, None);
            }
            Err(e) => {
                error!(filename = %file.filename, error = %e, "upload failed");
                self.reset_to(UploadStage::Error, Some(e.to_string()));
            }
        }
        result
    }

    async fn pipeline(
        &self,
        file: &MediaFile,
        cancel: &CancellationToken,
    ) -> Result<UploadOutcome, TransferError> {
        let config = self.uploads.config();
        file.validate(config.max_upload_size)?;

        let splitter = file.splitter(config.chunk_size);
        let request = file.start_request(config.chunk_size);
        let session = cancellable(cancel, self.uploads.start(request)).await?;

        self.uploads
            .upload_all(&session, &splitter, cancel, |done, total| {
                self.report(progress::upload_fraction(done, total))
            })
            .await?;

        self.set_stage(UploadStage::Processing);
        self.report(progress::PROCESSING_STARTED);
        let file_id = cancellable(cancel, self.uploads.complete(session)).await?;
        self.report(progress::SESSION_COMPLETED);

        let (transcription_job_id, transcription_text) = self.transcribe(&file_id, cancel).await?;
        self.report(progress::TRANSCRIPTION_FETCHED);

        let summary_text = self.summarize(&file_id, cancel).await?;

        Ok(UploadOutcome {
            file_id,
            transcription_job_id,
            transcription_text,
            summary_text,
        })
    }

    async fn transcribe(
        &self,
        file_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(String, String), TransferError> {
        let jobs = &self.jobs;
        let job_id = cancellable(cancel, async {
            jobs.start_transcription(file_id)
                .await
                .map_err(TransferError::from_backend)
        })
        .await?;
        info!(file_id, job_id = %job_id, "transcription started");

        let handle = JobHandle::transcription(job_id.clone());
        let id: &str = &job_id;
        let outcome = self
            .poller
            .poll(&handle, &self.transcription_poll, cancel, move || {
                jobs.get_transcription_status(id)
            })
            .await?;
        settle(&handle, outcome)?;

        let text = cancellable(cancel, async {
            jobs.get_transcription_result(id)
                .await
                .map_err(TransferError::from_backend)
        })
        .await?;
        Ok((job_id, text))
    }

    async fn summarize(
        &self,
        file_id: &str,
        cancel: &CancellationToken,
    ) -> Result<String, TransferError> {
        let jobs = &self.jobs;
        let job_id = cancellable(cancel, async {
            jobs.start_summarization(file_id)
                .await
                .map_err(TransferError::from_backend)
        })
        .await?;
        self.report(progress::SUMMARIZATION_STARTED);
        info!(file_id, job_id = %job_id, "summarization started");

        let handle = JobHandle::summarization(job_id);
        let outcome = self
            .poller
            .poll(&handle, &self.summary_poll, cancel, move || async move {
                summary_status(jobs.get_summary_result(file_id).await)
            })
            .await?;
        settle(&handle, outcome)
    }

    fn report(&self, value: f64) {
        let mut lock = self.progress.lock();
        if lock.advance(value) {
            let current = lock.current();
            self.state.send_modify(|s| s.progress = current);
        }
    }

    fn set_stage(&self, stage: UploadStage) {
        self.state.send_modify(|s| s.stage = stage);
    }

    fn reset_to(&self, stage: UploadStage, error: Option<String>) {
        self.progress.lock().reset();
        self.state.send_modify(|s| {
            *s = UploadState {
                progress: 0.0,
                stage,
                error,
            }
        });
    }
}

/// The summary endpoint answers with an error payload until the summary
/// exists, and with text prefixed `Err` when summarization failed.
fn summary_status(result: Result<String, BackendError>) -> Result<JobStatus, BackendError> {
    match result {
        Ok(text) if text.starts_with("Err") => Ok(JobStatus::Failed(text)),
        Ok(text) => Ok(JobStatus::Completed(text)),
        Err(BackendError::Rejected(_)) => Ok(JobStatus::Pending),
        Err(e) => Err(e),
    }
}

fn settle(handle: &JobHandle, outcome: PollOutcome) -> Result<String, TransferError> {
    match outcome {
        PollOutcome::Completed(result) => Ok(result),
        PollOutcome::Failed(reason) => Err(TransferError::JobFailed {
            kind: handle.kind,
            job_id: handle.job_id.clone(),
            reason,
        }),
        PollOutcome::Cancelled => Err(TransferError::Cancelled),
    }
}
