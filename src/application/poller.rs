use crate::domain::jobs::{JobHandle, JobStatus, PollOutcome};
use crate::error::{BackendError, TransferError};
use crate::ports::clock::Clock;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Backoff schedule for polling one job.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    /// Multiplier applied to the interval after every `Pending` answer
    pub growth_factor: f64,
    pub max_interval: Duration,
    /// Give up after sleeping this long in total. `None` polls until a
    /// terminal status or cancellation.
    pub max_total_wait: Option<Duration>,
}

impl PollPolicy {
    /// Transcription jobs run long: start slow.
    pub fn transcription() -> Self {
        Self {
            initial_interval: Duration::from_secs(2),
            growth_factor: 1.2,
            max_interval: Duration::from_secs(10),
            max_total_wait: None,
        }
    }

    /// Summaries usually finish quickly: start fast.
    pub fn summarization() -> Self {
        Self {
            initial_interval: Duration::from_secs(1),
            growth_factor: 1.1,
            max_interval: Duration::from_secs(5),
            max_total_wait: None,
        }
    }

    /// Interval following `current`, capped at `max_interval`. A growth
    /// factor that overflows `Duration` jumps straight to the cap.
    pub fn next_interval(&self, current: Duration) -> Duration {
        let factor = self.growth_factor.max(1.0);
        Duration::try_from_secs_f64(current.as_secs_f64() * factor)
            .map_or(self.max_interval, |grown| grown.min(self.max_interval))
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::transcription()
    }
}

/// Drives a job to a terminal status by repeated status queries.
///
/// Cloning shares the registry of active jobs, so at most one loop runs per
/// [`JobHandle`] across all clones.
#[derive(Clone)]
pub struct JobPoller<C> {
    clock: C,
    active: Arc<Mutex<HashSet<JobHandle>>>,
}

/// Removes the handle from the active set when the loop ends.
struct ActiveGuard {
    active: Arc<Mutex<HashSet<JobHandle>>>,
    handle: JobHandle,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active.lock().remove(&self.handle);
    }
}

impl<C> JobPoller<C>
where
    C: Clock,
{
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn is_active(&self, handle: &JobHandle) -> bool {
        self.active.lock().contains(handle)
    }

    /// Query `status` until it reports `Completed` or `Failed`.
    ///
    /// After each `Pending` the poller sleeps for the current interval, then
    /// grows the interval by the policy's factor. Terminal statuses return
    /// immediately without sleeping. Cancellation is observed before each
    /// query and during the sleep, and yields [`PollOutcome::Cancelled`].
    pub async fn poll<F, Fut>(
        &self,
        handle: &JobHandle,
        policy: &PollPolicy,
        cancel: &CancellationToken,
        mut status: F,
    ) -> Result<PollOutcome, TransferError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<JobStatus, BackendError>>,
    {
        let _guard = self.register(handle)?;
        let mut interval = policy.initial_interval;
        let mut waited = Duration::ZERO;
        let mut queries = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Ok(PollOutcome::Cancelled);
            }

            let current = tokio::select! {
                _ = cancel.cancelled() => return Ok(PollOutcome::Cancelled),
                current = status() => current.map_err(TransferError::from_backend)?,
            };
            queries += 1;

            match current {
                JobStatus::Completed(result) => {
                    info!(job_id = %handle.job_id, kind = %handle.kind, queries, "job completed");
                    return Ok(PollOutcome::Completed(result));
                }
                JobStatus::Failed(reason) => {
                    warn!(job_id = %handle.job_id, kind = %handle.kind, %reason, "job failed");
                    return Ok(PollOutcome::Failed(reason));
                }
                JobStatus::Pending => {}
            }

            if let Some(limit) = policy.max_total_wait {
                if waited >= limit {
                    return Err(TransferError::PollTimeout {
                        kind: handle.kind,
                        job_id: handle.job_id.clone(),
                        waited,
                    });
                }
            }

            debug!(
                job_id = %handle.job_id,
                kind = %handle.kind,
                interval_ms = interval.as_millis() as u64,
                "job pending"
            );
            tokio::select! {
                _ = cancel.cancelled() => return Ok(PollOutcome::Cancelled),
                _ = self.clock.sleep(interval) => {}
            }
            waited += interval;
            interval = policy.next_interval(interval);
        }
    }

    fn register(&self, handle: &JobHandle) -> Result<ActiveGuard, TransferError> {
        let mut active = self.active.lock();
        if !active.insert(handle.clone()) {
            return Err(TransferError::PollerBusy(handle.job_id.clone()));
        }
        Ok(ActiveGuard {
            active: self.active.clone(),
            handle: handle.clone(),
        })
    }
}
