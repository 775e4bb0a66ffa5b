use serde::Serialize;
use std::fmt;

/// Share of overall progress reserved for chunk transfer.
pub const UPLOAD_PHASE_CEILING: f64 = 70.0;
pub const PROCESSING_STARTED: f64 = 75.0;
pub const SESSION_COMPLETED: f64 = 80.0;
pub const TRANSCRIPTION_FETCHED: f64 = 90.0;
pub const SUMMARIZATION_STARTED: f64 = 95.0;
pub const DONE: f64 = 100.0;

/// Coarse status label of an orchestration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStage {
    #[default]
    Idle,
    Uploading,
    Processing,
    Complete,
    Error,
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UploadStage::Idle => "idle",
            UploadStage::Uploading => "uploading",
            UploadStage::Processing => "processing",
            UploadStage::Complete => "complete",
            UploadStage::Error => "error",
        };
        f.write_str(label)
    }
}

/// Observable state of an orchestration run.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct UploadState {
    /// 0..=100
    pub progress: f64,
    pub stage: UploadStage,
    /// Human readable message of the error that ended the run.
    pub error: Option<String>,
}

/// Monotonic progress value: smaller updates are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressLock {
    current: f64,
}

impl ProgressLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    /// Returns `true` when `value` moved progress forward.
    pub fn advance(&mut self, value: f64) -> bool {
        let value = value.clamp(0.0, DONE);
        if value > self.current {
            self.current = value;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.current = 0.0;
    }
}

/// Progress within the transfer phase after `completed` of `total` chunks.
pub fn upload_fraction(completed: u64, total: u64) -> f64 {
    if total == 0 {
        return UPLOAD_PHASE_CEILING;
    }
    ((completed as f64 / total as f64) * UPLOAD_PHASE_CEILING).min(UPLOAD_PHASE_CEILING)
}
