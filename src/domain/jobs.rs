use serde::{Deserialize, Serialize};
use std::fmt;

/// The two backend computations driven after an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    Transcription,
    Summarization,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Transcription => write!(f, "transcription"),
            JobKind::Summarization => write!(f, "summarization"),
        }
    }
}

/// A running backend job, observed only through polling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle {
    pub job_id: String,
    pub kind: JobKind,
}

impl JobHandle {
    pub fn transcription(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            kind: JobKind::Transcription,
        }
    }

    pub fn summarization(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            kind: JobKind::Summarization,
        }
    }
}

/// Status of a job as reported by the backend.
///
/// `Completed` and `Failed` are terminal: once observed, the job is never
/// queried again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data")]
pub enum JobStatus {
    Pending,
    Completed(String),
    Failed(String),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

/// How a polling loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Carries the backend's result reference (or the result itself).
    Completed(String),
    Failed(String),
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_format() {
        let pending = serde_json::to_string(&JobStatus::Pending).unwrap();
        assert_eq!(pending, r#"{"status":"Pending"}"#);

        let done: JobStatus =
            serde_json::from_str(r#"{"status":"Completed","data":"job-1"}"#).unwrap();
        assert_eq!(done, JobStatus::Completed("job-1".to_string()));
        assert!(done.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(JobKind::Transcription.to_string(), "transcription");
        assert_eq!(JobHandle::summarization("s1").kind.to_string(), "summarization");
    }
}
