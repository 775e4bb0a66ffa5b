//! Error types shared by ports and services.

use crate::domain::jobs::JobKind;
use std::time::Duration;

/// Failure reported by a backend port.
///
/// Ports only distinguish "could not reach the backend" from "the backend
/// answered with an error payload". Services turn these into [`TransferError`]
/// with the context of the stage that failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("{0}")]
    Rejected(String),

    /// The backend refused to finalize a session because chunks are missing.
    #[error("missing chunks: {0}")]
    Incomplete(String),
}

impl BackendError {
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport(reason.into())
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend rejected request: {0}")]
    BackendRejected(String),

    #[error("chunk {index} rejected: {reason}")]
    ChunkRejected { index: u64, reason: String },

    #[error("upload incomplete: {0}")]
    IncompleteUpload(String),

    #[error("{kind} job {job_id} failed: {reason}")]
    JobFailed {
        kind: JobKind,
        job_id: String,
        reason: String,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("{kind} job {job_id} still pending after {waited:?}")]
    PollTimeout {
        kind: JobKind,
        job_id: String,
        waited: Duration,
    },

    #[error("a poller is already active for job {0}")]
    PollerBusy(String),

    #[error("an upload is already in progress")]
    UploadInProgress,

    #[error("invalid file: {0}")]
    InvalidFile(String),

    #[error("chunk index {index} out of range ({total} chunks)")]
    ChunkOutOfRange { index: u64, total: u64 },

    #[error("no media has been loaded")]
    NothingLoaded,

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl TransferError {
    /// Map a port failure that is not tied to a specific chunk.
    pub fn from_backend(err: BackendError) -> Self {
        match err {
            BackendError::Transport(reason) => Self::Transport(reason),
            BackendError::Rejected(reason) => Self::BackendRejected(reason),
            BackendError::Incomplete(reason) => Self::IncompleteUpload(reason),
        }
    }

    /// Map a port failure raised while submitting chunk `index`.
    pub fn from_chunk(index: u64, err: BackendError) -> Self {
        match err {
            BackendError::Transport(reason) => Self::Transport(reason),
            BackendError::Rejected(reason) | BackendError::Incomplete(reason) => {
                Self::ChunkRejected { index, reason }
            }
        }
    }

    /// Cancellation is an outcome, not a failure to show to the user.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<BackendError> for TransferError {
    fn from(err: BackendError) -> Self {
        Self::from_backend(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_failures_keep_their_index() {
        let err = TransferError::from_chunk(2, BackendError::rejected("Invalid chunk index"));
        match err {
            TransferError::ChunkRejected { index, reason } => {
                assert_eq!(index, 2);
                assert_eq!(reason, "Invalid chunk index");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn transport_failures_stay_transport_errors() {
        let err = TransferError::from_chunk(0, BackendError::transport("connection reset"));
        assert!(matches!(err, TransferError::Transport(_)));

        let err: TransferError = BackendError::Incomplete("2 of 4 received".into()).into();
        assert!(matches!(err, TransferError::IncompleteUpload(_)));
    }

    #[test]
    fn only_cancellation_is_cancelled() {
        assert!(TransferError::Cancelled.is_cancelled());
        assert!(!TransferError::BackendRejected("quota exceeded".into()).is_cancelled());
    }
}
