//! In-process backend holding sessions, files and jobs in memory.
//!
//! Behaves like the real service closely enough to drive the whole client
//! against it: indices are validated, duplicate chunks are accepted once,
//! completion checks that every chunk arrived, and jobs answer `Pending` for
//! a configurable number of polls before finishing.

mod jobs;
mod media;
mod uploads;

use crate::domain::media::MediaDescriptor;
use crate::domain::upload::{StartUploadRequest, DEFAULT_MAX_UPLOAD_SIZE};
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct BackendSettings {
    /// Status polls answered with `Pending` before a job finishes
    pub pending_polls: u32,
    pub max_upload_size: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            pending_polls: 3,
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
        }
    }
}

struct Session {
    request: StartUploadRequest,
    chunks: BTreeMap<u64, Bytes>,
}

struct StoredFile {
    filename: String,
    content_type: String,
    data: Bytes,
}

struct Job {
    file_id: String,
    polls_left: u32,
    /// `Err` carries the failure reason
    outcome: Result<String, String>,
}

impl Job {
    /// Count one status poll. Returns `true` once the job has finished.
    fn poll(&mut self) -> bool {
        if self.polls_left > 0 {
            self.polls_left -= 1;
            false
        } else {
            true
        }
    }
}

#[derive(Default)]
struct Store {
    sessions: HashMap<String, Session>,
    files: HashMap<String, StoredFile>,
    transcriptions: HashMap<String, Job>,
    /// Keyed by file id, the summary endpoint is addressed by file
    summaries: HashMap<String, Job>,
    failing: HashMap<String, String>,
}

/// Cheap to clone; clones share the same store.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    store: Arc<Mutex<Store>>,
    settings: BackendSettings,
}

impl InMemoryBackend {
    pub fn new(settings: BackendSettings) -> Self {
        Self {
            store: Arc::new(Mutex::new(Store::default())),
            settings,
        }
    }

    pub fn settings(&self) -> &BackendSettings {
        &self.settings
    }

    /// Store a file directly, bypassing the upload protocol.
    pub fn insert_file(
        &self,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        data: Bytes,
    ) -> String {
        let file_id = new_id();
        self.store.lock().files.insert(
            file_id.clone(),
            StoredFile {
                filename: filename.into(),
                content_type: content_type.into(),
                data,
            },
        );
        file_id
    }

    pub fn file_bytes(&self, file_id: &str) -> Option<Bytes> {
        self.store.lock().files.get(file_id).map(|f| f.data.clone())
    }

    pub fn describe(&self, file_id: &str) -> Option<MediaDescriptor> {
        self.store.lock().files.get(file_id).map(|f| {
            MediaDescriptor::new(file_id, f.data.len() as u64, f.content_type.clone())
                .with_filename(f.filename.clone())
        })
    }

    /// Make every job started for `file_id` fail with `reason`.
    pub fn fail_jobs_for(&self, file_id: impl Into<String>, reason: impl Into<String>) {
        self.store.lock().failing.insert(file_id.into(), reason.into());
    }

    pub fn open_sessions(&self) -> usize {
        self.store.lock().sessions.len()
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::jobs::JobStatus;
    use crate::error::BackendError;
    use crate::ports::jobs::JobPort;
    use crate::ports::media::MediaPort;
    use crate::ports::upload::UploadPort;

    fn backend(pending_polls: u32) -> InMemoryBackend {
        InMemoryBackend::new(BackendSettings {
            pending_polls,
            max_upload_size: 64,
        })
    }

    fn request(total_size: u64, total_chunks: u64) -> StartUploadRequest {
        StartUploadRequest {
            filename: "memo.m4a".to_string(),
            content_type: "audio/mp4".to_string(),
            total_size,
            total_chunks,
        }
    }

    #[tokio::test]
    async fn test_upload_protocol() {
        let backend = backend(0);
        let sid = backend.start_upload(&request(10, 3)).await.unwrap();

        backend.upload_chunk(&sid, 1, Bytes::from_static(b"defg")).await.unwrap();
        backend.upload_chunk(&sid, 0, Bytes::from_static(b"abc")).await.unwrap();
        // duplicates are accepted and ignored
        backend.upload_chunk(&sid, 0, Bytes::from_static(b"zzz")).await.unwrap();

        let status = backend.get_upload_status(&sid).await.unwrap();
        assert_eq!((status.uploaded_chunks, status.total_chunks), (2, 3));
        assert!(matches!(
            backend.complete_upload(&sid).await,
            Err(BackendError::Incomplete(_))
        ));

        backend.upload_chunk(&sid, 2, Bytes::from_static(b"hij")).await.unwrap();
        let file_id = backend.complete_upload(&sid).await.unwrap();

        assert_eq!(backend.file_bytes(&file_id).unwrap(), Bytes::from_static(b"abcdefghij"));
        assert_eq!(backend.open_sessions(), 0);
        assert!(matches!(
            backend.upload_chunk(&sid, 0, Bytes::new()).await,
            Err(BackendError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_start_upload_validation() {
        let backend = backend(0);
        assert!(backend.start_upload(&request(65, 2)).await.is_err());
        assert!(backend.start_upload(&request(10, 0)).await.is_err());

        let sid = backend.start_upload(&request(10, 2)).await.unwrap();
        let err = backend
            .upload_chunk(&sid, 2, Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_size_mismatch_is_rejected() {
        let backend = backend(0);
        let sid = backend.start_upload(&request(10, 1)).await.unwrap();
        backend.upload_chunk(&sid, 0, Bytes::from_static(b"short")).await.unwrap();
        assert!(matches!(
            backend.complete_upload(&sid).await,
            Err(BackendError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_jobs_stay_pending_then_finish() {
        let backend = backend(2);
        let file_id = backend.insert_file("a.wav", "audio/wav", Bytes::from_static(b"RIFF"));

        let job_id = backend.start_transcription(&file_id).await.unwrap();
        assert_eq!(backend.get_transcription_status(&job_id).await.unwrap(), JobStatus::Pending);
        assert!(backend.get_transcription_result(&job_id).await.is_err());
        assert_eq!(backend.get_transcription_status(&job_id).await.unwrap(), JobStatus::Pending);
        assert_eq!(
            backend.get_transcription_status(&job_id).await.unwrap(),
            JobStatus::Completed(job_id.clone())
        );
        assert!(backend.get_transcription_result(&job_id).await.unwrap().contains("a.wav"));

        backend.start_summarization(&file_id).await.unwrap();
        assert!(matches!(
            backend.get_summary_result(&file_id).await,
            Err(BackendError::Rejected(_))
        ));
        backend.get_summary_result(&file_id).await.unwrap_err();
        assert!(backend.get_summary_result(&file_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_failing_jobs() {
        let backend = backend(0);
        let file_id = backend.insert_file("a.wav", "audio/wav", Bytes::from_static(b"RIFF"));
        backend.fail_jobs_for(&file_id, "no speech detected");

        let job_id = backend.start_transcription(&file_id).await.unwrap();
        assert_eq!(
            backend.get_transcription_status(&job_id).await.unwrap(),
            JobStatus::Failed("no speech detected".to_string())
        );

        backend.start_summarization(&file_id).await.unwrap();
        let text = backend.get_summary_result(&file_id).await.unwrap();
        assert!(text.starts_with("Err"));
    }

    #[tokio::test]
    async fn test_byte_range_reads() {
        let backend = backend(0);
        let file_id = backend.insert_file("v.mp4", "video/mp4", Bytes::from_static(b"0123456789"));

        let chunk = backend.get_file_chunk(&file_id, 8, 4).await.unwrap();
        assert_eq!(chunk.data, Bytes::from_static(b"89"));
        assert_eq!(chunk.total_size, 10);

        assert!(backend.get_file_chunk(&file_id, 10, 4).await.is_err());
        assert!(backend.get_file_chunk("missing", 0, 4).await.is_err());

        let descriptor = backend.describe(&file_id).unwrap();
        assert_eq!(descriptor.total_size, 10);
        assert_eq!(descriptor.download_name(), "v.mp4");
    }
}
