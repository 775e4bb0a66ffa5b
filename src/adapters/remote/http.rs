use crate::adapters::wire::{
    ChunkAccepted, ErrorBody, FileCompleted, JobStarted, SessionCreated, TextBody,
    TOTAL_SIZE_HEADER,
};
use crate::domain::jobs::JobStatus;
use crate::domain::media::FileChunk;
use crate::domain::upload::{StartUploadRequest, UploadStatus};
use crate::error::BackendError;
use crate::ports::jobs::JobPort;
use crate::ports::media::MediaPort;
use crate::ports::upload::UploadPort;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::time::Duration;
use tracing::debug;

/// Implements every backend port against the JSON HTTP API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self, BackendError> {
        Self::with_timeout(base_url, None)
    }

    /// `timeout` bounds each request. `None` waits indefinitely.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, BackendError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| BackendError::transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::transport(e.to_string()))?;
        check(response).await
    }

    async fn json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        self.execute(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| BackendError::transport(format!("invalid response body: {e}")))
    }
}

/// Percent-encode an id for use as a single path segment.
fn segment(id: &str) -> Cow<'_, str> {
    urlencoding::encode(id)
}

/// Turn a non-success response into the matching [`BackendError`].
async fn check(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => parsed.error,
        Err(_) if !body.is_empty() => body,
        Err(_) => status.to_string(),
    };
    debug!(%status, %message, "backend returned an error");

    if status == StatusCode::CONFLICT {
        Err(BackendError::Incomplete(message))
    } else {
        Err(BackendError::Rejected(message))
    }
}

#[async_trait]
impl UploadPort for HttpBackend {
    async fn start_upload(&self, request: &StartUploadRequest) -> Result<String, BackendError> {
        let created: SessionCreated = self
            .json(self.client.post(self.url("/uploads")).json(request))
            .await?;
        Ok(created.session_id)
    }

    async fn upload_chunk(
        &self,
        session_id: &str,
        index: u64,
        bytes: Bytes,
    ) -> Result<(), BackendError> {
        let url = self.url(&format!("/uploads/{}/chunks/{index}", segment(session_id)));
        let _: ChunkAccepted = self
            .json(
                self.client
                    .put(url)
                    .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                    .body(bytes),
            )
            .await?;
        Ok(())
    }

    async fn get_upload_status(&self, session_id: &str) -> Result<UploadStatus, BackendError> {
        self.json(self.client.get(self.url(&format!("/uploads/{}", segment(session_id)))))
            .await
    }

    async fn complete_upload(&self, session_id: &str) -> Result<String, BackendError> {
        let url = self.url(&format!("/uploads/{}/complete", segment(session_id)));
        let completed: FileCompleted = self.json(self.client.post(url)).await?;
        Ok(completed.file_id)
    }
}

#[async_trait]
impl JobPort for HttpBackend {
    async fn start_transcription(&self, file_id: &str) -> Result<String, BackendError> {
        let url = self.url(&format!("/files/{}/transcription", segment(file_id)));
        let started: JobStarted = self.json(self.client.post(url)).await?;
        Ok(started.job_id)
    }

    async fn get_transcription_status(&self, job_id: &str) -> Result<JobStatus, BackendError> {
        let url = self.url(&format!("/transcriptions/{}/status", segment(job_id)));
        self.json(self.client.get(url)).await
    }

    async fn get_transcription_result(&self, job_id: &str) -> Result<String, BackendError> {
        let url = self.url(&format!("/transcriptions/{}/result", segment(job_id)));
        let body: TextBody = self.json(self.client.get(url)).await?;
        Ok(body.text)
    }

    async fn start_summarization(&self, file_id: &str) -> Result<String, BackendError> {
        let url = self.url(&format!("/files/{}/summary", segment(file_id)));
        let started: JobStarted = self.json(self.client.post(url)).await?;
        Ok(started.job_id)
    }

    async fn get_summary_result(&self, file_id: &str) -> Result<String, BackendError> {
        let url = self.url(&format!("/files/{}/summary", segment(file_id)));
        let body: TextBody = self.json(self.client.get(url)).await?;
        Ok(body.text)
    }
}

#[async_trait]
impl MediaPort for HttpBackend {
    async fn get_file_chunk(
        &self,
        file_id: &str,
        start: u64,
        length: u64,
    ) -> Result<FileChunk, BackendError> {
        let request = self
            .client
            .get(self.url(&format!("/files/{}/content", segment(file_id))))
            .query(&[("start", start), ("length", length)]);
        let response = self.execute(request).await?;

        let total_size = response
            .headers()
            .get(TOTAL_SIZE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| BackendError::transport(format!("missing {TOTAL_SIZE_HEADER} header")))?;
        let data = response
            .bytes()
            .await
            .map_err(|e| BackendError::transport(e.to_string()))?;

        Ok(FileChunk { data, total_size })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalised() {
        let backend = HttpBackend::new("http://localhost:3000/").unwrap();
        assert_eq!(backend.base_url(), "http://localhost:3000");
        assert_eq!(backend.url("/uploads"), "http://localhost:3000/uploads");
    }

    #[test]
    fn test_ids_stay_within_one_path_segment() {
        assert_eq!(segment("abc-123"), "abc-123");
        assert_eq!(segment("a/b?c#d"), "a%2Fb%3Fc%23d");
        assert_eq!(segment("x y"), "x%20y");
    }
}
