use super::ApiError;
use crate::adapters::local::InMemoryBackend;
use crate::adapters::wire::{JobStarted, TextBody};
use crate::domain::jobs::JobStatus;
use crate::ports::jobs::JobPort;
use axum::extract::{Path, State};
use axum::Json;

pub async fn start_transcription(
    State(backend): State<InMemoryBackend>,
    Path(file_id): Path<String>,
) -> Result<Json<JobStarted>, ApiError> {
    let job_id = backend.start_transcription(&file_id).await?;
    Ok(Json(JobStarted { job_id }))
}

pub async fn transcription_status(
    State(backend): State<InMemoryBackend>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatus>, ApiError> {
    Ok(Json(backend.get_transcription_status(&job_id).await?))
}

pub async fn transcription_result(
    State(backend): State<InMemoryBackend>,
    Path(job_id): Path<String>,
) -> Result<Json<TextBody>, ApiError> {
    let text = backend.get_transcription_result(&job_id).await?;
    Ok(Json(TextBody { text }))
}

pub async fn start_summarization(
    State(backend): State<InMemoryBackend>,
    Path(file_id): Path<String>,
) -> Result<Json<JobStarted>, ApiError> {
    let job_id = backend.start_summarization(&file_id).await?;
    Ok(Json(JobStarted { job_id }))
}

pub async fn summary(
    State(backend): State<InMemoryBackend>,
    Path(file_id): Path<String>,
) -> Result<Json<TextBody>, ApiError> {
    let text = backend.get_summary_result(&file_id).await?;
    Ok(Json(TextBody { text }))
}
