use super::ApiError;
use crate::adapters::local::InMemoryBackend;
use crate::adapters::wire::{ChunkAccepted, FileCompleted, SessionCreated};
use crate::domain::upload::{StartUploadRequest, UploadStatus};
use crate::ports::upload::UploadPort;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;

pub async fn start(
    State(backend): State<InMemoryBackend>,
    Json(request): Json<StartUploadRequest>,
) -> Result<Json<SessionCreated>, ApiError> {
    let session_id = backend.start_upload(&request).await?;
    Ok(Json(SessionCreated { session_id }))
}

pub async fn chunk(
    State(backend): State<InMemoryBackend>,
    Path((session_id, index)): Path<(String, u64)>,
    body: Bytes,
) -> Result<Json<ChunkAccepted>, ApiError> {
    backend.upload_chunk(&session_id, index, body).await?;
    Ok(Json(ChunkAccepted {
        message: format!("Chunk {index} uploaded"),
    }))
}

pub async fn status(
    State(backend): State<InMemoryBackend>,
    Path(session_id): Path<String>,
) -> Result<Json<UploadStatus>, ApiError> {
    Ok(Json(backend.get_upload_status(&session_id).await?))
}

pub async fn complete(
    State(backend): State<InMemoryBackend>,
    Path(session_id): Path<String>,
) -> Result<Json<FileCompleted>, ApiError> {
    let file_id = backend.complete_upload(&session_id).await?;
    Ok(Json(FileCompleted { file_id }))
}
