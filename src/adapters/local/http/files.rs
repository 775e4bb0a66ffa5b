use super::ApiError;
use crate::adapters::local::InMemoryBackend;
use crate::adapters::wire::{RangeQuery, TOTAL_SIZE_HEADER};
use crate::ports::media::MediaPort;
use axum::extract::{Path, Query, State};
use axum::http::header::{self, HeaderName};
use axum::response::{IntoResponse, Response};

/// Byte-range read: `?start=&length=`, the full size travels in a header.
pub async fn content(
    State(backend): State<InMemoryBackend>,
    Path(file_id): Path<String>,
    Query(range): Query<RangeQuery>,
) -> Result<Response, ApiError> {
    let chunk = backend
        .get_file_chunk(&file_id, range.start, range.length)
        .await?;

    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (
            HeaderName::from_static(TOTAL_SIZE_HEADER),
            chunk.total_size.to_string(),
        ),
    ];
    Ok((headers, chunk.data).into_response())
}
