//! HTTP inbound adapter.
//!
//! Serves an [`InMemoryBackend`] over the same JSON contract the
//! `remote::HttpBackend` client speaks.

mod error;
mod files;
mod jobs;
mod uploads;

use super::InMemoryBackend;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

pub fn router(backend: InMemoryBackend) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/uploads", post(uploads::start))
        .route("/uploads/:session_id", get(uploads::status))
        .route("/uploads/:session_id/chunks/:index", put(uploads::chunk))
        .route("/uploads/:session_id/complete", post(uploads::complete))
        .route("/files/:file_id/transcription", post(jobs::start_transcription))
        .route(
            "/files/:file_id/summary",
            post(jobs::start_summarization).get(jobs::summary),
        )
        .route("/files/:file_id/content", get(files::content))
        .route("/transcriptions/:job_id/status", get(jobs::transcription_status))
        .route("/transcriptions/:job_id/result", get(jobs::transcription_result))
        .layer(cors)
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
        .with_state(backend)
}
