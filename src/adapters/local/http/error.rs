use crate::adapters::wire::ErrorBody;
use crate::error::BackendError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

/// A [`BackendError`] rendered as an `{error}` body.
#[derive(Debug)]
pub struct ApiError(pub BackendError);

impl From<BackendError> for ApiError {
    fn from(err: BackendError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self.0 {
            BackendError::Incomplete(m) => (StatusCode::CONFLICT, m),
            BackendError::Rejected(m) => (StatusCode::BAD_REQUEST, m),
            BackendError::Transport(m) => (StatusCode::BAD_GATEWAY, m),
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}
