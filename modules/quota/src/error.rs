use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Commit/release never reject on business grounds (spec.md §4.4: a
/// missing reservation id returns `{ok: false}`), so the only error
/// surfaced here is the database failing.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let ApiError::Database(e) = &self;
        tracing::error!(error = %e, "database error handling request");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}
