use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// `/v1/access/validate` never rejects a request for business reasons
/// (spec.md §4.3: an unknown booking or mismatched code is just
/// `{valid: false}`), so the only error this service surfaces is its
/// own database failing.
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
