use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Error taxonomy for the orchestrator's synchronous commands
/// (spec.md §7): validation and wrong-status are caller errors,
/// not-found is 404, code mismatch is 401.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("start must be before end")]
    InvalidInterval,

    #[error("booking {0} not found")]
    BookingNotFound(i64),

    #[error("booking {0} has status {1}, expected {2}")]
    WrongStatus(i64, String, String),

    #[error("invalid access code")]
    InvalidCode,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidInterval => StatusCode::BAD_REQUEST,
            ApiError::BookingNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::WrongStatus(..) => StatusCode::CONFLICT,
            ApiError::InvalidCode => StatusCode::UNAUTHORIZED,
            ApiError::Database(e) => {
                tracing::error!(error = %e, "database error handling request");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}
