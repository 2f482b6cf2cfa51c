use axum::extract::{Query, State};
use axum::routing::post;
use axum::{Json, Router};
use sqlx::PgPool;

use crate::domain::is_valid;
use crate::error::ApiError;
use crate::models::{AccessCodeRow, ValidateQuery, ValidateResponse};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/access/validate", post(validate))
        .with_state(state)
}

/// Read-only and idempotent (spec.md §4.3): repeating the same call
/// never changes anything this service owns.
async fn validate(
    State(state): State<AppState>,
    Query(query): Query<ValidateQuery>,
) -> Result<Json<ValidateResponse>, ApiError> {
    let row = sqlx::query_as::<_, AccessCodeRow>(
        "SELECT booking_id, code, valid_from, valid_to, status FROM access_codes WHERE booking_id = $1",
    )
    .bind(query.booking_id)
    .fetch_optional(&state.pool)
    .await?;

    let valid = match row {
        Some(row) => is_valid(&query.code, &row.code, row.valid_from, row.valid_to, chrono::Utc::now()),
        None => false,
    };

    Ok(Json(ValidateResponse { valid }))
}
