use axum::extract::{Query, State};
use axum::routing::post;
use axum::{Json, Router};
use sqlx::PgPool;

use crate::error::ApiError;
use crate::models::{OkResponse, ReservationQuery};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/quotas/commit", post(commit))
        .route("/v1/quotas/release", post(release))
        .with_state(state)
}

async fn commit(
    State(state): State<AppState>,
    Query(query): Query<ReservationQuery>,
) -> Result<Json<OkResponse>, ApiError> {
    set_status(&state.pool, query.reservation_id, "COMMITTED").await
}

async fn release(
    State(state): State<AppState>,
    Query(query): Query<ReservationQuery>,
) -> Result<Json<OkResponse>, ApiError> {
    set_status(&state.pool, query.reservation_id, "RELEASED").await
}

/// Idempotent: re-applying the same target status to an already-settled
/// reservation is a no-op success, not an error (spec.md §4.4).
async fn set_status(pool: &PgPool, reservation_id: i64, status: &str) -> Result<Json<OkResponse>, ApiError> {
    let result = sqlx::query("UPDATE quota_reservations SET status = $1 WHERE id = $2")
        .bind(status)
        .bind(reservation_id)
        .execute(pool)
        .await?;

    Ok(Json(OkResponse { ok: result.rows_affected() > 0 }))
}
