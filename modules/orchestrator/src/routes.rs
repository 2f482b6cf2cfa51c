use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono_tz::Tz;
use contracts::{BookingCheckedInPayload, BookingCheckedOutPayload, BookingCreatedPayload, BookingStatus, DomainEvent};
use sqlx::PgPool;

use crate::clients::{AccessClient, QuotaClient};
use crate::domain::{can_check_in, can_check_out, parse_and_localize, render_local, validate_interval};
use crate::error::ApiError;
use crate::models::{BookingResponse, BookingRow, CheckInQuery, CreateBookingRequest, StatusResponse};
use crate::outbox::enqueue_event;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub access: AccessClient,
    pub quota: QuotaClient,
    pub local_tz: Tz,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/bookings", post(create_booking))
        .route("/v1/bookings/{id}", get(get_booking))
        .route("/v1/bookings/{id}/checkin", post(check_in))
        .route("/v1/bookings/{id}/checkout", post(check_out))
        .with_state(state)
}

fn to_response(row: &BookingRow, local_tz: Tz) -> BookingResponse {
    BookingResponse {
        id: row.id,
        user_id: row.user_id,
        studio_id: row.studio_id,
        start: render_local(row.start_at, local_tz).to_rfc3339(),
        end: render_local(row.end_at, local_tz).to_rfc3339(),
        status: row.status.clone(),
        code: row.code.clone(),
        quota_reservation_id: row.quota_reservation_id.clone(),
        created_at: render_local(row.created_at, local_tz).to_rfc3339(),
    }
}

async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let start = parse_and_localize(&req.start, state.local_tz).map_err(|_| ApiError::InvalidInterval)?;
    let end = parse_and_localize(&req.end, state.local_tz).map_err(|_| ApiError::InvalidInterval)?;

    if !validate_interval(start, end) {
        return Err(ApiError::InvalidInterval);
    }

    let mut tx = state.pool.begin().await?;

    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO bookings (user_id, studio_id, start_at, end_at, status, created_at)
         VALUES ($1, $2, $3, $4, $5, NOW())
         RETURNING id",
    )
    .bind(req.user_id)
    .bind(req.studio_id)
    .bind(start)
    .bind(end)
    .bind(BookingStatus::Pending.as_str())
    .fetch_one(&mut *tx)
    .await?;

    let event = DomainEvent::BookingCreated(BookingCreatedPayload {
        booking_id: id,
        user_id: req.user_id,
        studio_id: req.studio_id,
        start,
        end,
    });
    enqueue_event(&mut tx, &event).await?;
    tx.commit().await?;

    let row = BookingRow {
        id,
        user_id: req.user_id,
        studio_id: req.studio_id,
        start_at: start,
        end_at: end,
        status: BookingStatus::Pending.as_str().to_string(),
        code: None,
        quota_reservation_id: None,
        created_at: chrono::Utc::now(),
    };

    Ok((StatusCode::CREATED, Json(to_response(&row, state.local_tz))))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BookingResponse>, ApiError> {
    let row = fetch_booking(&state.pool, id).await?.ok_or(ApiError::BookingNotFound(id))?;
    Ok(Json(to_response(&row, state.local_tz)))
}

async fn check_in(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<CheckInQuery>,
) -> Result<Json<StatusResponse>, ApiError> {
    let mut tx = state.pool.begin().await?;

    let row = sqlx::query_as::<_, BookingRow>(
        "SELECT id, user_id, studio_id, start_at, end_at, status, code, quota_reservation_id, created_at
         FROM bookings WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(ApiError::BookingNotFound(id))?;

    let status: BookingStatus = row.status.parse().unwrap_or(BookingStatus::Pending);
    if !can_check_in(status) {
        return Err(ApiError::WrongStatus(id, status.to_string(), BookingStatus::Ready.to_string()));
    }

    if !state.access.validate(id, &query.code).await {
        return Err(ApiError::InvalidCode);
    }

    sqlx::query("UPDATE bookings SET status = $1 WHERE id = $2")
        .bind(BookingStatus::InUse.as_str())
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let event = DomainEvent::BookingCheckedIn(BookingCheckedInPayload { booking_id: id });
    enqueue_event(&mut tx, &event).await?;
    tx.commit().await?;

    Ok(Json(StatusResponse { status: BookingStatus::InUse.to_string() }))
}

async fn check_out(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<StatusResponse>, ApiError> {
    let mut tx = state.pool.begin().await?;

    let row = sqlx::query_as::<_, BookingRow>(
        "SELECT id, user_id, studio_id, start_at, end_at, status, code, quota_reservation_id, created_at
         FROM bookings WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(ApiError::BookingNotFound(id))?;

    let status: BookingStatus = row.status.parse().unwrap_or(BookingStatus::Pending);
    if !can_check_out(status) {
        return Err(ApiError::WrongStatus(id, status.to_string(), BookingStatus::InUse.to_string()));
    }

    if let Some(reservation_id) = &row.quota_reservation_id {
        state.quota.commit(reservation_id).await;
    }

    sqlx::query("UPDATE bookings SET status = $1 WHERE id = $2")
        .bind(BookingStatus::Finished.as_str())
        .bind(id)
        .execute(&mut *tx)
        .await?;

    let event = DomainEvent::BookingCheckedOut(BookingCheckedOutPayload { booking_id: id });
    enqueue_event(&mut tx, &event).await?;
    tx.commit().await?;

    Ok(Json(StatusResponse { status: BookingStatus::Finished.to_string() }))
}

async fn fetch_booking(pool: &PgPool, id: i64) -> Result<Option<BookingRow>, sqlx::Error> {
    sqlx::query_as::<_, BookingRow>(
        "SELECT id, user_id, studio_id, start_at, end_at, status, code, quota_reservation_id, created_at
         FROM bookings WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}
