use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookingRow {
    pub id: i64,
    pub user_id: i64,
    pub studio_id: i64,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub status: String,
    pub code: Option<String>,
    pub quota_reservation_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub user_id: i64,
    pub studio_id: i64,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingResponse {
    pub id: i64,
    pub user_id: i64,
    pub studio_id: i64,
    pub start: String,
    pub end: String,
    pub status: String,
    pub code: Option<String>,
    pub quota_reservation_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckInQuery {
    pub code: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: String,
}
