use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccessCodeRow {
    pub booking_id: i64,
    pub code: String,
    pub valid_from: DateTime<Utc>,
    pub valid_to: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidateQuery {
    #[serde(rename = "bookingId")]
    pub booking_id: i64,
    pub code: String,
}
