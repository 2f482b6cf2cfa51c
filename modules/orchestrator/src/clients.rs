use std::time::Duration;

use serde::Deserialize;

/// HTTP calls to peer services carry a 5-second timeout (spec.md §5).
const PEER_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct AccessClient {
    base_url: String,
    http: reqwest::Client,
}

impl AccessClient {
    pub fn new(base_url: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(PEER_TIMEOUT)
            .build()
            .expect("reqwest client config is valid");
        Self { base_url, http }
    }

    /// A timeout or connection failure here surfaces to the caller as
    /// an invalid code (spec.md §5: "a timeout on CheckIn→Access-validate
    /// surfaces as 401"), so this returns `bool`, not a `Result`.
    pub async fn validate(&self, booking_id: i64, code: &str) -> bool {
        #[derive(Deserialize)]
        struct ValidateResponse {
            valid: bool,
        }

        let result = self
            .http
            .post(format!("{}/v1/access/validate", self.base_url))
            .query(&[("bookingId", booking_id.to_string()), ("code", code.to_string())])
            .send()
            .await;

        match result {
            Ok(response) => match response.error_for_status() {
                Ok(response) => response
                    .json::<ValidateResponse>()
                    .await
                    .map(|r| r.valid)
                    .unwrap_or(false),
                Err(e) => {
                    tracing::warn!(error = %e, booking_id, "access validate returned error status");
                    false
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, booking_id, "access validate call failed, treating code as invalid");
                false
            }
        }
    }
}

#[derive(Clone)]
pub struct QuotaClient {
    base_url: String,
    http: reqwest::Client,
}

impl QuotaClient {
    pub fn new(base_url: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(PEER_TIMEOUT)
            .build()
            .expect("reqwest client config is valid");
        Self { base_url, http }
    }

    /// Best-effort: checkout never fails because of this call
    /// (spec.md §4.2 CheckOut: "failure non-fatal").
    pub async fn commit(&self, reservation_id: &str) {
        let result = self
            .http
            .post(format!("{}/v1/quotas/commit", self.base_url))
            .query(&[("reservationId", reservation_id)])
            .send()
            .await;

        if let Err(e) = result {
            tracing::warn!(error = %e, reservation_id, "quota commit call failed, ignoring (best-effort)");
        }
    }
}
