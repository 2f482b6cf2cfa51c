use std::fmt;

use serde::{Deserialize, Serialize};

/// Booking status domain (spec.md §3). Transition rules live with the
/// orchestrator's domain logic, not here — this type only carries the
/// enumeration and its wire/DB representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Pending,
    Ready,
    InUse,
    Finished,
    Cancelled,
}

impl BookingStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Finished | BookingStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Ready => "READY",
            BookingStatus::InUse => "IN_USE",
            BookingStatus::Finished => "FINISHED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BookingStatus::Pending),
            "READY" => Ok(BookingStatus::Ready),
            "IN_USE" => Ok(BookingStatus::InUse),
            "FINISHED" => Ok(BookingStatus::Finished),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status: {other}")),
        }
    }
}

/// Quota reservation status domain (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuotaStatus {
    Held,
    Committed,
    Released,
    Denied,
}

impl QuotaStatus {
    /// Rows counted toward the weekly cap (spec.md §4.4).
    pub fn counts_toward_cap(self) -> bool {
        matches!(self, QuotaStatus::Held | QuotaStatus::Committed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QuotaStatus::Held => "HELD",
            QuotaStatus::Committed => "COMMITTED",
            QuotaStatus::Released => "RELEASED",
            QuotaStatus::Denied => "DENIED",
        }
    }
}

impl fmt::Display for QuotaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QuotaStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HELD" => Ok(QuotaStatus::Held),
            "COMMITTED" => Ok(QuotaStatus::Committed),
            "RELEASED" => Ok(QuotaStatus::Released),
            "DENIED" => Ok(QuotaStatus::Denied),
            other => Err(format!("unknown quota status: {other}")),
        }
    }
}

/// Access code status domain (spec.md §3). Not asserted by the
/// validation rule in §4.3 (which checks code + window directly) but
/// carried on the row for operational visibility (e.g. manual revoke).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessStatus {
    Active,
    Revoked,
    Expired,
}

impl AccessStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AccessStatus::Active => "ACTIVE",
            AccessStatus::Revoked => "REVOKED",
            AccessStatus::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for AccessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccessStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(AccessStatus::Active),
            "REVOKED" => Ok(AccessStatus::Revoked),
            "EXPIRED" => Ok(AccessStatus::Expired),
            other => Err(format!("unknown access status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booking_status_round_trips_through_display_and_from_str() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Ready,
            BookingStatus::InUse,
            BookingStatus::Finished,
            BookingStatus::Cancelled,
        ] {
            assert_eq!(status.to_string().parse::<BookingStatus>().unwrap(), status);
        }
    }

    #[test]
    fn only_finished_and_cancelled_are_terminal() {
        assert!(!BookingStatus::Pending.is_terminal());
        assert!(!BookingStatus::Ready.is_terminal());
        assert!(!BookingStatus::InUse.is_terminal());
        assert!(BookingStatus::Finished.is_terminal());
        assert!(BookingStatus::Cancelled.is_terminal());
    }

    #[test]
    fn only_held_and_committed_count_toward_cap() {
        assert!(QuotaStatus::Held.counts_toward_cap());
        assert!(QuotaStatus::Committed.counts_toward_cap());
        assert!(!QuotaStatus::Released.counts_toward_cap());
        assert!(!QuotaStatus::Denied.counts_toward_cap());
    }

    #[test]
    fn quota_status_round_trips_through_display_and_from_str() {
        for status in [
            QuotaStatus::Held,
            QuotaStatus::Committed,
            QuotaStatus::Released,
            QuotaStatus::Denied,
        ] {
            assert_eq!(status.to_string().parse::<QuotaStatus>().unwrap(), status);
        }
    }

    #[test]
    fn rejects_unknown_status_strings() {
        assert!("WAT".parse::<BookingStatus>().is_err());
        assert!("WAT".parse::<QuotaStatus>().is_err());
        assert!("WAT".parse::<AccessStatus>().is_err());
    }
}
