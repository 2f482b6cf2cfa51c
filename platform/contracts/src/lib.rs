//! # Booking platform event contracts
//!
//! Canonical event envelope and payload types shared by every module
//! ([`event-bus`] carries the transport, this crate carries the schema).
//! Centralizing the sum type here means a change to an event shape is a
//! one-crate edit, and every consumer gets it at compile time instead of
//! discovering a typo in a `serde_json::Value` at runtime.

mod envelope;
mod events;
mod status;

pub use envelope::Envelope;
pub use events::{
    AccessCodeIssuedPayload, AccessIssueFailedPayload, BookingCancelledPayload,
    BookingCheckedInPayload, BookingCheckedOutPayload, BookingCreatedPayload, BookingReadyPayload,
    DomainEvent, QuotaDeniedPayload, QuotaReservedPayload,
};
pub use status::{AccessStatus, BookingStatus, QuotaStatus};
