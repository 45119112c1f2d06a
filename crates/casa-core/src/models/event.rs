//! Domain events and the transactional outbox record
//!
//! Events are accumulated in memory on the booking aggregate and drained into
//! the `booking_events` outbox table in the same transaction as the status
//! change that produced them. Downstream consumers read the outbox with
//! at-least-once semantics and must deduplicate by (aggregate_id, event_type,
//! occurred_at).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type identifiers written to the outbox
pub mod event_types {
    pub const BOOKING_REQUESTED: &str = "booking.requested";
    pub const BOOKING_CONFIRMED: &str = "booking.confirmed";
    pub const BOOKING_REJECTED: &str = "booking.rejected";
    pub const BOOKING_CANCELLED: &str = "booking.cancelled";
    pub const BOOKING_REFUNDED: &str = "booking.refunded";
    pub const PAYMENT_FAILED: &str = "payment.failed";
}

/// A domain event pending publication through the outbox
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    /// Unique identifier (UUID)
    pub id: Uuid,

    /// Aggregate the event belongs to (booking id)
    pub aggregate_id: Uuid,

    /// Event type, one of [`event_types`]
    pub event_type: String,

    /// When the event occurred
    pub occurred_at: DateTime<Utc>,

    /// Event payload as JSON
    pub payload: serde_json::Value,
}

impl DomainEvent {
    /// Create a new event for an aggregate
    pub fn new(aggregate_id: Uuid, event_type: &str, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            aggregate_id,
            event_type: event_type.to_string(),
            occurred_at: Utc::now(),
            payload,
        }
    }
}
