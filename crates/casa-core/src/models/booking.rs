//! Booking aggregate
//!
//! The booking lifecycle:
//! 1. Created by a guest request (Pending), payment authorized but not captured
//! 2. Confirmed by the host (capture) or rejected
//! 3. Cancelled by guest or host while Pending/Confirmed
//! 4. Completed after the stay, refunded when the captured charge is returned
//!
//! All expected rule violations are returned as typed values; transitions
//! never mutate state when their precondition fails. State changes append a
//! domain event to an in-memory buffer that the owning use case drains
//! exactly once, right before persistence.

use crate::models::event::{event_types, DomainEvent};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Booking status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Awaiting host decision, payment authorized
    #[default]
    Pending,
    /// Host accepted, payment captured
    Confirmed,
    /// Host declined
    Rejected,
    /// Cancelled by guest or host
    Cancelled,
    /// Stay finished
    Completed,
    /// Captured payment returned to the guest
    Refunded,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "pending"),
            BookingStatus::Confirmed => write!(f, "confirmed"),
            BookingStatus::Rejected => write!(f, "rejected"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
            BookingStatus::Completed => write!(f, "completed"),
            BookingStatus::Refunded => write!(f, "refunded"),
        }
    }
}

impl BookingStatus {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "rejected" => Some(BookingStatus::Rejected),
            "cancelled" => Some(BookingStatus::Cancelled),
            "completed" => Some(BookingStatus::Completed),
            "refunded" => Some(BookingStatus::Refunded),
            _ => None,
        }
    }

    /// Statuses that never block other requests for the same dates
    pub fn is_non_blocking(&self) -> bool {
        matches!(
            self,
            BookingStatus::Cancelled | BookingStatus::Rejected | BookingStatus::Refunded
        )
    }
}

/// Expected violation of a booking creation rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BookingRuleViolation {
    #[error("check-in date is in the past")]
    CheckInInPast,

    #[error("check-out must be after check-in")]
    CheckOutBeforeCheckIn,

    #[error("guest count exceeds the property limit of {max}")]
    TooManyGuests { max: i32 },
}

/// Rejected state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("only pending bookings can be confirmed (current: {current})")]
    OnlyPendingCanBeConfirmed { current: BookingStatus },

    #[error("only pending bookings can be rejected (current: {current})")]
    OnlyPendingCanBeRejected { current: BookingStatus },

    #[error("booking is already cancelled")]
    AlreadyCancelled,

    #[error("booking cannot be cancelled (current: {current})")]
    NotCancellable { current: BookingStatus },

    #[error("only confirmed or completed bookings can be refunded (current: {current})")]
    NotRefundable { current: BookingStatus },
}

/// Validated request used to create a booking aggregate
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub property_id: Uuid,
    pub guest_id: Uuid,
    pub host_id: Uuid,
    pub organization_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i32,
    pub price_per_night: Decimal,
    pub max_guests: i32,
}

/// Booking aggregate root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    /// Unique identifier (UUID)
    pub id: Uuid,

    /// Booked property
    pub property_id: Uuid,

    /// Requesting guest
    pub guest_id: Uuid,

    /// Property host
    pub host_id: Uuid,

    /// Tenant scope
    pub organization_id: Uuid,

    /// First night of the stay
    pub check_in: NaiveDate,

    /// Day of departure (exclusive)
    pub check_out: NaiveDate,

    /// Number of guests staying
    pub guests: i32,

    /// Number of nights, derived from the date range
    pub nights: i32,

    /// Total price for the stay, rounded to cents
    pub total_price: Decimal,

    /// Current status
    pub status: BookingStatus,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Events pending outbox persistence, drained via [`Booking::pull_domain_events`]
    #[serde(skip, default)]
    events: Vec<DomainEvent>,
}

/// Persisted booking state, as loaded by a repository adapter.
///
/// Converting into [`Booking`] rehydrates the aggregate with an empty event
/// buffer; events only ever originate from transitions in the current
/// use-case invocation.
#[derive(Debug, Clone)]
pub struct BookingRecord {
    pub id: Uuid,
    pub property_id: Uuid,
    pub guest_id: Uuid,
    pub host_id: Uuid,
    pub organization_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i32,
    pub nights: i32,
    pub total_price: Decimal,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<BookingRecord> for Booking {
    fn from(record: BookingRecord) -> Self {
        Self {
            id: record.id,
            property_id: record.property_id,
            guest_id: record.guest_id,
            host_id: record.host_id,
            organization_id: record.organization_id,
            check_in: record.check_in,
            check_out: record.check_out,
            guests: record.guests,
            nights: record.nights,
            total_price: record.total_price,
            status: record.status,
            created_at: record.created_at,
            updated_at: record.updated_at,
            events: Vec::new(),
        }
    }
}

impl Booking {
    /// Validate a request and create a pending booking.
    ///
    /// `today` is the creation date in the caller's clock; check-in on the
    /// same day is allowed, earlier days are not.
    pub fn create(request: BookingRequest, today: NaiveDate) -> Result<Self, BookingRuleViolation> {
        if request.check_in < today {
            return Err(BookingRuleViolation::CheckInInPast);
        }
        if request.check_out <= request.check_in {
            return Err(BookingRuleViolation::CheckOutBeforeCheckIn);
        }
        if request.guests > request.max_guests {
            return Err(BookingRuleViolation::TooManyGuests {
                max: request.max_guests,
            });
        }

        let nights = (request.check_out - request.check_in).num_days() as i32;
        let total_price = (request.price_per_night * Decimal::from(nights))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        let now = Utc::now();
        let mut booking = Self {
            id: Uuid::new_v4(),
            property_id: request.property_id,
            guest_id: request.guest_id,
            host_id: request.host_id,
            organization_id: request.organization_id,
            check_in: request.check_in,
            check_out: request.check_out,
            guests: request.guests,
            nights,
            total_price,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
            events: Vec::new(),
        };
        booking.record(event_types::BOOKING_REQUESTED);

        Ok(booking)
    }

    /// Confirm a pending booking
    pub fn confirm(&mut self) -> Result<(), TransitionError> {
        if self.status != BookingStatus::Pending {
            return Err(TransitionError::OnlyPendingCanBeConfirmed {
                current: self.status,
            });
        }
        self.transition(BookingStatus::Confirmed, event_types::BOOKING_CONFIRMED);
        Ok(())
    }

    /// Reject a pending booking
    pub fn reject(&mut self) -> Result<(), TransitionError> {
        if self.status != BookingStatus::Pending {
            return Err(TransitionError::OnlyPendingCanBeRejected {
                current: self.status,
            });
        }
        self.transition(BookingStatus::Rejected, event_types::BOOKING_REJECTED);
        Ok(())
    }

    /// Cancel a pending or confirmed booking
    pub fn cancel(&mut self) -> Result<(), TransitionError> {
        match self.status {
            BookingStatus::Pending | BookingStatus::Confirmed => {
                self.transition(BookingStatus::Cancelled, event_types::BOOKING_CANCELLED);
                Ok(())
            }
            BookingStatus::Cancelled => Err(TransitionError::AlreadyCancelled),
            current => Err(TransitionError::NotCancellable { current }),
        }
    }

    /// Refund a confirmed or completed booking
    pub fn refund(&mut self) -> Result<(), TransitionError> {
        match self.status {
            BookingStatus::Confirmed | BookingStatus::Completed => {
                self.transition(BookingStatus::Refunded, event_types::BOOKING_REFUNDED);
                Ok(())
            }
            current => Err(TransitionError::NotRefundable { current }),
        }
    }

    /// Drain the accumulated domain events.
    ///
    /// Called once per use-case invocation, immediately before persistence;
    /// the caller owns the drained events for the rest of its transaction.
    pub fn pull_domain_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    fn transition(&mut self, status: BookingStatus, event_type: &str) {
        self.status = status;
        self.updated_at = Utc::now();
        self.record(event_type);
    }

    fn record(&mut self, event_type: &str) {
        self.events.push(DomainEvent::new(
            self.id,
            event_type,
            json!({
                "booking_id": self.id,
                "property_id": self.property_id,
                "guest_id": self.guest_id,
                "host_id": self.host_id,
                "check_in": self.check_in,
                "check_out": self.check_out,
                "total_price": self.total_price,
                "status": self.status,
            }),
        ));
    }
}
