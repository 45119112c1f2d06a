//! Ports consumed by the booking engine
//!
//! Defines abstractions for persistence, the cache/lock service, and the
//! payment gateway. Adapters implement these interfaces; the engine depends
//! only on the traits.

use crate::availability::BookedSlot;
use crate::error::AppError;
use crate::models::{Booking, DomainEvent, Payment, Property};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// Property lookup port
#[async_trait]
pub trait PropertyRepository: Send + Sync {
    /// Find a published property within an organization scope
    async fn find_published(
        &self,
        property_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Property>, AppError>;
}

/// Booking persistence port
///
/// Implementations must make `create_with_payment` and `update_status`
/// atomic: either the whole {booking, payment, outbox events} group is
/// written, or none of it is. Both run at serializable isolation so the
/// overlap re-check in the create flow stays authoritative under
/// concurrent requests.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Find a booking regardless of organization (webhook path)
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, AppError>;

    /// Find a booking within an organization scope
    async fn find_scoped(
        &self,
        id: Uuid,
        organization_id: Uuid,
    ) -> Result<Option<Booking>, AppError>;

    /// Atomically insert a booking, its payment and its outbox events
    async fn create_with_payment(
        &self,
        booking: &Booking,
        payment: &Payment,
        events: &[DomainEvent],
    ) -> Result<(), AppError>;

    /// Atomically persist a status change across booking, payment and outbox
    async fn update_status(
        &self,
        booking: &Booking,
        payment: &Payment,
        events: &[DomainEvent],
    ) -> Result<(), AppError>;

    /// Pending and confirmed slots of a property overlapping a date range
    async fn find_blocking_slots(
        &self,
        property_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<Vec<BookedSlot>, AppError>;

    /// Payment attached to a booking
    async fn find_payment_by_booking(&self, booking_id: Uuid)
        -> Result<Option<Payment>, AppError>;

    /// Payment by its gateway reference (webhook path)
    async fn find_payment_by_external_ref(
        &self,
        external_ref: &str,
    ) -> Result<Option<Payment>, AppError>;
}

/// Cache/lock service port
///
/// Only atomic primitives are exposed; cross-process coordination never
/// holds a multi-round-trip mutex.
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Get value from cache
    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError>;

    /// Set value in cache with TTL
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) -> Result<(), AppError>;

    /// Atomically set a value only if the key is absent, with TTL.
    /// Returns `true` when the key was set by this call.
    async fn set_nx<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) -> Result<bool, AppError>;

    /// Delete value from cache
    async fn delete(&self, key: &str) -> Result<bool, AppError>;

    /// Check if key exists
    async fn exists(&self, key: &str) -> Result<bool, AppError>;

    /// Atomically increment a counter, returning the new value
    async fn incr(&self, key: &str) -> Result<i64, AppError>;

    /// Set expiration
    async fn expire(&self, key: &str, ttl_secs: u64) -> Result<bool, AppError>;
}

/// Metadata attached to a gateway authorization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMetadata {
    pub booking_id: Option<Uuid>,
    pub property_id: Uuid,
    pub guest_id: Uuid,
}

/// A successfully created authorization
#[derive(Debug, Clone)]
pub struct AuthorizedPayment {
    /// Gateway identifier used for capture/cancel/refund
    pub external_ref: String,

    /// Opaque handle the client uses to finish the payment flow
    pub client_handle: String,
}

/// Gateway-side status of an authorization or charge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayPaymentStatus {
    /// Authorized, waiting for a manual capture
    RequiresCapture,
    /// Gateway is still processing
    Processing,
    /// Captured and settled
    Succeeded,
    /// Authorization voided
    Canceled,
    /// Definitive failure
    Failed,
}

/// Lifecycle notification parsed from a gateway webhook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Gateway reference the notification is about
    pub external_ref: String,

    /// What happened
    pub kind: WebhookEventKind,
}

/// Webhook notification kinds the engine reconciles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEventKind {
    PaymentSucceeded,
    PaymentFailed,
    PaymentCanceled,
}

/// Payment gateway port
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create an authorization. With `manual_capture` the charge is reserved
    /// but not settled until [`PaymentGateway::capture`] is called.
    async fn authorize(
        &self,
        amount: Decimal,
        currency: &str,
        metadata: PaymentMetadata,
        manual_capture: bool,
    ) -> Result<AuthorizedPayment, AppError>;

    /// Settle an authorization awaiting capture
    async fn capture(&self, external_ref: &str) -> Result<(), AppError>;

    /// Void an uncaptured authorization
    async fn cancel(&self, external_ref: &str) -> Result<(), AppError>;

    /// Current gateway-side status of an authorization
    async fn retrieve(&self, external_ref: &str) -> Result<GatewayPaymentStatus, AppError>;

    /// Refund a captured charge
    async fn refund(&self, external_ref: &str, amount: Decimal) -> Result<(), AppError>;

    /// Verify a webhook signature and parse the typed lifecycle event
    fn parse_webhook(&self, payload: &[u8], signature: &str) -> Result<WebhookEvent, AppError>;
}
