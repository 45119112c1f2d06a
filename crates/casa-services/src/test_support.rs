//! Hand-written port mocks shared by the service tests

use async_trait::async_trait;
use casa_core::{
    availability::BookedSlot,
    models::{Booking, DomainEvent, Payment, Property},
    traits::{
        AuthorizedPayment, BookingRepository, CacheService, GatewayPaymentStatus, PaymentGateway,
        PaymentMetadata, PropertyRepository, WebhookEvent,
    },
    AppError, AppResult,
};
use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// In-memory cache honoring the atomic primitives (TTLs are ignored)
#[derive(Default)]
pub struct MockCache {
    entries: Mutex<HashMap<String, String>>,
    counters: Mutex<HashMap<String, i64>>,
    expire_calls: Mutex<Vec<String>>,
}

impl MockCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `expire` was called for a key
    pub fn expire_calls(&self, key: &str) -> usize {
        self.expire_calls
            .lock()
            .iter()
            .filter(|k| k.as_str() == key)
            .count()
    }
}

#[async_trait]
impl CacheService for MockCache {
    async fn get<T: DeserializeOwned>(&self, key: &str) -> AppResult<Option<T>> {
        match self.entries.lock().get(key) {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        _ttl_secs: u64,
    ) -> AppResult<()> {
        self.entries
            .lock()
            .insert(key.to_string(), serde_json::to_string(value)?);
        Ok(())
    }

    async fn set_nx<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        _ttl_secs: u64,
    ) -> AppResult<bool> {
        let mut entries = self.entries.lock();
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_string(), serde_json::to_string(value)?);
        Ok(true)
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        Ok(self.entries.lock().remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.entries.lock().contains_key(key))
    }

    async fn incr(&self, key: &str) -> AppResult<i64> {
        let mut counters = self.counters.lock();
        let count = counters.entry(key.to_string()).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    async fn expire(&self, key: &str, _ttl_secs: u64) -> AppResult<bool> {
        self.expire_calls.lock().push(key.to_string());
        Ok(true)
    }
}

/// Gateway mock recording every call
pub struct MockGateway {
    pub authorize_calls: Mutex<Vec<Decimal>>,
    pub capture_calls: Mutex<Vec<String>>,
    pub cancel_calls: Mutex<Vec<String>>,
    pub refund_calls: Mutex<Vec<(String, Decimal)>>,
    pub retrieve_status: Mutex<GatewayPaymentStatus>,
    pub fail_cancel: bool,
    pub next_ref: Mutex<u32>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            authorize_calls: Mutex::new(Vec::new()),
            capture_calls: Mutex::new(Vec::new()),
            cancel_calls: Mutex::new(Vec::new()),
            refund_calls: Mutex::new(Vec::new()),
            retrieve_status: Mutex::new(GatewayPaymentStatus::RequiresCapture),
            fail_cancel: false,
            next_ref: Mutex::new(0),
        }
    }

    pub fn set_status(&self, status: GatewayPaymentStatus) {
        *self.retrieve_status.lock() = status;
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn authorize(
        &self,
        amount: Decimal,
        _currency: &str,
        _metadata: PaymentMetadata,
        _manual_capture: bool,
    ) -> AppResult<AuthorizedPayment> {
        self.authorize_calls.lock().push(amount);
        let mut next = self.next_ref.lock();
        *next += 1;
        Ok(AuthorizedPayment {
            external_ref: format!("auth_{}", *next),
            client_handle: format!("handle_{}", *next),
        })
    }

    async fn capture(&self, external_ref: &str) -> AppResult<()> {
        self.capture_calls.lock().push(external_ref.to_string());
        Ok(())
    }

    async fn cancel(&self, external_ref: &str) -> AppResult<()> {
        if self.fail_cancel {
            return Err(AppError::Gateway("cancel rejected".to_string()));
        }
        self.cancel_calls.lock().push(external_ref.to_string());
        Ok(())
    }

    async fn retrieve(&self, _external_ref: &str) -> AppResult<GatewayPaymentStatus> {
        Ok(*self.retrieve_status.lock())
    }

    async fn refund(&self, external_ref: &str, amount: Decimal) -> AppResult<()> {
        self.refund_calls
            .lock()
            .push((external_ref.to_string(), amount));
        Ok(())
    }

    fn parse_webhook(&self, payload: &[u8], signature: &str) -> AppResult<WebhookEvent> {
        if signature != "valid" {
            return Err(AppError::WebhookSignature);
        }
        serde_json::from_slice(payload).map_err(Into::into)
    }
}

/// In-memory booking store mirroring the repository contract
#[derive(Default)]
pub struct MockBookingRepository {
    pub bookings: Mutex<HashMap<Uuid, Booking>>,
    pub payments: Mutex<HashMap<Uuid, Payment>>,
    pub events: Mutex<Vec<DomainEvent>>,
}

impl MockBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a booking (and optionally its payment) directly into the store
    pub fn seed(&self, booking: Booking, payment: Option<Payment>) {
        if let Some(payment) = payment {
            self.payments.lock().insert(booking.id, payment);
        }
        self.bookings.lock().insert(booking.id, booking);
    }

    pub fn stored_booking(&self, id: Uuid) -> Option<Booking> {
        self.bookings.lock().get(&id).cloned()
    }

    pub fn stored_payment(&self, booking_id: Uuid) -> Option<Payment> {
        self.payments.lock().get(&booking_id).cloned()
    }

    pub fn event_types(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|e| e.event_type.clone())
            .collect()
    }
}

#[async_trait]
impl BookingRepository for MockBookingRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Booking>> {
        Ok(self.bookings.lock().get(&id).cloned())
    }

    async fn find_scoped(&self, id: Uuid, organization_id: Uuid) -> AppResult<Option<Booking>> {
        Ok(self
            .bookings
            .lock()
            .get(&id)
            .filter(|b| b.organization_id == organization_id)
            .cloned())
    }

    async fn create_with_payment(
        &self,
        booking: &Booking,
        payment: &Payment,
        events: &[DomainEvent],
    ) -> AppResult<()> {
        self.bookings.lock().insert(booking.id, booking.clone());
        self.payments.lock().insert(booking.id, payment.clone());
        self.events.lock().extend_from_slice(events);
        Ok(())
    }

    async fn update_status(
        &self,
        booking: &Booking,
        payment: &Payment,
        events: &[DomainEvent],
    ) -> AppResult<()> {
        self.bookings.lock().insert(booking.id, booking.clone());
        self.payments.lock().insert(booking.id, payment.clone());
        self.events.lock().extend_from_slice(events);
        Ok(())
    }

    async fn find_blocking_slots(
        &self,
        property_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> AppResult<Vec<BookedSlot>> {
        Ok(self
            .bookings
            .lock()
            .values()
            .filter(|b| {
                b.property_id == property_id
                    && !b.status.is_non_blocking()
                    && b.check_in < check_out
                    && b.check_out > check_in
            })
            .map(|b| BookedSlot {
                booking_id: b.id,
                check_in: b.check_in,
                check_out: b.check_out,
                status: b.status,
            })
            .collect())
    }

    async fn find_payment_by_booking(&self, booking_id: Uuid) -> AppResult<Option<Payment>> {
        Ok(self.payments.lock().get(&booking_id).cloned())
    }

    async fn find_payment_by_external_ref(&self, external_ref: &str) -> AppResult<Option<Payment>> {
        Ok(self
            .payments
            .lock()
            .values()
            .find(|p| p.external_ref == external_ref)
            .cloned())
    }
}

/// Single-property repository
pub struct MockPropertyRepository {
    pub property: Property,
}

impl MockPropertyRepository {
    pub fn new(property: Property) -> Self {
        Self { property }
    }
}

#[async_trait]
impl PropertyRepository for MockPropertyRepository {
    async fn find_published(
        &self,
        property_id: Uuid,
        organization_id: Uuid,
    ) -> AppResult<Option<Property>> {
        if self.property.id == property_id
            && self.property.organization_id == organization_id
            && self.property.published
        {
            Ok(Some(self.property.clone()))
        } else {
            Ok(None)
        }
    }
}

/// A published $100/night property for four guests
pub fn property() -> Property {
    let now = Utc::now();
    Property {
        id: Uuid::new_v4(),
        host_id: Uuid::new_v4(),
        organization_id: Uuid::new_v4(),
        price_per_night: dec!(100.00),
        currency: "USD".to_string(),
        max_guests: 4,
        published: true,
        created_at: now,
        updated_at: now,
    }
}
