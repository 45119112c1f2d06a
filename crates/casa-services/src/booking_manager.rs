//! Booking lifecycle use cases
//!
//! Orchestrates one request at a time through the layered guards, the
//! booking aggregate, the payment orchestrator and atomic persistence:
//! - Create: rate limit, slot lock, validate, authorize, conflict re-check,
//!   persist, hold
//! - Confirm: capture the authorization and record the commission split
//! - Reject / Cancel: void the authorization and free the slot
//! - Refund: return a captured charge
//!
//! Any failure after authorization but before persistence voids the
//! authorization (best-effort); rate-limit counters and slot locks are
//! never rolled back.

use casa_core::{
    availability::has_conflict,
    commission::compute_fee,
    models::{
        Booking, BookingRequest, BookingRuleViolation, BookingStatus, Payment, PaymentStatus,
        TransitionError,
    },
    traits::{BookingRepository, CacheService, PaymentGateway, PaymentMetadata, PropertyRepository},
    AppError, AppResult,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::guards::ConcurrencyGuard;
use crate::payments::PaymentOrchestrator;

/// A validated booking request, as handed over by the request layer
#[derive(Debug, Clone)]
pub struct CreateBookingCommand {
    pub property_id: Uuid,
    pub guest_id: Uuid,
    pub organization_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i32,
}

/// Result of a successful create: the pending booking plus the handle the
/// client needs to finish the payment flow
#[derive(Debug, Clone)]
pub struct CreatedBooking {
    pub booking: Booking,
    pub client_handle: String,
}

/// Booking use cases
pub struct BookingManager<P, B, C, G>
where
    P: PropertyRepository,
    B: BookingRepository,
    C: CacheService,
    G: PaymentGateway,
{
    properties: Arc<P>,
    bookings: Arc<B>,
    guard: Arc<ConcurrencyGuard<C>>,
    payments: Arc<PaymentOrchestrator<G, B, C>>,
    fee_percent: Decimal,
}

impl<P, B, C, G> BookingManager<P, B, C, G>
where
    P: PropertyRepository,
    B: BookingRepository,
    C: CacheService,
    G: PaymentGateway,
{
    /// Create a new booking manager
    pub fn new(
        properties: Arc<P>,
        bookings: Arc<B>,
        guard: Arc<ConcurrencyGuard<C>>,
        payments: Arc<PaymentOrchestrator<G, B, C>>,
        fee_percent: Decimal,
    ) -> Self {
        Self {
            properties,
            bookings,
            guard,
            payments,
            fee_percent,
        }
    }

    /// Request a stay: authorize the payment and persist a pending booking.
    #[instrument(skip(self, command), fields(property_id = %command.property_id, guest_id = %command.guest_id))]
    pub async fn create_booking(&self, command: CreateBookingCommand) -> AppResult<CreatedBooking> {
        // Guards first; their counters and locks are intentionally never
        // rolled back, whatever happens later in the pipeline
        self.guard.check_rate_limit(command.guest_id).await?;
        self.guard
            .acquire_slot_lock(
                command.property_id,
                command.check_in,
                command.check_out,
                command.guest_id,
            )
            .await?;

        let property = self
            .properties
            .find_published(command.property_id, command.organization_id)
            .await?
            .ok_or_else(|| AppError::PropertyNotFound(command.property_id.to_string()))?;

        let mut booking = Booking::create(
            BookingRequest {
                property_id: property.id,
                guest_id: command.guest_id,
                host_id: property.host_id,
                organization_id: command.organization_id,
                check_in: command.check_in,
                check_out: command.check_out,
                guests: command.guests,
                price_per_night: property.price_per_night,
                max_guests: property.max_guests,
            },
            Utc::now().date_naive(),
        )
        .map_err(Self::map_rule_violation)?;

        let authorized = self
            .payments
            .authorize(
                booking.total_price,
                &property.currency,
                PaymentMetadata {
                    booking_id: Some(booking.id),
                    property_id: property.id,
                    guest_id: command.guest_id,
                },
            )
            .await?;

        // Defense in depth: the slot lock only sheds identical ranges, so
        // re-check overlaps before persisting. From here on every failure
        // voids the authorization and reports the original error.
        match self
            .blocking_conflict(command.property_id, command.check_in, command.check_out)
            .await
        {
            Ok(false) => {}
            Ok(true) => {
                warn!(
                    "Dates [{}, {}) no longer available for property {}",
                    command.check_in, command.check_out, command.property_id
                );
                self.payments
                    .compensate_cancel_authorization(&authorized.external_ref)
                    .await;
                return Err(AppError::NotAvailable);
            }
            Err(e) => {
                self.payments
                    .compensate_cancel_authorization(&authorized.external_ref)
                    .await;
                return Err(e);
            }
        }

        let payment = Payment::new(
            booking.id,
            booking.total_price,
            &property.currency,
            &authorized.external_ref,
        );
        let events = booking.pull_domain_events();

        if let Err(e) = self
            .bookings
            .create_with_payment(&booking, &payment, &events)
            .await
        {
            self.payments
                .compensate_cancel_authorization(&authorized.external_ref)
                .await;
            return Err(e);
        }

        // The booking is durable; a missed hold only means this pending
        // booking stops blocking competing requests early, as if abandoned
        if let Err(e) = self.guard.place_hold(booking.id, command.guest_id).await {
            warn!("Failed to place hold for booking {}: {}", booking.id, e);
        }

        info!(
            "Booking {} created for property {} ({} nights, {})",
            booking.id, booking.property_id, booking.nights, booking.total_price
        );

        Ok(CreatedBooking {
            booking,
            client_handle: authorized.client_handle,
        })
    }

    /// Host accepts a pending booking: capture the authorization and record
    /// the commission split atomically with the status change.
    #[instrument(skip(self))]
    pub async fn confirm_booking(
        &self,
        booking_id: Uuid,
        host_id: Uuid,
        organization_id: Uuid,
    ) -> AppResult<Booking> {
        let mut booking = self.load_scoped(booking_id, organization_id).await?;
        if booking.host_id != host_id {
            return Err(AppError::Forbidden(
                "only the host can confirm a booking".to_string(),
            ));
        }

        let mut payment = self.load_payment(booking_id).await?;

        // Both preconditions must hold before the gateway sees a capture:
        // a double confirm dies here, on the aggregate, not at the gateway
        booking.confirm().map_err(Self::map_transition)?;
        self.payments
            .ensure_awaiting_capture(&payment.external_ref)
            .await?;

        let split = compute_fee(payment.amount, self.fee_percent);
        self.payments.capture(&payment.external_ref).await?;

        payment.mark_completed(split, Utc::now());
        let events = booking.pull_domain_events();
        self.bookings
            .update_status(&booking, &payment, &events)
            .await?;

        self.release_hold_best_effort(booking.id).await;

        info!("Booking {} confirmed by host {}", booking.id, host_id);
        Ok(booking)
    }

    /// Host declines a pending booking
    #[instrument(skip(self))]
    pub async fn reject_booking(
        &self,
        booking_id: Uuid,
        host_id: Uuid,
        organization_id: Uuid,
    ) -> AppResult<Booking> {
        let mut booking = self.load_scoped(booking_id, organization_id).await?;
        if booking.host_id != host_id {
            return Err(AppError::Forbidden(
                "only the host can reject a booking".to_string(),
            ));
        }

        let mut payment = self.load_payment(booking_id).await?;

        booking.reject().map_err(Self::map_transition)?;

        if payment.status == PaymentStatus::Pending {
            self.payments
                .cancel_authorization(&payment.external_ref)
                .await;
            payment.mark_cancelled(Utc::now());
        }

        let events = booking.pull_domain_events();
        self.bookings
            .update_status(&booking, &payment, &events)
            .await?;

        self.release_hold_best_effort(booking.id).await;

        info!("Booking {} rejected by host {}", booking.id, host_id);
        Ok(booking)
    }

    /// Guest or host cancels a pending or confirmed booking
    #[instrument(skip(self))]
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        actor_id: Uuid,
        organization_id: Uuid,
    ) -> AppResult<Booking> {
        let mut booking = self.load_scoped(booking_id, organization_id).await?;
        if actor_id != booking.guest_id && actor_id != booking.host_id {
            return Err(AppError::Forbidden(
                "only the guest or the host can cancel a booking".to_string(),
            ));
        }

        let mut payment = self.load_payment(booking_id).await?;

        booking.cancel().map_err(Self::map_transition)?;

        // Only an uncaptured authorization is voided; a captured charge
        // stays settled and is returned through the refund flow
        if payment.status == PaymentStatus::Pending {
            self.payments
                .cancel_authorization(&payment.external_ref)
                .await;
            payment.mark_cancelled(Utc::now());
        }

        let events = booking.pull_domain_events();
        self.bookings
            .update_status(&booking, &payment, &events)
            .await?;

        self.release_hold_best_effort(booking.id).await;

        info!("Booking {} cancelled by {}", booking.id, actor_id);
        Ok(booking)
    }

    /// Host returns a captured charge for a confirmed or completed booking
    #[instrument(skip(self))]
    pub async fn refund_booking(
        &self,
        booking_id: Uuid,
        host_id: Uuid,
        organization_id: Uuid,
    ) -> AppResult<Booking> {
        let mut booking = self.load_scoped(booking_id, organization_id).await?;
        if booking.host_id != host_id {
            return Err(AppError::Forbidden(
                "only the host can refund a booking".to_string(),
            ));
        }

        let mut payment = self.load_payment(booking_id).await?;
        if payment.status != PaymentStatus::Completed {
            return Err(AppError::IllegalTransition(format!(
                "only completed payments can be refunded (current: {})",
                payment.status
            )));
        }

        booking.refund().map_err(Self::map_transition)?;

        self.payments
            .refund(&payment.external_ref, payment.amount)
            .await?;
        payment.mark_refunded(Utc::now());

        let events = booking.pull_domain_events();
        self.bookings
            .update_status(&booking, &payment, &events)
            .await?;

        info!("Booking {} refunded", booking.id);
        Ok(booking)
    }

    /// Verify and reconcile a raw gateway webhook
    pub async fn handle_payment_webhook(&self, payload: &[u8], signature: &str) -> AppResult<()> {
        let event = self.payments.parse_webhook(payload, signature)?;
        self.payments.reconcile_webhook(event).await
    }

    /// Conflict check over confirmed and held-pending slots.
    ///
    /// A pending booking whose hold expired is an abandoned checkout and
    /// does not block.
    async fn blocking_conflict(
        &self,
        property_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> AppResult<bool> {
        let slots = self
            .bookings
            .find_blocking_slots(property_id, check_in, check_out)
            .await?;

        let mut blocking = Vec::with_capacity(slots.len());
        for slot in slots {
            match slot.status {
                BookingStatus::Confirmed => blocking.push(slot),
                BookingStatus::Pending => {
                    if self.guard.hold_exists(slot.booking_id).await? {
                        blocking.push(slot);
                    }
                }
                _ => {}
            }
        }

        Ok(has_conflict(check_in, check_out, &blocking))
    }

    async fn load_scoped(&self, booking_id: Uuid, organization_id: Uuid) -> AppResult<Booking> {
        self.bookings
            .find_scoped(booking_id, organization_id)
            .await?
            .ok_or_else(|| AppError::BookingNotFound(booking_id.to_string()))
    }

    async fn load_payment(&self, booking_id: Uuid) -> AppResult<Payment> {
        self.bookings
            .find_payment_by_booking(booking_id)
            .await?
            .ok_or_else(|| AppError::PaymentNotFound(booking_id.to_string()))
    }

    async fn release_hold_best_effort(&self, booking_id: Uuid) {
        if let Err(e) = self.guard.release_hold(booking_id).await {
            warn!("Failed to release hold for booking {}: {}", booking_id, e);
        }
    }

    fn map_rule_violation(violation: BookingRuleViolation) -> AppError {
        match violation {
            BookingRuleViolation::CheckInInPast | BookingRuleViolation::CheckOutBeforeCheckIn => {
                AppError::InvalidDates(violation.to_string())
            }
            BookingRuleViolation::TooManyGuests { max } => AppError::TooManyGuests { max },
        }
    }

    fn map_transition(error: TransitionError) -> AppError {
        AppError::IllegalTransition(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        property, MockBookingRepository, MockCache, MockGateway, MockPropertyRepository,
    };
    use casa_core::models::Property;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    type Manager =
        BookingManager<MockPropertyRepository, MockBookingRepository, MockCache, MockGateway>;

    struct Harness {
        property: Property,
        gateway: Arc<MockGateway>,
        bookings: Arc<MockBookingRepository>,
        guard: Arc<ConcurrencyGuard<MockCache>>,
        manager: Manager,
    }

    fn harness() -> Harness {
        let property = property();
        let gateway = Arc::new(MockGateway::new());
        let bookings = Arc::new(MockBookingRepository::new());
        let guard = Arc::new(ConcurrencyGuard::new(Arc::new(MockCache::new())));
        let payments = Arc::new(PaymentOrchestrator::new(
            Arc::clone(&gateway),
            Arc::clone(&bookings),
            Arc::clone(&guard),
            dec!(10),
        ));
        let manager = BookingManager::new(
            Arc::new(MockPropertyRepository::new(property.clone())),
            Arc::clone(&bookings),
            Arc::clone(&guard),
            payments,
            dec!(10),
        );
        Harness {
            property,
            gateway,
            bookings,
            guard,
            manager,
        }
    }

    fn in_days(days: i64) -> NaiveDate {
        Utc::now().date_naive() + Duration::days(days)
    }

    fn command(h: &Harness, check_in: NaiveDate, check_out: NaiveDate) -> CreateBookingCommand {
        CreateBookingCommand {
            property_id: h.property.id,
            guest_id: Uuid::new_v4(),
            organization_id: h.property.organization_id,
            check_in,
            check_out,
            guests: 2,
        }
    }

    #[tokio::test]
    async fn test_create_booking_end_to_end() {
        let h = harness();

        let created = h
            .manager
            .create_booking(command(&h, in_days(10), in_days(12)))
            .await
            .unwrap();

        assert_eq!(created.booking.status, BookingStatus::Pending);
        assert_eq!(created.booking.nights, 2);
        assert_eq!(created.booking.total_price, dec!(200.00));
        assert_eq!(created.client_handle, "handle_1");

        // Booking, payment and outbox event are all persisted
        let stored = h.bookings.stored_booking(created.booking.id).unwrap();
        assert_eq!(stored.status, BookingStatus::Pending);
        let payment = h.bookings.stored_payment(created.booking.id).unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.amount, dec!(200.00));
        assert_eq!(payment.external_ref, "auth_1");
        assert_eq!(h.bookings.event_types(), vec!["booking.requested"]);

        // The hold now blocks the slot
        assert!(h.guard.hold_exists(created.booking.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_booking_rejects_unknown_property() {
        let h = harness();
        let mut cmd = command(&h, in_days(10), in_days(12));
        cmd.property_id = Uuid::new_v4();

        let err = h.manager.create_booking(cmd).await.unwrap_err();
        assert!(matches!(err, AppError::PropertyNotFound(_)));
        // The failed attempt did not reach the gateway
        assert!(h.gateway.authorize_calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_create_booking_rejects_bad_dates() {
        let h = harness();

        let err = h
            .manager
            .create_booking(command(&h, in_days(12), in_days(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidDates(_)));

        let err = h
            .manager
            .create_booking(command(&h, in_days(-2), in_days(3)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidDates(_)));
    }

    #[tokio::test]
    async fn test_create_booking_rejects_too_many_guests() {
        let h = harness();
        let mut cmd = command(&h, in_days(10), in_days(12));
        cmd.guests = 5;

        let err = h.manager.create_booking(cmd).await.unwrap_err();
        assert!(matches!(err, AppError::TooManyGuests { max: 4 }));
    }

    #[tokio::test]
    async fn test_eleventh_request_is_rate_limited() {
        let h = harness();
        let guest_id = Uuid::new_v4();

        // Ten requests with distinct ranges pass the limiter
        for i in 0..10 {
            let mut cmd = command(&h, in_days(10 + 2 * i), in_days(11 + 2 * i));
            cmd.guest_id = guest_id;
            h.manager.create_booking(cmd).await.unwrap();
        }

        let mut cmd = command(&h, in_days(40), in_days(41));
        cmd.guest_id = guest_id;
        let err = h.manager.create_booking(cmd).await.unwrap_err();
        assert!(matches!(err, AppError::RateLimited { max: 10 }));
    }

    #[tokio::test]
    async fn test_identical_range_is_slot_locked() {
        let h = harness();

        h.manager
            .create_booking(command(&h, in_days(10), in_days(12)))
            .await
            .unwrap();

        let err = h
            .manager
            .create_booking(command(&h, in_days(10), in_days(12)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::SlotLocked));
        // The second request never authorized a payment
        assert_eq!(h.gateway.authorize_calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_conflict_compensates_authorization() {
        let h = harness();

        // First guest books and holds [10, 14)
        let first = h
            .manager
            .create_booking(command(&h, in_days(10), in_days(14)))
            .await
            .unwrap();

        // Second guest wants [12, 16): different lock key, same nights
        let err = h
            .manager
            .create_booking(command(&h, in_days(12), in_days(16)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotAvailable));

        // The second authorization was voided, the first left alone
        assert_eq!(h.gateway.authorize_calls.lock().len(), 2);
        assert_eq!(*h.gateway.cancel_calls.lock(), vec!["auth_2".to_string()]);

        // No second booking was persisted
        assert_eq!(h.bookings.bookings.lock().len(), 1);
        assert!(h.bookings.stored_booking(first.booking.id).is_some());
    }

    #[tokio::test]
    async fn test_abandoned_pending_booking_does_not_block() {
        let h = harness();

        let first = h
            .manager
            .create_booking(command(&h, in_days(10), in_days(14)))
            .await
            .unwrap();
        // The guest walks away and the hold expires
        h.guard.release_hold(first.booking.id).await.unwrap();

        let second = h
            .manager
            .create_booking(command(&h, in_days(12), in_days(16)))
            .await
            .unwrap();
        assert_eq!(second.booking.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn test_confirmed_booking_blocks_even_without_hold() {
        let h = harness();

        let first = h
            .manager
            .create_booking(command(&h, in_days(10), in_days(14)))
            .await
            .unwrap();
        h.manager
            .confirm_booking(
                first.booking.id,
                h.property.host_id,
                h.property.organization_id,
            )
            .await
            .unwrap();

        // Confirm released the hold, the booking still blocks
        let err = h
            .manager
            .create_booking(command(&h, in_days(12), in_days(16)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotAvailable));
    }

    #[tokio::test]
    async fn test_confirm_booking_captures_and_splits() {
        let h = harness();

        let created = h
            .manager
            .create_booking(command(&h, in_days(10), in_days(12)))
            .await
            .unwrap();

        let confirmed = h
            .manager
            .confirm_booking(
                created.booking.id,
                h.property.host_id,
                h.property.organization_id,
            )
            .await
            .unwrap();

        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        assert_eq!(*h.gateway.capture_calls.lock(), vec!["auth_1".to_string()]);

        let payment = h.bookings.stored_payment(created.booking.id).unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.platform_fee_amount, Some(dec!(20.00)));
        assert_eq!(payment.host_net_amount, Some(dec!(180.00)));
        assert!(payment.paid_at.is_some());

        // Hold removed, confirmation event in the outbox
        assert!(!h.guard.hold_exists(created.booking.id).await.unwrap());
        assert_eq!(
            h.bookings.event_types(),
            vec!["booking.requested", "booking.confirmed"]
        );
    }

    #[tokio::test]
    async fn test_double_confirm_never_captures_twice() {
        let h = harness();

        let created = h
            .manager
            .create_booking(command(&h, in_days(10), in_days(12)))
            .await
            .unwrap();

        h.manager
            .confirm_booking(
                created.booking.id,
                h.property.host_id,
                h.property.organization_id,
            )
            .await
            .unwrap();

        let err = h
            .manager
            .confirm_booking(
                created.booking.id,
                h.property.host_id,
                h.property.organization_id,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::IllegalTransition(_)));
        assert_eq!(h.gateway.capture_calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_confirm_requires_host() {
        let h = harness();

        let created = h
            .manager
            .create_booking(command(&h, in_days(10), in_days(12)))
            .await
            .unwrap();

        let err = h
            .manager
            .confirm_booking(
                created.booking.id,
                Uuid::new_v4(),
                h.property.organization_id,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(h.gateway.capture_calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_confirm_requires_capturable_payment() {
        let h = harness();

        let created = h
            .manager
            .create_booking(command(&h, in_days(10), in_days(12)))
            .await
            .unwrap();

        h.gateway
            .set_status(casa_core::traits::GatewayPaymentStatus::Processing);

        let err = h
            .manager
            .confirm_booking(
                created.booking.id,
                h.property.host_id,
                h.property.organization_id,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PaymentNotCapturable(_)));

        // No capture happened and no state was persisted
        assert!(h.gateway.capture_calls.lock().is_empty());
        assert_eq!(
            h.bookings.stored_booking(created.booking.id).unwrap().status,
            BookingStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_confirm_outside_organization_is_not_found() {
        let h = harness();

        let created = h
            .manager
            .create_booking(command(&h, in_days(10), in_days(12)))
            .await
            .unwrap();

        let err = h
            .manager
            .confirm_booking(created.booking.id, h.property.host_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BookingNotFound(_)));
    }

    #[tokio::test]
    async fn test_reject_voids_authorization() {
        let h = harness();

        let created = h
            .manager
            .create_booking(command(&h, in_days(10), in_days(12)))
            .await
            .unwrap();

        let rejected = h
            .manager
            .reject_booking(
                created.booking.id,
                h.property.host_id,
                h.property.organization_id,
            )
            .await
            .unwrap();

        assert_eq!(rejected.status, BookingStatus::Rejected);
        assert_eq!(*h.gateway.cancel_calls.lock(), vec!["auth_1".to_string()]);
        assert_eq!(
            h.bookings.stored_payment(created.booking.id).unwrap().status,
            PaymentStatus::Cancelled
        );
        assert!(!h.guard.hold_exists(created.booking.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_cancel_by_guest_and_by_stranger() {
        let h = harness();

        let created = h
            .manager
            .create_booking(command(&h, in_days(10), in_days(12)))
            .await
            .unwrap();

        let err = h
            .manager
            .cancel_booking(
                created.booking.id,
                Uuid::new_v4(),
                h.property.organization_id,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let cancelled = h
            .manager
            .cancel_booking(
                created.booking.id,
                created.booking.guest_id,
                h.property.organization_id,
            )
            .await
            .unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert!(!h.guard.hold_exists(created.booking.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_cancel_confirmed_booking_keeps_captured_payment() {
        let h = harness();

        let created = h
            .manager
            .create_booking(command(&h, in_days(10), in_days(12)))
            .await
            .unwrap();
        h.manager
            .confirm_booking(
                created.booking.id,
                h.property.host_id,
                h.property.organization_id,
            )
            .await
            .unwrap();

        let cancelled = h
            .manager
            .cancel_booking(
                created.booking.id,
                h.property.host_id,
                h.property.organization_id,
            )
            .await
            .unwrap();

        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        // The captured charge is untouched; no void was attempted
        assert!(h.gateway.cancel_calls.lock().is_empty());
        assert_eq!(
            h.bookings.stored_payment(created.booking.id).unwrap().status,
            PaymentStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_refund_confirmed_booking() {
        let h = harness();

        let created = h
            .manager
            .create_booking(command(&h, in_days(10), in_days(12)))
            .await
            .unwrap();
        h.manager
            .confirm_booking(
                created.booking.id,
                h.property.host_id,
                h.property.organization_id,
            )
            .await
            .unwrap();

        let refunded = h
            .manager
            .refund_booking(
                created.booking.id,
                h.property.host_id,
                h.property.organization_id,
            )
            .await
            .unwrap();

        assert_eq!(refunded.status, BookingStatus::Refunded);
        assert_eq!(
            *h.gateway.refund_calls.lock(),
            vec![("auth_1".to_string(), dec!(200.00))]
        );
        assert_eq!(
            h.bookings.stored_payment(created.booking.id).unwrap().status,
            PaymentStatus::Refunded
        );
    }

    #[tokio::test]
    async fn test_refund_requires_completed_payment() {
        let h = harness();

        let created = h
            .manager
            .create_booking(command(&h, in_days(10), in_days(12)))
            .await
            .unwrap();

        let err = h
            .manager
            .refund_booking(
                created.booking.id,
                h.property.host_id,
                h.property.organization_id,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::IllegalTransition(_)));
        assert!(h.gateway.refund_calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_webhook_roundtrip_through_manager() {
        let h = harness();

        let created = h
            .manager
            .create_booking(command(&h, in_days(10), in_days(12)))
            .await
            .unwrap();

        let payload = serde_json::json!({
            "external_ref": "auth_1",
            "kind": "payment_succeeded",
        })
        .to_string();

        // Bad signature is rejected before any state change
        let err = h
            .manager
            .handle_payment_webhook(payload.as_bytes(), "forged")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::WebhookSignature));

        h.manager
            .handle_payment_webhook(payload.as_bytes(), "valid")
            .await
            .unwrap();

        assert_eq!(
            h.bookings.stored_booking(created.booking.id).unwrap().status,
            BookingStatus::Confirmed
        );
        assert_eq!(
            h.bookings.stored_payment(created.booking.id).unwrap().platform_fee_amount,
            Some(dec!(20.00))
        );
    }
}
