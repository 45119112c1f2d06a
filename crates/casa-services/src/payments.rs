//! Payment orchestration
//!
//! Wraps the payment-gateway port for the two-phase charge: authorize when
//! the guest requests, capture when the host confirms. Compensating
//! cancellations are best-effort and never shadow the failure that
//! triggered them. Webhook reconciliation absorbs out-of-order gateway
//! notifications without duplicating side effects: the recorded commission
//! split is the idempotency token.

use casa_core::{
    commission::compute_fee,
    models::{event_types, BookingStatus, DomainEvent, PaymentStatus},
    traits::{
        AuthorizedPayment, BookingRepository, CacheService, GatewayPaymentStatus, PaymentGateway,
        PaymentMetadata, WebhookEvent, WebhookEventKind,
    },
    AppError, AppResult,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::guards::ConcurrencyGuard;

/// Orchestrates gateway calls and webhook reconciliation
pub struct PaymentOrchestrator<G, B, C>
where
    G: PaymentGateway,
    B: BookingRepository,
    C: CacheService,
{
    gateway: Arc<G>,
    bookings: Arc<B>,
    guard: Arc<ConcurrencyGuard<C>>,
    fee_percent: Decimal,
}

impl<G, B, C> PaymentOrchestrator<G, B, C>
where
    G: PaymentGateway,
    B: BookingRepository,
    C: CacheService,
{
    /// Create a new payment orchestrator
    pub fn new(
        gateway: Arc<G>,
        bookings: Arc<B>,
        guard: Arc<ConcurrencyGuard<C>>,
        fee_percent: Decimal,
    ) -> Self {
        Self {
            gateway,
            bookings,
            guard,
            fee_percent,
        }
    }

    /// Create a manual-capture authorization.
    ///
    /// Runs before the booking row exists: the authorization is the scarcer
    /// external resource, its failure must abort before the store is touched.
    #[instrument(skip(self, metadata))]
    pub async fn authorize(
        &self,
        amount: Decimal,
        currency: &str,
        metadata: PaymentMetadata,
    ) -> AppResult<AuthorizedPayment> {
        info!("Authorizing {} {}", amount, currency);
        self.gateway
            .authorize(amount, currency, metadata, true)
            .await
    }

    /// Void an authorization left over from a use case that failed before
    /// persistence. Errors are logged and swallowed so the original failure
    /// stays what the caller sees.
    #[instrument(skip(self))]
    pub async fn compensate_cancel_authorization(&self, external_ref: &str) {
        if let Err(e) = self.gateway.cancel(external_ref).await {
            warn!(
                "Compensating cancellation of authorization {} failed: {}",
                external_ref, e
            );
        }
    }

    /// Require the authorization to be awaiting capture
    #[instrument(skip(self))]
    pub async fn ensure_awaiting_capture(&self, external_ref: &str) -> AppResult<()> {
        let status = self.gateway.retrieve(external_ref).await?;
        if status != GatewayPaymentStatus::RequiresCapture {
            return Err(AppError::PaymentNotCapturable(format!(
                "gateway reports {:?}",
                status
            )));
        }
        Ok(())
    }

    /// Settle an authorization awaiting capture
    #[instrument(skip(self))]
    pub async fn capture(&self, external_ref: &str) -> AppResult<()> {
        info!("Capturing authorization {}", external_ref);
        self.gateway.capture(external_ref).await
    }

    /// Void an uncaptured authorization on reject/cancel.
    ///
    /// A no-op when the gateway already settled or voided the reference;
    /// those errors are swallowed.
    #[instrument(skip(self))]
    pub async fn cancel_authorization(&self, external_ref: &str) {
        if let Err(e) = self.gateway.cancel(external_ref).await {
            warn!(
                "Cancellation of authorization {} failed, assuming already settled or voided: {}",
                external_ref, e
            );
        }
    }

    /// Refund a captured charge
    #[instrument(skip(self))]
    pub async fn refund(&self, external_ref: &str, amount: Decimal) -> AppResult<()> {
        info!("Refunding {} on {}", amount, external_ref);
        self.gateway.refund(external_ref, amount).await
    }

    /// Verify a raw webhook and parse the typed lifecycle event
    pub fn parse_webhook(&self, payload: &[u8], signature: &str) -> AppResult<WebhookEvent> {
        self.gateway.parse_webhook(payload, signature)
    }

    /// Reconcile an asynchronous gateway notification with local state.
    ///
    /// The gateway may deliver notifications out of order relative to the
    /// synchronous confirm call. The rules:
    /// - payment already completed: ignore the duplicate
    /// - commission already split: only synchronize the booking status and
    ///   drop the hold, never recompute the fee
    /// - otherwise: compute the fee once and transition payment and booking
    ///   together
    #[instrument(skip(self, event))]
    pub async fn reconcile_webhook(&self, event: WebhookEvent) -> AppResult<()> {
        let Some(mut payment) = self
            .bookings
            .find_payment_by_external_ref(&event.external_ref)
            .await?
        else {
            // The authorization may have been voided before its booking was
            // ever persisted (compensated create)
            warn!(
                "Webhook for unknown payment ref {}, ignoring",
                event.external_ref
            );
            return Ok(());
        };

        let mut booking = self
            .bookings
            .find_by_id(payment.booking_id)
            .await?
            .ok_or_else(|| AppError::BookingNotFound(payment.booking_id.to_string()))?;

        let now = Utc::now();

        match event.kind {
            WebhookEventKind::PaymentSucceeded => {
                if payment.status == PaymentStatus::Completed {
                    debug!(
                        "Payment {} already completed, ignoring duplicate notification",
                        payment.id
                    );
                    return Ok(());
                }

                if payment.fee_already_split() {
                    debug!(
                        "Commission for payment {} already split, synchronizing status only",
                        payment.id
                    );
                    payment.mark_settled(now);
                } else {
                    let split = compute_fee(payment.amount, self.fee_percent);
                    payment.mark_completed(split, now);
                }

                match booking.status {
                    BookingStatus::Pending => {
                        // Cannot fail from Pending
                        if let Err(e) = booking.confirm() {
                            return Err(AppError::Internal(format!(
                                "webhook confirm rejected: {}",
                                e
                            )));
                        }
                    }
                    BookingStatus::Confirmed => {}
                    other => {
                        warn!(
                            "Payment {} succeeded but booking {} is {}, leaving booking untouched",
                            payment.id, booking.id, other
                        );
                    }
                }

                let events = booking.pull_domain_events();
                self.bookings
                    .update_status(&booking, &payment, &events)
                    .await?;
                self.release_hold_best_effort(booking.id).await;
            }

            WebhookEventKind::PaymentFailed => {
                if payment.status != PaymentStatus::Pending {
                    debug!(
                        "Payment {} is {}, ignoring failure notification",
                        payment.id, payment.status
                    );
                    return Ok(());
                }

                payment.mark_failed(now);
                // The booking stays pending; releasing the hold is what
                // unblocks the slot for other guests
                let events = vec![DomainEvent::new(
                    booking.id,
                    event_types::PAYMENT_FAILED,
                    json!({
                        "booking_id": booking.id,
                        "payment_id": payment.id,
                        "external_ref": payment.external_ref,
                    }),
                )];
                self.bookings
                    .update_status(&booking, &payment, &events)
                    .await?;
                self.release_hold_best_effort(booking.id).await;
            }

            WebhookEventKind::PaymentCanceled => {
                if payment.status != PaymentStatus::Pending {
                    debug!(
                        "Payment {} is {}, ignoring cancellation notification",
                        payment.id, payment.status
                    );
                    return Ok(());
                }

                payment.mark_cancelled(now);
                self.bookings.update_status(&booking, &payment, &[]).await?;
                self.release_hold_best_effort(booking.id).await;
            }
        }

        Ok(())
    }

    async fn release_hold_best_effort(&self, booking_id: uuid::Uuid) {
        if let Err(e) = self.guard.release_hold(booking_id).await {
            warn!("Failed to release hold for booking {}: {}", booking_id, e);
        }
    }
}
