//! Distributed concurrency guards
//!
//! Three independent guards backed by the shared cache/lock service:
//!
//! - a per-guest rate limiter over a rolling window
//! - a slot lock shedding identical-range booking races cheaply
//! - the hold marker that keeps a pending booking blocking while its
//!   payment attempt is in flight
//!
//! All three use single atomic cache primitives; none of them is the
//! correctness backstop. The serializable transaction at persistence time
//! is what ultimately prevents double-booking.

use casa_cache::keys;
use casa_core::{traits::CacheService, AppError, AppResult};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::constants::{
    HOLD_TTL_SECS, RATE_LIMIT_MAX_REQUESTS, RATE_LIMIT_WINDOW_SECS, SLOT_LOCK_TTL_SECS,
};

/// Concurrency guard over the shared cache/lock service
pub struct ConcurrencyGuard<C: CacheService> {
    cache: Arc<C>,
    max_requests: i64,
    window_secs: u64,
    lock_ttl_secs: u64,
    hold_ttl_secs: u64,
}

impl<C: CacheService> ConcurrencyGuard<C> {
    /// Create a guard with the default limits
    pub fn new(cache: Arc<C>) -> Self {
        Self::with_limits(
            cache,
            RATE_LIMIT_MAX_REQUESTS,
            RATE_LIMIT_WINDOW_SECS,
            SLOT_LOCK_TTL_SECS,
            HOLD_TTL_SECS,
        )
    }

    /// Create a guard with explicit limits
    pub fn with_limits(
        cache: Arc<C>,
        max_requests: i64,
        window_secs: u64,
        lock_ttl_secs: u64,
        hold_ttl_secs: u64,
    ) -> Self {
        Self {
            cache,
            max_requests,
            window_secs,
            lock_ttl_secs,
            hold_ttl_secs,
        }
    }

    /// Count a booking request against the guest's rolling window.
    ///
    /// The window expiry is set only on the first increment; rejected
    /// requests still count and are never rolled back.
    #[instrument(skip(self))]
    pub async fn check_rate_limit(&self, guest_id: Uuid) -> AppResult<()> {
        let key = keys::rate_limit_key(guest_id);

        let count = self.cache.incr(&key).await?;
        if count == 1 {
            self.cache.expire(&key, self.window_secs).await?;
        }

        if count > self.max_requests {
            warn!(
                "Guest {} exceeded rate limit: {} requests in window",
                guest_id, count
            );
            return Err(AppError::RateLimited {
                max: self.max_requests,
            });
        }

        debug!("Rate limit check passed: {}/{}", count, self.max_requests);
        Ok(())
    }

    /// Take the slot lock for a property and literal date range.
    ///
    /// The lock only excludes requests for the exact same date strings;
    /// overlapping-but-different ranges both pass and are serialized by the
    /// transactional conflict check instead. The lock is never released
    /// explicitly, it expires with its TTL.
    #[instrument(skip(self))]
    pub async fn acquire_slot_lock(
        &self,
        property_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guest_id: Uuid,
    ) -> AppResult<()> {
        let key = keys::slot_lock_key(property_id, check_in, check_out);

        let acquired = self
            .cache
            .set_nx(&key, &guest_id, self.lock_ttl_secs)
            .await?;

        if !acquired {
            debug!("Slot lock {} already held", key);
            return Err(AppError::SlotLocked);
        }

        debug!("Slot lock {} acquired", key);
        Ok(())
    }

    /// Mark a pending booking as having an in-flight payment attempt.
    ///
    /// While the hold lives, the booking blocks conflicting requests; once
    /// it expires, an abandoned checkout stops starving the slot.
    #[instrument(skip(self))]
    pub async fn place_hold(&self, booking_id: Uuid, guest_id: Uuid) -> AppResult<()> {
        let key = keys::hold_key(booking_id);
        self.cache.set(&key, &guest_id, self.hold_ttl_secs).await?;
        debug!("Hold placed for booking {}", booking_id);
        Ok(())
    }

    /// Drop the hold for a booking (on confirm/reject/cancel)
    #[instrument(skip(self))]
    pub async fn release_hold(&self, booking_id: Uuid) -> AppResult<bool> {
        let key = keys::hold_key(booking_id);
        let removed = self.cache.delete(&key).await?;
        debug!("Hold for booking {} removed: {}", booking_id, removed);
        Ok(removed)
    }

    /// Whether a booking still holds its slot
    pub async fn hold_exists(&self, booking_id: Uuid) -> AppResult<bool> {
        self.cache.exists(&keys::hold_key(booking_id)).await
    }
}
