//! Booking and payment orchestration services for CasaStay
//!
//! This crate contains the business logic that drives the booking
//! lifecycle: concurrency guards, two-phase payment orchestration and the
//! booking use cases themselves.
//!
//! # Architecture
//!
//! Services are designed to be composable and testable:
//! - Each service owns its dependencies (repositories, cache, gateway)
//! - Services are wrapped in Arc for safe sharing across async tasks
//! - All operations are instrumented with tracing
//! - Expected business-rule violations travel as typed values and are
//!   translated into `AppError` at this layer
//!
//! # Services
//!
//! - `ConcurrencyGuard` - rate limiting, slot locking and booking holds
//! - `PaymentOrchestrator` - authorize/capture/cancel/refund and webhook
//!   reconciliation
//! - `BookingManager` - create/confirm/reject/cancel/refund use cases

pub mod booking_manager;
pub mod guards;
pub mod payments;

#[cfg(test)]
mod test_support;

pub use booking_manager::{BookingManager, CreateBookingCommand, CreatedBooking};
pub use guards::ConcurrencyGuard;
pub use payments::PaymentOrchestrator;

/// Business logic constants
pub mod constants {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    /// Rolling rate-limit window in seconds
    pub const RATE_LIMIT_WINDOW_SECS: u64 = 60;

    /// Maximum booking requests per guest per window
    pub const RATE_LIMIT_MAX_REQUESTS: i64 = 10;

    /// Slot lock TTL in seconds (15 minutes)
    pub const SLOT_LOCK_TTL_SECS: u64 = 900;

    /// Hold TTL in seconds, matching the payment authorization window
    pub const HOLD_TTL_SECS: u64 = 900;

    /// Default platform commission percentage
    pub const DEFAULT_PLATFORM_FEE_PERCENT: Decimal = dec!(10);
}
