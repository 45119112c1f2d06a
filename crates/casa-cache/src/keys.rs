//! Cache key builders for CasaStay
//!
//! Provides standardized key naming patterns for the coordination entries
//! used by the booking engine, ensuring consistency across horizontally
//! scaled instances and preventing key collisions.
//!
//! # Key Patterns
//!
//! - `slot_lock:{property_id}:{check_in}:{check_out}` - mutual exclusion for
//!   identical-range booking attempts
//! - `hold:{booking_id}` - marks a pending booking with an in-flight payment
//! - `rate_limit:{guest_id}` - rolling-window request counter per guest

use chrono::NaiveDate;
use uuid::Uuid;

/// Prefix for slot lock entries
///
/// Format: `slot_lock:{property_id}:{check_in}:{check_out}`
pub const SLOT_LOCK_PREFIX: &str = "slot_lock";

/// Prefix for booking holds
///
/// Format: `hold:{booking_id}`
pub const HOLD_PREFIX: &str = "hold";

/// Prefix for per-guest rate-limit counters
///
/// Format: `rate_limit:{guest_id}`
pub const RATE_LIMIT_PREFIX: &str = "rate_limit";

/// Default TTL for slot locks (15 minutes)
pub const SLOT_LOCK_TTL_SECS: u64 = 900;

/// Default TTL for holds, matching the payment authorization window (15 minutes)
pub const HOLD_TTL_SECS: u64 = 900;

/// Rolling rate-limit window (60 seconds)
pub const RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Build the lock key for a property and literal date range.
///
/// The key is derived from the exact dates, so two overlapping but
/// non-identical ranges produce different keys and are not mutually
/// excluded here; the transactional conflict check covers those.
pub fn slot_lock_key(property_id: Uuid, check_in: NaiveDate, check_out: NaiveDate) -> String {
    format!(
        "{}:{}:{}:{}",
        SLOT_LOCK_PREFIX, property_id, check_in, check_out
    )
}

/// Build the hold key for a booking
pub fn hold_key(booking_id: Uuid) -> String {
    format!("{}:{}", HOLD_PREFIX, booking_id)
}

/// Build the rate-limit counter key for a guest
pub fn rate_limit_key(guest_id: Uuid) -> String {
    format!("{}:{}", RATE_LIMIT_PREFIX, guest_id)
}
