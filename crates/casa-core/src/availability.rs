//! Date-range availability checking
//!
//! Pure overlap logic over booked slots supplied by the repository. Ranges
//! are half-open: a stay ending on the day another begins does not conflict.
//!
//! Which pending slots participate at all is a policy decision made by the
//! caller: confirmed bookings always block, pending bookings block only
//! while a hold exists for them. An abandoned checkout whose hold expired is
//! filtered out before this check, so it cannot starve the slot.

use crate::models::BookingStatus;
use chrono::NaiveDate;
use uuid::Uuid;

/// A booked date range for a property, as returned by the repository
#[derive(Debug, Clone)]
pub struct BookedSlot {
    pub booking_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub status: BookingStatus,
}

/// Half-open interval overlap: [a_start, a_end) intersects [b_start, b_end)
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Check a requested range against existing slots.
///
/// Slots in a non-blocking status (cancelled, rejected, refunded) are
/// skipped; any remaining overlap is a conflict.
pub fn has_conflict(
    requested_check_in: NaiveDate,
    requested_check_out: NaiveDate,
    existing_slots: &[BookedSlot],
) -> bool {
    existing_slots
        .iter()
        .filter(|slot| !slot.status.is_non_blocking())
        .any(|slot| {
            ranges_overlap(
                requested_check_in,
                requested_check_out,
                slot.check_in,
                slot.check_out,
            )
        })
}
