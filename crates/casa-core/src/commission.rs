//! Commission calculation
//!
//! Splits a booking total into the platform fee and the host's net amount
//! using decimal arithmetic, so the two parts always add back up to the
//! total exactly, to the cent. Computed once per payment, at completion.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Result of splitting a booking total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionSplit {
    /// Amount retained by the platform
    pub platform_fee: Decimal,

    /// Amount owed to the host
    pub host_net: Decimal,
}

/// Split `total` into platform fee and host net.
///
/// `fee_percentage` is expressed in percent (10 means 10%). Both parts are
/// rounded to cents half-up; the host net is derived from the rounded fee so
/// that `platform_fee + host_net == total` holds exactly for any total with
/// at most two decimal places.
pub fn compute_fee(total: Decimal, fee_percentage: Decimal) -> CommissionSplit {
    let platform_fee = (total * fee_percentage / Decimal::from(100))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let host_net =
        (total - platform_fee).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

    CommissionSplit {
        platform_fee,
        host_net,
    }
}
