//! Payment model
//!
//! One payment per booking. Created together with the booking once the
//! gateway authorization succeeds, completed (captured + commission split)
//! when the host confirms, cancelled or refunded otherwise.

use crate::commission::CommissionSplit;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Authorization exists, capture has not happened yet
    #[default]
    Pending,
    /// Captured and commission split recorded
    Completed,
    /// Gateway reported a definitive failure
    Failed,
    /// Authorization voided before capture
    Cancelled,
    /// Captured amount returned to the guest
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Completed => write!(f, "completed"),
            PaymentStatus::Failed => write!(f, "failed"),
            PaymentStatus::Cancelled => write!(f, "cancelled"),
            PaymentStatus::Refunded => write!(f, "refunded"),
        }
    }
}

impl PaymentStatus {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            "cancelled" => Some(PaymentStatus::Cancelled),
            "refunded" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }

    /// Check if the payment reached a terminal state
    pub fn is_final(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

/// Payment entity, one-to-one with a booking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier (UUID)
    pub id: Uuid,

    /// Associated booking
    pub booking_id: Uuid,

    /// Total amount charged to the guest
    pub amount: Decimal,

    /// ISO currency code
    pub currency: String,

    /// Gateway authorization/charge identifier
    pub external_ref: String,

    /// Current status
    pub status: PaymentStatus,

    /// Commission retained by the platform, set once at completion
    pub platform_fee_amount: Option<Decimal>,

    /// Amount owed to the host, set once at completion
    pub host_net_amount: Option<Decimal>,

    /// When the capture settled
    pub paid_at: Option<DateTime<Utc>>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Create a pending payment for a fresh authorization
    pub fn new(booking_id: Uuid, amount: Decimal, currency: &str, external_ref: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            booking_id,
            amount,
            currency: currency.to_string(),
            external_ref: external_ref.to_string(),
            status: PaymentStatus::Pending,
            platform_fee_amount: None,
            host_net_amount: None,
            paid_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the commission split has already been computed.
    ///
    /// Used as the idempotency guard between the synchronous confirm path
    /// and webhook reconciliation: once the fee is set it is never rederived.
    pub fn fee_already_split(&self) -> bool {
        self.platform_fee_amount.is_some()
    }

    /// Record capture settlement and the commission split.
    ///
    /// The split is written only on the first call; a repeated completion
    /// leaves the recorded amounts untouched.
    pub fn mark_completed(&mut self, split: CommissionSplit, now: DateTime<Utc>) {
        if !self.fee_already_split() {
            self.platform_fee_amount = Some(split.platform_fee);
            self.host_net_amount = Some(split.host_net);
        }
        self.mark_settled(now);
    }

    /// Record settlement without touching the commission split.
    ///
    /// Used by webhook reconciliation when the synchronous confirm path has
    /// already written the split and only the status needs to catch up.
    pub fn mark_settled(&mut self, now: DateTime<Utc>) {
        self.status = PaymentStatus::Completed;
        self.paid_at.get_or_insert(now);
        self.updated_at = now;
    }

    /// Record a voided authorization
    pub fn mark_cancelled(&mut self, now: DateTime<Utc>) {
        self.status = PaymentStatus::Cancelled;
        self.updated_at = now;
    }

    /// Record a gateway-reported failure
    pub fn mark_failed(&mut self, now: DateTime<Utc>) {
        self.status = PaymentStatus::Failed;
        self.updated_at = now;
    }

    /// Record a refund of the captured amount
    pub fn mark_refunded(&mut self, now: DateTime<Utc>) {
        self.status = PaymentStatus::Refunded;
        self.updated_at = now;
    }
}
