//! Property read model
//!
//! The booking engine only needs a published-property snapshot to validate
//! and price a booking request. Property CRUD lives outside this core.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Published property snapshot consumed by the create-booking flow
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    /// Unique identifier (UUID)
    pub id: Uuid,

    /// Owning host
    pub host_id: Uuid,

    /// Tenant scope
    pub organization_id: Uuid,

    /// Nightly price
    pub price_per_night: Decimal,

    /// ISO currency code charged for this property
    pub currency: String,

    /// Maximum number of guests allowed per stay
    pub max_guests: i32,

    /// Whether the listing is visible and bookable
    pub published: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Property {
    /// Check if the property can accept booking requests
    pub fn is_bookable(&self) -> bool {
        self.published
    }
}
