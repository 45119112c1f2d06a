//! Property repository implementation
//!
//! Read-only lookup of published properties; property CRUD lives outside
//! the booking engine.

use casa_core::{models::Property, traits::PropertyRepository, AppError, AppResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// PostgreSQL implementation of PropertyRepository
pub struct PgPropertyRepository {
    pool: PgPool,
}

impl PgPropertyRepository {
    /// Create a new property repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PropertyRepository for PgPropertyRepository {
    #[instrument(skip(self))]
    async fn find_published(
        &self,
        property_id: Uuid,
        organization_id: Uuid,
    ) -> AppResult<Option<Property>> {
        debug!(
            "Finding published property {} in organization {}",
            property_id, organization_id
        );

        let result = sqlx::query_as::<sqlx::Postgres, PropertyRow>(
            r#"
            SELECT
                id, host_id, organization_id, price_per_night, currency,
                max_guests, published, created_at, updated_at
            FROM properties
            WHERE id = $1 AND organization_id = $2 AND published = TRUE
            "#,
        )
        .bind(property_id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding property {}: {}", property_id, e);
            AppError::Database(format!("Failed to find property: {}", e))
        })?;

        Ok(result.map(Into::into))
    }
}

/// Helper struct for mapping property rows
#[derive(Debug, sqlx::FromRow)]
struct PropertyRow {
    id: Uuid,
    host_id: Uuid,
    organization_id: Uuid,
    price_per_night: Decimal,
    currency: String,
    max_guests: i32,
    published: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PropertyRow> for Property {
    fn from(row: PropertyRow) -> Self {
        Self {
            id: row.id,
            host_id: row.host_id,
            organization_id: row.organization_id,
            price_per_night: row.price_per_night,
            currency: row.currency,
            max_guests: row.max_guests,
            published: row.published,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
