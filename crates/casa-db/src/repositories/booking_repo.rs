//! Booking repository implementation
//!
//! PostgreSQL-backed storage for bookings, payments and the outbox. The two
//! write paths run as serializable transactions: the in-transaction overlap
//! re-check plus serializable isolation is the authoritative defense against
//! double-booking, everything upstream (slot lock, service-level conflict
//! check) is best-effort shedding.

use casa_core::{
    availability::BookedSlot,
    models::{Booking, BookingRecord, BookingStatus, DomainEvent, Payment, PaymentStatus},
    traits::BookingRepository,
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

/// PostgreSQL serialization-failure SQLSTATE
const SERIALIZATION_FAILURE: &str = "40001";

/// PostgreSQL implementation of BookingRepository
pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    /// Create a new booking repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Parse booking status from string
    fn parse_status(s: &str) -> BookingStatus {
        BookingStatus::from_str(s).unwrap_or(BookingStatus::Pending)
    }

    /// Parse payment status from string
    fn parse_payment_status(s: &str) -> PaymentStatus {
        PaymentStatus::from_str(s).unwrap_or(PaymentStatus::Pending)
    }

    /// Map a write error, translating serialization failures into the
    /// availability conflict they represent: the concurrent transaction
    /// that won the race booked an overlapping range.
    fn map_write_error(e: sqlx::Error) -> AppError {
        if let Some(code) = e.as_database_error().and_then(|d| d.code()) {
            if code == SERIALIZATION_FAILURE {
                warn!("Serializable transaction aborted by a concurrent booking");
                return AppError::NotAvailable;
            }
        }
        error!("Database write failed: {}", e);
        AppError::Database(format!("Write failed: {}", e))
    }

    async fn begin_serializable(&self) -> AppResult<Transaction<'_, Postgres>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!("Failed to set isolation level: {}", e);
                AppError::Transaction(format!("Failed to set isolation level: {}", e))
            })?;

        Ok(tx)
    }

    async fn insert_events(
        tx: &mut Transaction<'_, Postgres>,
        events: &[DomainEvent],
    ) -> AppResult<()> {
        for event in events {
            sqlx::query(
                r#"
                INSERT INTO booking_events (id, aggregate_id, event_type, occurred_at, payload)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(event.id)
            .bind(event.aggregate_id)
            .bind(&event.event_type)
            .bind(event.occurred_at)
            .bind(&event.payload)
            .execute(&mut **tx)
            .await
            .map_err(Self::map_write_error)?;
        }
        Ok(())
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Booking>> {
        debug!("Finding booking by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, BookingRow>(
            r#"
            SELECT
                id, property_id, guest_id, host_id, organization_id,
                check_in, check_out, guests, nights, total_price,
                status, created_at, updated_at
            FROM bookings
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding booking {}: {}", id, e);
            AppError::Database(format!("Failed to find booking: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_scoped(&self, id: Uuid, organization_id: Uuid) -> AppResult<Option<Booking>> {
        debug!("Finding booking {} in organization {}", id, organization_id);

        let result = sqlx::query_as::<sqlx::Postgres, BookingRow>(
            r#"
            SELECT
                id, property_id, guest_id, host_id, organization_id,
                check_in, check_out, guests, nights, total_price,
                status, created_at, updated_at
            FROM bookings
            WHERE id = $1 AND organization_id = $2
            "#,
        )
        .bind(id)
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding booking {}: {}", id, e);
            AppError::Database(format!("Failed to find booking: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self, booking, payment, events))]
    async fn create_with_payment(
        &self,
        booking: &Booking,
        payment: &Payment,
        events: &[DomainEvent],
    ) -> AppResult<()> {
        debug!(
            "Persisting booking {} with payment {}",
            booking.id, payment.id
        );

        let mut tx = self.begin_serializable().await?;

        // Re-check confirmed overlaps inside the transaction. Together with
        // serializable isolation this also aborts one of two concurrent
        // inserts for overlapping ranges (SQLSTATE 40001).
        let conflicts: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM bookings
            WHERE property_id = $1
                AND status = 'confirmed'
                AND check_in < $3
                AND check_out > $2
            "#,
        )
        .bind(booking.property_id)
        .bind(booking.check_in)
        .bind(booking.check_out)
        .fetch_one(&mut *tx)
        .await
        .map_err(Self::map_write_error)?;

        if conflicts.0 > 0 {
            warn!(
                "Booking {} conflicts with a confirmed stay, rolling back",
                booking.id
            );
            return Err(AppError::NotAvailable);
        }

        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, property_id, guest_id, host_id, organization_id,
                check_in, check_out, guests, nights, total_price,
                status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(booking.id)
        .bind(booking.property_id)
        .bind(booking.guest_id)
        .bind(booking.host_id)
        .bind(booking.organization_id)
        .bind(booking.check_in)
        .bind(booking.check_out)
        .bind(booking.guests)
        .bind(booking.nights)
        .bind(booking.total_price)
        .bind(booking.status.to_string())
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(Self::map_write_error)?;

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, booking_id, amount, currency, external_ref,
                status, platform_fee_amount, host_net_amount, paid_at,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(payment.id)
        .bind(payment.booking_id)
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(&payment.external_ref)
        .bind(payment.status.to_string())
        .bind(payment.platform_fee_amount)
        .bind(payment.host_net_amount)
        .bind(payment.paid_at)
        .bind(payment.created_at)
        .bind(payment.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(Self::map_write_error)?;

        Self::insert_events(&mut tx, events).await?;

        tx.commit().await.map_err(Self::map_write_error)?;

        debug!("Booking {} persisted", booking.id);
        Ok(())
    }

    #[instrument(skip(self, booking, payment, events))]
    async fn update_status(
        &self,
        booking: &Booking,
        payment: &Payment,
        events: &[DomainEvent],
    ) -> AppResult<()> {
        debug!(
            "Updating booking {} to {} and payment {} to {}",
            booking.id, booking.status, payment.id, payment.status
        );

        let mut tx = self.begin_serializable().await?;

        sqlx::query(
            r#"
            UPDATE bookings
            SET status = $2,
                updated_at = $3
            WHERE id = $1
            "#,
        )
        .bind(booking.id)
        .bind(booking.status.to_string())
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(Self::map_write_error)?;

        sqlx::query(
            r#"
            UPDATE payments
            SET status = $2,
                platform_fee_amount = $3,
                host_net_amount = $4,
                paid_at = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(payment.id)
        .bind(payment.status.to_string())
        .bind(payment.platform_fee_amount)
        .bind(payment.host_net_amount)
        .bind(payment.paid_at)
        .bind(payment.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(Self::map_write_error)?;

        Self::insert_events(&mut tx, events).await?;

        tx.commit().await.map_err(Self::map_write_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_blocking_slots(
        &self,
        property_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> AppResult<Vec<BookedSlot>> {
        debug!(
            "Finding blocking slots for property {} in [{}, {})",
            property_id, check_in, check_out
        );

        let rows = sqlx::query_as::<sqlx::Postgres, SlotRow>(
            r#"
            SELECT id, check_in, check_out, status
            FROM bookings
            WHERE property_id = $1
                AND status IN ('pending', 'confirmed')
                AND check_in < $3
                AND check_out > $2
            "#,
        )
        .bind(property_id)
        .bind(check_in)
        .bind(check_out)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding blocking slots: {}", e);
            AppError::Database(format!("Failed to find blocking slots: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn find_payment_by_booking(&self, booking_id: Uuid) -> AppResult<Option<Payment>> {
        debug!("Finding payment for booking: {}", booking_id);

        let result = sqlx::query_as::<sqlx::Postgres, PaymentRow>(
            r#"
            SELECT
                id, booking_id, amount, currency, external_ref,
                status, platform_fee_amount, host_net_amount, paid_at,
                created_at, updated_at
            FROM payments
            WHERE booking_id = $1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding payment: {}", e);
            AppError::Database(format!("Failed to find payment: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_payment_by_external_ref(&self, external_ref: &str) -> AppResult<Option<Payment>> {
        debug!("Finding payment by external ref: {}", external_ref);

        let result = sqlx::query_as::<sqlx::Postgres, PaymentRow>(
            r#"
            SELECT
                id, booking_id, amount, currency, external_ref,
                status, platform_fee_amount, host_net_amount, paid_at,
                created_at, updated_at
            FROM payments
            WHERE external_ref = $1
            "#,
        )
        .bind(external_ref)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding payment by external ref: {}", e);
            AppError::Database(format!("Failed to find payment: {}", e))
        })?;

        Ok(result.map(Into::into))
    }
}

/// Helper struct for mapping booking rows
#[derive(Debug, sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    property_id: Uuid,
    guest_id: Uuid,
    host_id: Uuid,
    organization_id: Uuid,
    check_in: NaiveDate,
    check_out: NaiveDate,
    guests: i32,
    nights: i32,
    total_price: Decimal,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        BookingRecord {
            id: row.id,
            property_id: row.property_id,
            guest_id: row.guest_id,
            host_id: row.host_id,
            organization_id: row.organization_id,
            check_in: row.check_in,
            check_out: row.check_out,
            guests: row.guests,
            nights: row.nights,
            total_price: row.total_price,
            status: PgBookingRepository::parse_status(&row.status),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
        .into()
    }
}

/// Helper struct for mapping payment rows
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    booking_id: Uuid,
    amount: Decimal,
    currency: String,
    external_ref: String,
    status: String,
    platform_fee_amount: Option<Decimal>,
    host_net_amount: Option<Decimal>,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Self {
            id: row.id,
            booking_id: row.booking_id,
            amount: row.amount,
            currency: row.currency,
            external_ref: row.external_ref,
            status: PgBookingRepository::parse_payment_status(&row.status),
            platform_fee_amount: row.platform_fee_amount,
            host_net_amount: row.host_net_amount,
            paid_at: row.paid_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Helper struct for mapping blocking-slot rows
#[derive(Debug, sqlx::FromRow)]
struct SlotRow {
    id: Uuid,
    check_in: NaiveDate,
    check_out: NaiveDate,
    status: String,
}

impl From<SlotRow> for BookedSlot {
    fn from(row: SlotRow) -> Self {
        Self {
            booking_id: row.id,
            check_in: row.check_in,
            check_out: row.check_out,
            status: PgBookingRepository::parse_status(&row.status),
        }
    }
}
