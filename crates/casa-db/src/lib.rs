//! CasaStay Database Layer
//!
//! This crate provides PostgreSQL database access and repository
//! implementations for the CasaStay booking engine. It includes:
//!
//! - Connection pool management with sqlx
//! - Repository implementations for bookings, payments, the outbox and
//!   published properties
//! - Serializable transactions for the atomic {booking, payment, outbox}
//!   write paths

pub mod pool;
pub mod repositories;

pub use pool::create_pool;
pub use repositories::*;

// Re-export commonly used types
pub use casa_core::{AppError, AppResult};
pub use sqlx::{PgPool, Postgres, Transaction};
