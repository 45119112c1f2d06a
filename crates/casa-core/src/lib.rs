//! CasaStay Core Library
//!
//! This crate provides the foundational types, traits, and error handling
//! for the CasaStay booking engine. It includes:
//!
//! - Domain models (Booking, Payment, Property, DomainEvent)
//! - Pure availability and commission calculations
//! - Ports for persistence, cache/lock coordination and the payment gateway
//! - Unified error handling with HTTP response mapping
//! - Application configuration

pub mod availability;
pub mod commission;
pub mod config;
pub mod error;
pub mod models;
pub mod traits;

pub use config::AppConfig;
pub use error::AppError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
