//! Unified error handling for CasaStay
//!
//! This module provides a comprehensive error type that covers all possible
//! failure scenarios in the booking engine, with automatic HTTP response mapping.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Main application error type
///
/// All errors in the application should be converted to this type.
/// It implements `ResponseError` for automatic HTTP response generation.
#[derive(Error, Debug)]
pub enum AppError {
    // ==================== Database Errors ====================
    #[error("Database error: {0}")]
    Database(String),

    #[error("Database pool error: {0}")]
    Pool(String),

    #[error("Transaction failed: {0}")]
    Transaction(String),

    // ==================== Cache Errors ====================
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Cache connection failed: {0}")]
    CacheConnection(String),

    // ==================== Payment Gateway Errors ====================
    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Invalid webhook signature")]
    WebhookSignature,

    // ==================== Business Rule Errors ====================
    #[error("Invalid dates: {0}")]
    InvalidDates(String),

    #[error("Too many guests: max {max} allowed")]
    TooManyGuests { max: i32 },

    #[error("Illegal booking transition: {0}")]
    IllegalTransition(String),

    #[error("These dates are temporarily reserved, try again")]
    SlotLocked,

    #[error("Too many booking requests: max {max} per minute")]
    RateLimited { max: i64 },

    #[error("Payment is not awaiting capture: {0}")]
    PaymentNotCapturable(String),

    #[error("Property is not available for selected dates")]
    NotAvailable,

    // ==================== Resource Errors ====================
    #[error("Property not found: {0}")]
    PropertyNotFound(String),

    #[error("Booking not found: {0}")]
    BookingNotFound(String),

    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // ==================== Access Errors ====================
    #[error("Forbidden: {0}")]
    Forbidden(String),

    // ==================== Internal Errors ====================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::InvalidDates(_)
            | AppError::TooManyGuests { .. }
            | AppError::IllegalTransition(_)
            | AppError::SlotLocked
            | AppError::RateLimited { .. }
            | AppError::PaymentNotCapturable(_)
            | AppError::NotAvailable
            | AppError::WebhookSignature => StatusCode::BAD_REQUEST,

            // 403 Forbidden
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,

            // 404 Not Found
            AppError::PropertyNotFound(_)
            | AppError::BookingNotFound(_)
            | AppError::PaymentNotFound(_)
            | AppError::NotFound(_) => StatusCode::NOT_FOUND,

            // 503 Service Unavailable
            AppError::Database(_)
            | AppError::Pool(_)
            | AppError::Transaction(_)
            | AppError::Cache(_)
            | AppError::CacheConnection(_)
            | AppError::Gateway(_) => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::Pool(_) => "pool_error",
            AppError::Transaction(_) => "transaction_error",
            AppError::Cache(_) => "cache_error",
            AppError::CacheConnection(_) => "cache_connection_error",
            AppError::Gateway(_) => "gateway_error",
            AppError::WebhookSignature => "webhook_signature_error",
            AppError::InvalidDates(_) => "invalid_dates",
            AppError::TooManyGuests { .. } => "too_many_guests",
            AppError::IllegalTransition(_) => "illegal_transition",
            AppError::SlotLocked => "slot_locked",
            AppError::RateLimited { .. } => "rate_limited",
            AppError::PaymentNotCapturable(_) => "payment_not_capturable",
            AppError::NotAvailable => "not_available",
            AppError::PropertyNotFound(_) => "property_not_found",
            AppError::BookingNotFound(_) => "booking_not_found",
            AppError::PaymentNotFound(_) => "payment_not_found",
            AppError::NotFound(_) => "not_found",
            AppError::Forbidden(_) => "forbidden",
            AppError::Internal(_) => "internal_error",
            AppError::Config(_) => "config_error",
            AppError::Serialization(_) => "serialization_error",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        AppError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let body = json!({
            "error": self.error_code(),
            "message": self.to_string(),
            "status": status.as_u16(),
        });

        HttpResponse::build(status).json(body)
    }
}

// ==================== From implementations ====================

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}
