//! Application configuration
//!
//! This module provides centralized configuration management using the `config` crate.
//! Configuration can be loaded from environment variables and config files.

use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub booking: BookingConfig,
}

/// Database configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection acquire timeout in seconds
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Idle connection timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

/// Redis configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    /// Redis connection URL
    pub url: String,

    /// Default TTL for cached items in seconds
    #[serde(default = "default_cache_ttl")]
    pub default_ttl_secs: u64,
}

fn default_cache_ttl() -> u64 {
    300
}

/// Booking-specific configuration
#[derive(Debug, Deserialize, Clone)]
pub struct BookingConfig {
    /// Platform commission percentage retained from each booking
    #[serde(default = "default_fee_percent")]
    pub platform_fee_percent: f64,

    /// Rolling rate-limit window in seconds
    #[serde(default = "default_rate_limit_window")]
    pub rate_limit_window_secs: u64,

    /// Maximum booking requests per guest per window
    #[serde(default = "default_rate_limit_max")]
    pub rate_limit_max_requests: i64,

    /// Slot lock TTL in seconds
    #[serde(default = "default_slot_lock_ttl")]
    pub slot_lock_ttl_secs: u64,

    /// Hold TTL in seconds, matching the payment authorization window
    #[serde(default = "default_hold_ttl")]
    pub hold_ttl_secs: u64,
}

fn default_fee_percent() -> f64 {
    10.0
}

fn default_rate_limit_window() -> u64 {
    60
}

fn default_rate_limit_max() -> i64 {
    10
}

fn default_slot_lock_ttl() -> u64 {
    900
}

fn default_hold_ttl() -> u64 {
    900
}

impl AppConfig {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with default values
            .set_default("database.max_connections", 10)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("database.idle_timeout_secs", 600)?
            .set_default("redis.default_ttl_secs", 300)?
            .set_default("booking.platform_fee_percent", 10.0)?
            .set_default("booking.rate_limit_window_secs", 60)?
            .set_default("booking.rate_limit_max_requests", 10)?
            .set_default("booking.slot_lock_ttl_secs", 900)?
            .set_default("booking.hold_ttl_secs", 900)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables with CASA_ prefix
            .add_source(
                Environment::with_prefix("CASA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("CASA").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

impl BookingConfig {
    /// Platform fee percentage as a decimal, falling back to the default
    /// when the configured float has no exact decimal representation.
    pub fn fee_percent(&self) -> Decimal {
        Decimal::from_f64_retain(self.platform_fee_percent)
            .map(|d| d.round_dp(4))
            .unwrap_or_else(|| Decimal::from(10))
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            platform_fee_percent: 10.0,
            rate_limit_window_secs: 60,
            rate_limit_max_requests: 10,
            slot_lock_ttl_secs: 900,
            hold_ttl_secs: 900,
        }
    }
}
