//! Configuration for the Billing API service.

use std::path::PathBuf;
use std::time::Duration;

use chrono::FixedOffset;
use makerspace_billing_core::BillingConfig;
use makerspace_types::Currency;

/// Billing API configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub http_port: u16,
    /// JSON snapshot used to seed the store
    pub data_file: Option<PathBuf>,
    /// Billing core configuration
    pub billing: BillingConfig,
    /// Request timeout
    pub request_timeout: Duration,
    /// Metrics enabled
    pub metrics_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_port = std::env::var("HTTP_PORT")
            .unwrap_or_else(|_| "8081".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("HTTP_PORT"))?;

        let data_file = std::env::var_os("DATA_FILE").map(PathBuf::from);

        // Billing
        let currency: Currency = std::env::var("BILLING_CURRENCY")
            .unwrap_or_else(|_| makerspace_types::DEFAULT_CURRENCY.to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("BILLING_CURRENCY"))?;

        let offset_minutes: i32 = std::env::var("BILLING_UTC_OFFSET_MINUTES")
            .unwrap_or_else(|_| "0".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("BILLING_UTC_OFFSET_MINUTES"))?;
        let utc_offset = offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or(ConfigError::Invalid("BILLING_UTC_OFFSET_MINUTES"))?;

        // Request timeout
        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("REQUEST_TIMEOUT_SECS"))?;

        // Metrics
        let metrics_enabled = std::env::var("METRICS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);

        Ok(Self {
            http_port,
            data_file,
            billing: BillingConfig::new(currency).with_utc_offset(utc_offset),
            request_timeout: Duration::from_secs(request_timeout_secs),
            metrics_enabled,
        })
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
