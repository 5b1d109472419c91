//! Validation errors for domain types

use rust_decimal::Decimal;
use thiserror::Error;

use crate::AccessType;

/// Errors raised while validating an equipment access policy
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyValidationError {
    /// Equipment ID is empty
    #[error("equipment_id must not be empty")]
    EmptyEquipmentId,

    /// A pay-per-use policy is missing a required pricing field
    #[error("pay_per_use policy is missing {0}")]
    MissingField(&'static str),

    /// A monetary or percentage field is negative
    #[error("{0} must not be negative")]
    Negative(&'static str),

    /// A monetary or percentage field is above its limit
    #[error("{field} must not exceed {max}")]
    TooLarge {
        /// Name of the offending field
        field: &'static str,
        /// Largest accepted value
        max: Decimal,
    },

    /// A pricing field was set on a policy that is not pay-per-use
    #[error("{access_type} policy must not set {field}")]
    UnexpectedPricing {
        /// Access type of the offending policy
        access_type: AccessType,
        /// Name of the pricing field that was set
        field: &'static str,
    },

    /// Currency code is malformed
    #[error(transparent)]
    Currency(#[from] CurrencyParseError),
}

/// Error parsing a currency code
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid currency code: {0}")]
pub struct CurrencyParseError(pub String);

/// Errors raised while constructing a wallet
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    /// Balance below zero
    #[error("wallet balance must not be negative")]
    NegativeBalance,
}
