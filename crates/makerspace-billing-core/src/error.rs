//! Billing errors

use makerspace_store::StoreError;
use makerspace_types::{Currency, EquipmentId, PolicyValidationError};
use thiserror::Error;

/// Billing errors
#[derive(Error, Debug)]
pub enum BillingError {
    /// No policy is configured for the equipment
    #[error("no access policy for equipment {0}")]
    PolicyNotFound(EquipmentId),

    /// Requested or planned duration is zero
    #[error("reservation duration must be at least one minute")]
    InvalidDuration,

    /// Policy fails validation
    #[error("invalid policy: {0}")]
    InvalidPolicy(#[from] PolicyValidationError),

    /// Policy is priced in a currency this deployment does not bill in
    #[error("policy currency {found} does not match billing currency {expected}")]
    CurrencyMismatch {
        /// Configured billing currency
        expected: Currency,
        /// Currency on the policy
        found: Currency,
    },

    /// Store error
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl BillingError {
    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PolicyNotFound(_))
    }

    /// Check if the caller supplied bad input
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::InvalidDuration | Self::InvalidPolicy(_) | Self::CurrencyMismatch { .. }
        )
    }
}
