//! Shared handler utilities
//!
//! Common validation and metrics helpers used across handlers.

use std::time::Instant;

use makerspace_types::{EquipmentId, UserId};

use crate::error::ApiError;

// ============================================================================
// Input Validation
// ============================================================================

/// Maximum length for equipment IDs (they end up in logs and metric labels)
const MAX_EQUIPMENT_ID_LEN: usize = 64;

/// Longest reservation accepted, one week
pub const MAX_DURATION_MINUTES: u32 = 7 * 24 * 60;

/// Validate and wrap an equipment ID.
///
/// Allows alphanumeric, underscore, hyphen and dot.
pub fn parse_equipment_id(id: &str) -> Result<EquipmentId, ApiError> {
    if id.is_empty() {
        return Err(ApiError::BadRequest("Equipment ID cannot be empty".into()));
    }

    if id.len() > MAX_EQUIPMENT_ID_LEN {
        return Err(ApiError::BadRequest(format!(
            "Equipment ID too long (max {MAX_EQUIPMENT_ID_LEN} chars)"
        )));
    }

    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(ApiError::BadRequest(
            "Equipment ID contains invalid characters (use alphanumeric, _, -, .)".into(),
        ));
    }

    Ok(EquipmentId::from(id))
}

/// Parse a user ID.
pub fn parse_user_id(id: &str) -> Result<UserId, ApiError> {
    UserId::parse(id).map_err(|_| ApiError::BadRequest("Invalid user_id".into()))
}

/// Reject durations above [`MAX_DURATION_MINUTES`].
pub fn validate_duration(minutes: u32, field_name: &str) -> Result<(), ApiError> {
    if minutes > MAX_DURATION_MINUTES {
        return Err(ApiError::BadRequest(format!(
            "{field_name} too long (max {MAX_DURATION_MINUTES} minutes)"
        )));
    }
    Ok(())
}

// ============================================================================
// Metrics Helpers
// ============================================================================

/// Record operation duration with result label
#[inline]
pub fn record_op_duration(operation: &'static str, start: Instant, success: bool) {
    let result = if success { "ok" } else { "err" };
    metrics::histogram!(
        "billing_operation_duration_seconds",
        "operation" => operation,
        "result" => result
    )
    .record(start.elapsed().as_secs_f64());
}
