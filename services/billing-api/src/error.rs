//! Error types for the Billing API service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use makerspace_billing_core::BillingError;

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{0}")]
    Billing(#[from] BillingError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Billing(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::Billing(e) if e.is_invalid_input() => StatusCode::BAD_REQUEST,
            Self::Billing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Billing(BillingError::PolicyNotFound(_)) => "POLICY_NOT_FOUND",
            Self::Billing(BillingError::InvalidDuration) => "INVALID_DURATION",
            Self::Billing(BillingError::InvalidPolicy(_)) => "INVALID_POLICY",
            Self::Billing(BillingError::CurrencyMismatch { .. }) => "CURRENCY_MISMATCH",
            Self::Billing(BillingError::Store(_)) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        // Log internal errors; don't leak their details
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = ?self, "Internal API error");
            "Internal error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use makerspace_types::{EquipmentId, PolicyValidationError};

    #[test]
    fn test_status_codes() {
        let not_found = ApiError::from(BillingError::PolicyNotFound(EquipmentId::from("x")));
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.error_code(), "POLICY_NOT_FOUND");

        let invalid = ApiError::from(BillingError::InvalidPolicy(
            PolicyValidationError::MissingField("price_per_unit"),
        ));
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);

        let duration = ApiError::from(BillingError::InvalidDuration);
        assert_eq!(duration.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(duration.error_code(), "INVALID_DURATION");
    }

    #[test]
    fn test_response_status() {
        let response = ApiError::BadRequest("nope".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
