//! Estimate, access-check and final billing handlers

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use makerspace_billing_core::ReservationQuote;
use makerspace_types::{CostEstimate, ReservationBilling};

use crate::error::ApiResult;
use crate::handlers::shared::{
    parse_equipment_id, parse_user_id, record_op_duration, validate_duration,
};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ReservationRequest {
    pub user_id: String,
    pub equipment_id: String,
    pub duration_minutes: u32,
}

#[derive(Debug, Serialize)]
pub struct EstimateResponse {
    /// False when the equipment is not billed per use
    pub applicable: bool,
    pub estimate: Option<CostEstimate>,
}

#[derive(Debug, Deserialize)]
pub struct FinalizeRequest {
    pub user_id: String,
    pub equipment_id: String,
    pub planned_minutes: u32,
    pub actual_minutes: u32,
}

#[derive(Debug, Serialize)]
pub struct FinalizeResponse {
    pub applicable: bool,
    pub billing: Option<ReservationBilling>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/billing/estimate
#[instrument(skip(state, req), fields(user_id = %req.user_id, equipment_id = %req.equipment_id))]
pub async fn estimate(
    State(state): State<AppState>,
    Json(req): Json<ReservationRequest>,
) -> ApiResult<Json<EstimateResponse>> {
    let start = Instant::now();

    let user_id = parse_user_id(&req.user_id)?;
    let equipment_id = parse_equipment_id(&req.equipment_id)?;
    validate_duration(req.duration_minutes, "duration_minutes")?;

    let result = state
        .billing
        .estimate(&user_id, &equipment_id, req.duration_minutes, Utc::now())
        .await;
    record_op_duration("estimate", start, result.is_ok());
    let estimate = result?;

    Ok(Json(EstimateResponse {
        applicable: estimate.is_some(),
        estimate,
    }))
}

/// POST /api/v1/billing/access-check
#[instrument(skip(state, req), fields(user_id = %req.user_id, equipment_id = %req.equipment_id))]
pub async fn access_check(
    State(state): State<AppState>,
    Json(req): Json<ReservationRequest>,
) -> ApiResult<Json<ReservationQuote>> {
    let start = Instant::now();

    let user_id = parse_user_id(&req.user_id)?;
    let equipment_id = parse_equipment_id(&req.equipment_id)?;
    validate_duration(req.duration_minutes, "duration_minutes")?;

    let result = state
        .billing
        .check_access(&user_id, &equipment_id, req.duration_minutes, Utc::now())
        .await;
    record_op_duration("access_check", start, result.is_ok());
    let quote = result?;

    let decision = if quote.access.allowed { "allowed" } else { "denied" };
    metrics::counter!("billing_access_checks_total", "decision" => decision).increment(1);

    Ok(Json(quote))
}

/// POST /api/v1/billing/finalize
#[instrument(
    skip(state, req),
    fields(
        user_id = %req.user_id,
        equipment_id = %req.equipment_id,
        planned = req.planned_minutes,
        actual = req.actual_minutes
    )
)]
pub async fn finalize(
    State(state): State<AppState>,
    Json(req): Json<FinalizeRequest>,
) -> ApiResult<Json<FinalizeResponse>> {
    let start = Instant::now();

    let user_id = parse_user_id(&req.user_id)?;
    let equipment_id = parse_equipment_id(&req.equipment_id)?;
    validate_duration(req.planned_minutes, "planned_minutes")?;
    validate_duration(req.actual_minutes, "actual_minutes")?;

    let result = state
        .billing
        .finalize(
            &user_id,
            &equipment_id,
            req.planned_minutes,
            req.actual_minutes,
            Utc::now(),
        )
        .await;
    record_op_duration("finalize", start, result.is_ok());
    let billing = result?;

    if let Some(billing) = &billing {
        metrics::counter!("billing_reservations_finalized_total").increment(1);
        if billing.overuse_minutes > 0 {
            metrics::counter!("billing_overuse_penalties_total").increment(1);
        }
    }

    Ok(Json(FinalizeResponse {
        applicable: billing.is_some(),
        billing,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use makerspace_billing_core::{BillingConfig, BillingService};
    use makerspace_store::{
        MemoryPolicyRepository, MemoryWalletRepository, PolicyRepository, Repositories,
    };
    use makerspace_types::{
        CostUnit, Currency, EquipmentAccessPolicy, PayPerUsePricing, RequiredAction, UserId,
        UserWallet,
    };
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::config::Config;
    use crate::error::ApiError;

    const USER: &str = "5b0e4c7e-1f7a-4c55-9a8e-3f1d2c6b7a90";

    fn state_with(repos: Repositories) -> AppState {
        let config = Config {
            http_port: 0,
            data_file: None,
            billing: BillingConfig::default(),
            request_timeout: Duration::from_secs(5),
            metrics_enabled: false,
        };
        AppState::new(BillingService::new(repos, config.billing.clone()), config)
    }

    async fn test_state() -> AppState {
        let repos = Repositories::in_memory();
        repos
            .policies
            .upsert_policy(EquipmentAccessPolicy::pay_per_use(
                "laser-cutter-1",
                PayPerUsePricing::new(dec!(150), CostUnit::Hour)
                    .with_minimum_billing(15)
                    .with_overuse_penalty(Some(dec!(50)), Some(dec!(10))),
            ))
            .await
            .unwrap();
        repos
            .policies
            .upsert_policy(EquipmentAccessPolicy::free("hand-tools"))
            .await
            .unwrap();

        state_with(repos)
    }

    fn with_wallet(balance: Decimal) -> AppState {
        let policies = MemoryPolicyRepository::default();
        policies
            .insert_new(EquipmentAccessPolicy::pay_per_use(
                "laser-cutter-1",
                PayPerUsePricing::new(dec!(150), CostUnit::Hour),
            ))
            .unwrap();
        let wallets = MemoryWalletRepository::default();
        let user_id = UserId::parse(USER).unwrap();
        wallets.insert(UserWallet::new(user_id, balance, Currency::default()).unwrap());

        let repos = Repositories {
            policies: Arc::new(policies),
            wallets: Arc::new(wallets),
            ..Repositories::in_memory()
        };
        state_with(repos)
    }

    fn reservation(equipment_id: &str, duration_minutes: u32) -> Json<ReservationRequest> {
        Json(ReservationRequest {
            user_id: USER.to_string(),
            equipment_id: equipment_id.to_string(),
            duration_minutes,
        })
    }

    #[tokio::test]
    async fn test_estimate_pay_per_use() {
        let state = test_state().await;
        let Json(resp) = estimate(State(state), reservation("laser-cutter-1", 90))
            .await
            .unwrap();
        assert!(resp.applicable);
        assert_eq!(resp.estimate.unwrap().estimated_total, dec!(225.00));
    }

    #[tokio::test]
    async fn test_estimate_not_applicable_for_free_equipment() {
        let state = test_state().await;
        let Json(resp) = estimate(State(state), reservation("hand-tools", 90))
            .await
            .unwrap();
        assert!(!resp.applicable);
        assert!(resp.estimate.is_none());
    }

    #[tokio::test]
    async fn test_estimate_unknown_equipment() {
        let state = test_state().await;
        let err = estimate(State(state), reservation("plasma-cutter", 30))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Billing(ref e) if e.is_not_found()));
    }

    #[tokio::test]
    async fn test_rejects_bad_input() {
        let state = test_state().await;
        let mut req = reservation("laser-cutter-1", 30);
        req.user_id = "nobody".to_string();
        let err = estimate(State(state.clone()), req).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err = estimate(State(state.clone()), reservation("laser cutter", 30))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err = estimate(State(state), reservation("laser-cutter-1", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Billing(ref e) if e.is_invalid_input()));
    }

    #[tokio::test]
    async fn test_access_check_without_wallet_needs_funds() {
        let state = test_state().await;
        let Json(quote) = access_check(State(state), reservation("laser-cutter-1", 90))
            .await
            .unwrap();
        assert!(!quote.access.allowed);
        assert_eq!(quote.access.required_action, Some(RequiredAction::AddFunds));
        assert_eq!(quote.estimate.unwrap().estimated_total, dec!(225.00));
    }

    #[tokio::test]
    async fn test_access_check_with_funds() {
        let state = with_wallet(dec!(300));
        let Json(quote) = access_check(State(state.clone()), reservation("laser-cutter-1", 90))
            .await
            .unwrap();
        assert!(quote.access.allowed);

        let Json(quote) = access_check(State(state), reservation("laser-cutter-1", 180))
            .await
            .unwrap();
        assert!(!quote.access.allowed);
    }

    #[tokio::test]
    async fn test_finalize_with_overuse() {
        let state = test_state().await;
        let req = Json(FinalizeRequest {
            user_id: USER.to_string(),
            equipment_id: "laser-cutter-1".to_string(),
            planned_minutes: 60,
            actual_minutes: 90,
        });
        let Json(resp) = finalize(State(state), req).await.unwrap();
        let billing = resp.billing.unwrap();
        assert!(resp.applicable);
        assert_eq!(billing.overuse_penalty, dec!(72.50));
        assert_eq!(billing.total, dec!(297.50));
    }
}
