//! Equipment policy handlers

use axum::extract::{Path, State};
use axum::Json;
use tracing::instrument;

use makerspace_billing_core::BillingError;
use makerspace_types::{EquipmentAccessPolicy, PolicyRecord};

use crate::error::{ApiError, ApiResult};
use crate::handlers::shared::parse_equipment_id;
use crate::state::AppState;

/// GET /api/v1/equipment
pub async fn list_policies(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<EquipmentAccessPolicy>>> {
    Ok(Json(state.billing.list_policies().await?))
}

/// GET /api/v1/equipment/{equipment_id}/policy
#[instrument(skip(state))]
pub async fn get_policy(
    State(state): State<AppState>,
    Path(equipment_id): Path<String>,
) -> ApiResult<Json<EquipmentAccessPolicy>> {
    let equipment_id = parse_equipment_id(&equipment_id)?;
    Ok(Json(state.billing.policy(&equipment_id).await?))
}

/// PUT /api/v1/equipment/{equipment_id}/policy
///
/// Takes the flat policy shape; validation errors come back as `INVALID_POLICY`.
#[instrument(skip(state, record))]
pub async fn put_policy(
    State(state): State<AppState>,
    Path(equipment_id): Path<String>,
    Json(record): Json<PolicyRecord>,
) -> ApiResult<Json<EquipmentAccessPolicy>> {
    let equipment_id = parse_equipment_id(&equipment_id)?;
    if record.equipment_id != equipment_id.as_str() {
        return Err(ApiError::BadRequest("equipment_id in body does not match path".into()));
    }

    let policy = EquipmentAccessPolicy::try_from(record)
        .map_err(|e| ApiError::Billing(BillingError::from(e)))?;
    state.billing.upsert_policy(policy.clone()).await?;
    metrics::counter!("billing_policies_saved_total").increment(1);

    Ok(Json(policy))
}
