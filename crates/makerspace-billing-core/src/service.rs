//! Billing service
//!
//! Loads the policy, subscription, wallet and same-day usage for a
//! reservation from the repositories and feeds them to the pure calculators.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, instrument};

use makerspace_store::Repositories;
use makerspace_types::{
    AccessCheckResult, CostEstimate, EquipmentAccessPolicy, EquipmentId, ReservationBilling,
    UserId, UserSubscription,
};

use crate::{calculate_final_billing, check_access, estimate_cost, BillingConfig, BillingError};

/// Access decision together with the estimate it was based on
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationQuote {
    /// Whether the reservation may go ahead
    pub access: AccessCheckResult,
    /// Estimated charge, for pay-per-use equipment
    pub estimate: Option<CostEstimate>,
}

/// Billing service
#[derive(Clone)]
pub struct BillingService {
    repos: Repositories,
    config: BillingConfig,
}

impl BillingService {
    /// Create a new billing service
    pub fn new(repos: Repositories, config: BillingConfig) -> Self {
        Self { repos, config }
    }

    /// Get the configuration
    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    /// Get the policy for a piece of equipment
    #[instrument(skip(self))]
    pub async fn policy(
        &self,
        equipment_id: &EquipmentId,
    ) -> Result<EquipmentAccessPolicy, BillingError> {
        self.repos
            .policies
            .find_policy(equipment_id)
            .await?
            .ok_or_else(|| BillingError::PolicyNotFound(equipment_id.clone()))
    }

    /// List all policies
    pub async fn list_policies(&self) -> Result<Vec<EquipmentAccessPolicy>, BillingError> {
        Ok(self.repos.policies.list_policies().await?)
    }

    /// Create or replace a policy after validating it
    #[instrument(skip(self, policy), fields(equipment_id = %policy.equipment_id))]
    pub async fn upsert_policy(&self, policy: EquipmentAccessPolicy) -> Result<(), BillingError> {
        policy.validate()?;
        self.ensure_currency(&policy)?;
        self.repos.policies.upsert_policy(policy).await?;
        info!("Access policy saved");
        Ok(())
    }

    /// Check every stored policy against the configured currency
    ///
    /// Run at startup so a seed priced in another currency fails fast instead
    /// of on every request. Returns the number of policies checked.
    pub async fn verify_policies(&self) -> Result<usize, BillingError> {
        let policies = self.list_policies().await?;
        for policy in &policies {
            policy.validate()?;
            self.ensure_currency(policy)?;
        }
        Ok(policies.len())
    }

    /// Estimate the charge for reserving `duration_minutes` at `at`
    #[instrument(skip(self))]
    pub async fn estimate(
        &self,
        user_id: &UserId,
        equipment_id: &EquipmentId,
        duration_minutes: u32,
        at: DateTime<Utc>,
    ) -> Result<Option<CostEstimate>, BillingError> {
        if duration_minutes == 0 {
            return Err(BillingError::InvalidDuration);
        }
        let policy = self.checked_policy(equipment_id).await?;
        self.estimate_for(&policy, user_id, duration_minutes, at).await
    }

    /// Check whether a member may reserve the equipment for `duration_minutes`
    #[instrument(skip(self))]
    pub async fn check_access(
        &self,
        user_id: &UserId,
        equipment_id: &EquipmentId,
        duration_minutes: u32,
        at: DateTime<Utc>,
    ) -> Result<ReservationQuote, BillingError> {
        if duration_minutes == 0 {
            return Err(BillingError::InvalidDuration);
        }
        let policy = self.checked_policy(equipment_id).await?;
        let estimate = self
            .estimate_for(&policy, user_id, duration_minutes, at)
            .await?;

        let subscriptions = self.repos.subscriptions.find_subscriptions(user_id).await?;
        let subscription = current_subscription(&subscriptions, at);
        let wallet = self.repos.wallets.find_wallet(user_id).await?;

        let access = check_access(
            &policy,
            subscription,
            wallet.as_ref(),
            estimate.as_ref().map(|e| e.estimated_total),
            at,
        );
        if !access.allowed {
            debug!(
                reason = access.reason.as_deref().unwrap_or_default(),
                required_action = ?access.required_action,
                "Access denied"
            );
        }

        Ok(ReservationQuote { access, estimate })
    }

    /// Bill a completed reservation and add the charge to the day's usage
    #[instrument(skip(self))]
    pub async fn finalize(
        &self,
        user_id: &UserId,
        equipment_id: &EquipmentId,
        planned_minutes: u32,
        actual_minutes: u32,
        at: DateTime<Utc>,
    ) -> Result<Option<ReservationBilling>, BillingError> {
        if planned_minutes == 0 {
            return Err(BillingError::InvalidDuration);
        }
        let policy = self.checked_policy(equipment_id).await?;

        // The subtotal does not depend on earlier usage; the ledger applies the
        // cap against its own running total.
        let Some(uncapped) =
            calculate_final_billing(&policy, planned_minutes, actual_minutes, Decimal::ZERO)
        else {
            return Ok(None);
        };
        let cap = policy.pricing().and_then(|p| p.max_daily_cap);
        let day = self.config.usage_day(at);
        let charge = self
            .repos
            .usage
            .charge(user_id, equipment_id, day, uncapped.subtotal, cap)
            .await?;

        let Some(billing) =
            calculate_final_billing(&policy, planned_minutes, actual_minutes, charge.prior)
        else {
            return Ok(None);
        };
        debug_assert_eq!(billing.total, charge.charged);

        if billing.daily_cap_reached {
            info!(subtotal = %billing.subtotal, total = %billing.total, "Daily cap reached");
        }
        debug!(
            total = %billing.total,
            day_total = %charge.day_total(),
            %day,
            "Reservation billed"
        );

        Ok(Some(billing))
    }

    async fn checked_policy(
        &self,
        equipment_id: &EquipmentId,
    ) -> Result<EquipmentAccessPolicy, BillingError> {
        let policy = self.policy(equipment_id).await?;
        self.ensure_currency(&policy)?;
        Ok(policy)
    }

    async fn estimate_for(
        &self,
        policy: &EquipmentAccessPolicy,
        user_id: &UserId,
        duration_minutes: u32,
        at: DateTime<Utc>,
    ) -> Result<Option<CostEstimate>, BillingError> {
        if policy.pricing().is_none() {
            return Ok(None);
        }
        let day = self.config.usage_day(at);
        let usage_so_far = self
            .repos
            .usage
            .daily_usage(user_id, &policy.equipment_id, day)
            .await?;
        let estimate = estimate_cost(policy, duration_minutes, usage_so_far);
        if estimate.as_ref().is_some_and(|e| e.daily_cap_reached) {
            info!(%usage_so_far, "Estimate clamped by daily cap");
        }
        Ok(estimate)
    }

    fn ensure_currency(&self, policy: &EquipmentAccessPolicy) -> Result<(), BillingError> {
        match policy.pricing() {
            Some(pricing) if pricing.currency != self.config.currency => {
                Err(BillingError::CurrencyMismatch {
                    expected: self.config.currency.clone(),
                    found: pricing.currency.clone(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for BillingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillingService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Subscription to evaluate: an active one if any, else the latest to end
fn current_subscription(
    subscriptions: &[UserSubscription],
    at: DateTime<Utc>,
) -> Option<&UserSubscription> {
    subscriptions
        .iter()
        .find(|s| s.is_active_at(at))
        .or_else(|| subscriptions.iter().max_by_key(|s| s.end_date))
}
