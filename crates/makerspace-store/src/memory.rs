//! In-memory repository implementations

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;

use makerspace_types::{
    DailyCharge, EquipmentAccessPolicy, EquipmentId, UserId, UserSubscription, UserWallet,
};

use crate::error::{StoreError, StoreResult};
use crate::repo::{PolicyRepository, SubscriptionRepository, UsageLedger, WalletRepository};

/// In-memory policy repository
#[derive(Default, Clone)]
pub struct MemoryPolicyRepository {
    policies: Arc<DashMap<EquipmentId, EquipmentAccessPolicy>>,
}

impl MemoryPolicyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a policy, failing if the equipment already has one
    pub fn insert_new(&self, policy: EquipmentAccessPolicy) -> StoreResult<()> {
        match self.policies.entry(policy.equipment_id.clone()) {
            Entry::Occupied(entry) => Err(StoreError::DuplicatePolicy(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(policy);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl PolicyRepository for MemoryPolicyRepository {
    async fn find_policy(
        &self,
        equipment_id: &EquipmentId,
    ) -> StoreResult<Option<EquipmentAccessPolicy>> {
        Ok(self.policies.get(equipment_id).map(|r| r.value().clone()))
    }

    async fn list_policies(&self) -> StoreResult<Vec<EquipmentAccessPolicy>> {
        let mut policies: Vec<_> = self.policies.iter().map(|r| r.value().clone()).collect();
        policies.sort_by(|a, b| a.equipment_id.cmp(&b.equipment_id));
        Ok(policies)
    }

    async fn upsert_policy(&self, policy: EquipmentAccessPolicy) -> StoreResult<()> {
        tracing::debug!(equipment_id = %policy.equipment_id, "Upserting access policy");
        self.policies.insert(policy.equipment_id.clone(), policy);
        Ok(())
    }
}

/// In-memory subscription repository
#[derive(Default, Clone)]
pub struct MemorySubscriptionRepository {
    subscriptions: Arc<DashMap<UserId, Vec<UserSubscription>>>,
}

impl MemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscription to its owner's history
    pub fn insert(&self, subscription: UserSubscription) {
        self.subscriptions
            .entry(subscription.user_id)
            .or_default()
            .push(subscription);
    }
}

#[async_trait]
impl SubscriptionRepository for MemorySubscriptionRepository {
    async fn find_subscriptions(&self, user_id: &UserId) -> StoreResult<Vec<UserSubscription>> {
        Ok(self
            .subscriptions
            .get(user_id)
            .map(|r| r.value().clone())
            .unwrap_or_default())
    }
}

/// In-memory wallet repository
#[derive(Default, Clone)]
pub struct MemoryWalletRepository {
    wallets: Arc<DashMap<UserId, UserWallet>>,
}

impl MemoryWalletRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a wallet
    pub fn insert(&self, wallet: UserWallet) {
        self.wallets.insert(wallet.user_id(), wallet);
    }

    /// Insert a wallet, failing if the user already has one
    pub fn insert_new(&self, wallet: UserWallet) -> StoreResult<()> {
        match self.wallets.entry(wallet.user_id()) {
            Entry::Occupied(entry) => Err(StoreError::DuplicateWallet(*entry.key())),
            Entry::Vacant(entry) => {
                entry.insert(wallet);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl WalletRepository for MemoryWalletRepository {
    async fn find_wallet(&self, user_id: &UserId) -> StoreResult<Option<UserWallet>> {
        Ok(self.wallets.get(user_id).map(|r| r.value().clone()))
    }
}

type UsageKey = (UserId, EquipmentId, NaiveDate);

/// In-memory usage ledger
///
/// Only the latest usage day is kept; older days are dropped on the next
/// charge.
#[derive(Default, Clone)]
pub struct MemoryUsageLedger {
    totals: Arc<DashMap<UsageKey, Decimal>>,
}

impl MemoryUsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of (member, equipment, day) totals held
    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    fn prune_before(&self, day: NaiveDate) {
        self.totals.retain(|(_, _, d), _| *d >= day);
    }
}

#[async_trait]
impl UsageLedger for MemoryUsageLedger {
    async fn daily_usage(
        &self,
        user_id: &UserId,
        equipment_id: &EquipmentId,
        day: NaiveDate,
    ) -> StoreResult<Decimal> {
        let key = (*user_id, equipment_id.clone(), day);
        Ok(self.totals.get(&key).map_or(Decimal::ZERO, |r| *r.value()))
    }

    async fn charge(
        &self,
        user_id: &UserId,
        equipment_id: &EquipmentId,
        day: NaiveDate,
        amount: Decimal,
        cap: Option<Decimal>,
    ) -> StoreResult<DailyCharge> {
        // Must run before taking the entry guard; retain locks every shard.
        self.prune_before(day);

        let key = (*user_id, equipment_id.clone(), day);
        // The entry guard holds the shard lock across the cap check and the add.
        let mut total = self.totals.entry(key).or_insert(Decimal::ZERO);
        let charge = DailyCharge::apply(cap, *total, amount);
        *total = charge.day_total();
        Ok(charge)
    }
}
