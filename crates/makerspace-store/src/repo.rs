//! Repository traits
//!
//! One async interface per domain. Implementations may be in-memory or
//! backed by a remote service; callers only see these traits.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use makerspace_types::{
    DailyCharge, EquipmentAccessPolicy, EquipmentId, UserId, UserSubscription, UserWallet,
};

use crate::error::StoreResult;
use crate::memory::{
    MemoryPolicyRepository, MemorySubscriptionRepository, MemoryUsageLedger,
    MemoryWalletRepository,
};
use crate::snapshot::Snapshot;

/// Equipment access policy repository
#[async_trait]
pub trait PolicyRepository: Send + Sync {
    /// Find the policy for a piece of equipment
    async fn find_policy(&self, equipment_id: &EquipmentId)
        -> StoreResult<Option<EquipmentAccessPolicy>>;

    /// List all policies, ordered by equipment ID
    async fn list_policies(&self) -> StoreResult<Vec<EquipmentAccessPolicy>>;

    /// Create or replace a policy
    async fn upsert_policy(&self, policy: EquipmentAccessPolicy) -> StoreResult<()>;
}

/// Member subscription repository
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// All subscriptions held by a member, in any status
    async fn find_subscriptions(&self, user_id: &UserId) -> StoreResult<Vec<UserSubscription>>;
}

/// Member wallet repository
#[async_trait]
pub trait WalletRepository: Send + Sync {
    /// Find a member's wallet
    async fn find_wallet(&self, user_id: &UserId) -> StoreResult<Option<UserWallet>>;
}

/// Running total of charges per member, equipment, and day
#[async_trait]
pub trait UsageLedger: Send + Sync {
    /// Total charged so far on `day`
    async fn daily_usage(
        &self,
        user_id: &UserId,
        equipment_id: &EquipmentId,
        day: NaiveDate,
    ) -> StoreResult<Decimal>;

    /// Charge `amount` to `day`, clamped so the day's total never exceeds `cap`
    ///
    /// Reading the prior total and adding the charge happen as one step;
    /// concurrent charges for the same key never both fit under the cap.
    async fn charge(
        &self,
        user_id: &UserId,
        equipment_id: &EquipmentId,
        day: NaiveDate,
        amount: Decimal,
        cap: Option<Decimal>,
    ) -> StoreResult<DailyCharge>;
}

/// All repositories bundled together
#[derive(Clone)]
pub struct Repositories {
    pub policies: Arc<dyn PolicyRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub wallets: Arc<dyn WalletRepository>,
    pub usage: Arc<dyn UsageLedger>,
}

impl Repositories {
    /// Bundle repositories
    pub fn new(
        policies: Arc<dyn PolicyRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        wallets: Arc<dyn WalletRepository>,
        usage: Arc<dyn UsageLedger>,
    ) -> Self {
        Self {
            policies,
            subscriptions,
            wallets,
            usage,
        }
    }

    /// Empty in-memory repositories
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryPolicyRepository::new()),
            Arc::new(MemorySubscriptionRepository::new()),
            Arc::new(MemoryWalletRepository::new()),
            Arc::new(MemoryUsageLedger::new()),
        )
    }

    /// In-memory repositories seeded from a snapshot
    pub fn from_snapshot(snapshot: Snapshot) -> StoreResult<Self> {
        let policies = MemoryPolicyRepository::new();
        for policy in snapshot.policies {
            policies.insert_new(policy)?;
        }

        let subscriptions = MemorySubscriptionRepository::new();
        for subscription in snapshot.subscriptions {
            subscriptions.insert(subscription);
        }

        let wallets = MemoryWalletRepository::new();
        for wallet in snapshot.wallets {
            wallets.insert_new(wallet)?;
        }

        Ok(Self::new(
            Arc::new(policies),
            Arc::new(subscriptions),
            Arc::new(wallets),
            Arc::new(MemoryUsageLedger::new()),
        ))
    }
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repositories").finish_non_exhaustive()
    }
}
