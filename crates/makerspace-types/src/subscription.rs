//! Member subscription types

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Subscription status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Subscription is active
    Active,
    /// Subscription ran past its end date
    Expired,
    /// Subscription was cancelled
    Cancelled,
}

/// Member subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSubscription {
    /// Member who owns the subscription
    pub user_id: UserId,
    /// Plan name (e.g., "Maker Monthly")
    pub plan_name: String,
    /// Subscription status
    pub status: SubscriptionStatus,
    /// Start of the subscription period
    pub start_date: DateTime<Utc>,
    /// End of the subscription period
    pub end_date: DateTime<Utc>,
    /// Equipment types covered by the plan
    #[serde(default)]
    pub included_equipment_types: BTreeSet<String>,
}

impl UserSubscription {
    /// Whether the subscription grants access at `at`
    ///
    /// Only an `active` subscription whose period contains `at` counts; the
    /// period bounds are inclusive.
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && self.start_date <= at && at <= self.end_date
    }
}
