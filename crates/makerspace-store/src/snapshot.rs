//! JSON snapshot used to seed the in-memory store
//!
//! ```json
//! {
//!   "policies": [{ "equipment_id": "laser-cutter-1", "access_type": "pay_per_use", ... }],
//!   "subscriptions": [{ "user_id": "...", "plan_name": "Maker Monthly", ... }],
//!   "wallets": [{ "user_id": "...", "balance": "500.00", "currency": "INR" }]
//! }
//! ```
//!
//! Policies and wallets are validated while deserializing, so a snapshot
//! with a malformed policy fails to load.

use std::path::Path;

use serde::Deserialize;

use makerspace_types::{EquipmentAccessPolicy, UserSubscription, UserWallet};

use crate::error::{StoreError, StoreResult};

/// Store contents loaded from JSON
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    /// Equipment access policies
    #[serde(default)]
    pub policies: Vec<EquipmentAccessPolicy>,
    /// Member subscriptions
    #[serde(default)]
    pub subscriptions: Vec<UserSubscription>,
    /// Member wallets
    #[serde(default)]
    pub wallets: Vec<UserWallet>,
}

impl Snapshot {
    /// Parse a snapshot from a JSON string
    pub fn from_json(json: &str) -> StoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a snapshot file
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let snapshot = Self::from_json(&json)?;
        tracing::debug!(
            path = %path.display(),
            policies = snapshot.policies.len(),
            subscriptions = snapshot.subscriptions.len(),
            wallets = snapshot.wallets.len(),
            "Loaded store snapshot"
        );
        Ok(snapshot)
    }
}
