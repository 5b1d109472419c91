//! Access decision types

use serde::{Deserialize, Serialize};

/// What a member must do before a denied reservation can go ahead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredAction {
    /// Start or renew a subscription
    UpgradeSubscription,
    /// Top up the wallet
    AddFunds,
}

/// Result of an access check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCheckResult {
    /// Whether access is allowed
    pub allowed: bool,
    /// Reason if denied
    pub reason: Option<String>,
    /// Action that would lift the denial
    pub required_action: Option<RequiredAction>,
}

impl AccessCheckResult {
    /// Access granted
    pub fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
            required_action: None,
        }
    }

    /// Access denied
    pub fn denied(required_action: RequiredAction, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            required_action: Some(required_action),
        }
    }
}
