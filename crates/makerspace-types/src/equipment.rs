//! Equipment access policies
//!
//! A policy decides whether a piece of equipment is free, gated behind a
//! subscription, or metered. Pricing only exists on metered equipment, which
//! [`AccessRule`] encodes directly. Configuration uses the flat
//! [`PolicyRecord`] shape and is converted through a validating `TryFrom`, so
//! a malformed policy is rejected when it is loaded.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{round_amount, Currency, PolicyValidationError};

/// Largest price, cap or flat penalty a policy may set
pub const MAX_POLICY_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Largest overuse penalty percentage a policy may set
pub const MAX_PENALTY_PERCENT: Decimal = Decimal::ONE_THOUSAND;

/// Equipment identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EquipmentId(pub String);

impl EquipmentId {
    /// Create a new equipment ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EquipmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EquipmentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// How access to a piece of equipment is granted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessType {
    /// Anyone may use it at no charge
    Free,
    /// Gated behind an active subscription
    SubscriptionOnly,
    /// Metered and charged to the member's wallet
    PayPerUse,
}

impl AccessType {
    /// Get the wire name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::SubscriptionOnly => "subscription_only",
            Self::PayPerUse => "pay_per_use",
        }
    }
}

impl std::fmt::Display for AccessType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unit that `price_per_unit` is quoted in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostUnit {
    /// Price per minute
    Minute,
    /// Price per hour
    Hour,
}

impl CostUnit {
    /// Number of minutes in one unit
    pub const fn minutes(&self) -> u32 {
        match self {
            Self::Minute => 1,
            Self::Hour => 60,
        }
    }
}

impl std::fmt::Display for CostUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Minute => write!(f, "minute"),
            Self::Hour => write!(f, "hour"),
        }
    }
}

/// Pricing for metered equipment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayPerUsePricing {
    /// Price per `cost_unit`
    pub price_per_unit: Decimal,
    /// Unit the price is quoted in
    pub cost_unit: CostUnit,
    /// Currency of every amount on this policy
    pub currency: Currency,
    /// Lower bound on billed minutes
    pub minimum_billing_minutes: u32,
    /// Initial minutes excluded from billing
    pub grace_period_minutes: u32,
    /// Maximum charge per member per day
    pub max_daily_cap: Option<Decimal>,
    /// Flat penalty added when a reservation runs over
    pub overuse_penalty_flat: Option<Decimal>,
    /// Percentage of the base cost added when a reservation runs over
    pub overuse_penalty_percent: Option<Decimal>,
}

impl PayPerUsePricing {
    /// Create pricing with no grace period, minimum, cap, or penalty
    pub fn new(price_per_unit: Decimal, cost_unit: CostUnit) -> Self {
        Self {
            price_per_unit,
            cost_unit,
            currency: Currency::default(),
            minimum_billing_minutes: 0,
            grace_period_minutes: 0,
            max_daily_cap: None,
            overuse_penalty_flat: None,
            overuse_penalty_percent: None,
        }
    }

    /// Set the currency
    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    /// Set the minimum billed minutes
    pub fn with_minimum_billing(mut self, minutes: u32) -> Self {
        self.minimum_billing_minutes = minutes;
        self
    }

    /// Set the grace period
    pub fn with_grace_period(mut self, minutes: u32) -> Self {
        self.grace_period_minutes = minutes;
        self
    }

    /// Set the daily cap
    pub fn with_daily_cap(mut self, cap: Decimal) -> Self {
        self.max_daily_cap = Some(cap);
        self
    }

    /// Set the overuse penalty components
    pub fn with_overuse_penalty(mut self, flat: Option<Decimal>, percent: Option<Decimal>) -> Self {
        self.overuse_penalty_flat = flat;
        self.overuse_penalty_percent = percent;
        self
    }

    /// Price of a single minute
    pub fn rate_per_minute(&self) -> Decimal {
        self.price_per_unit / Decimal::from(self.cost_unit.minutes())
    }

    /// Cost of `billed_minutes`, rounded to two decimals
    ///
    /// The price is multiplied before dividing by the unit length, so rounding
    /// happens exactly once.
    pub fn cost_for_minutes(&self, billed_minutes: u32) -> Decimal {
        round_amount(
            self.price_per_unit * Decimal::from(billed_minutes)
                / Decimal::from(self.cost_unit.minutes()),
        )
    }

    fn validate(&self) -> Result<(), PolicyValidationError> {
        let amounts = [
            ("price_per_unit", Some(self.price_per_unit), MAX_POLICY_AMOUNT),
            ("max_daily_cap", self.max_daily_cap, MAX_POLICY_AMOUNT),
            ("overuse_penalty_flat", self.overuse_penalty_flat, MAX_POLICY_AMOUNT),
            ("overuse_penalty_percent", self.overuse_penalty_percent, MAX_PENALTY_PERCENT),
        ];
        for (field, value, max) in amounts {
            match value {
                Some(v) if v < Decimal::ZERO => {
                    return Err(PolicyValidationError::Negative(field));
                }
                Some(v) if v > max => {
                    return Err(PolicyValidationError::TooLarge { field, max });
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Access rule of a policy; pricing only exists on metered equipment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessRule {
    /// Free to use
    Free,
    /// Requires an active subscription when membership is required
    SubscriptionOnly,
    /// Metered
    PayPerUse(PayPerUsePricing),
}

impl AccessRule {
    /// Get the access type
    pub const fn access_type(&self) -> AccessType {
        match self {
            Self::Free => AccessType::Free,
            Self::SubscriptionOnly => AccessType::SubscriptionOnly,
            Self::PayPerUse(_) => AccessType::PayPerUse,
        }
    }

    /// Get pricing, if metered
    pub const fn pricing(&self) -> Option<&PayPerUsePricing> {
        match self {
            Self::PayPerUse(pricing) => Some(pricing),
            Self::Free | Self::SubscriptionOnly => None,
        }
    }
}

/// Per-equipment access policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PolicyRecord", into = "PolicyRecord")]
pub struct EquipmentAccessPolicy {
    /// Equipment this policy applies to
    pub equipment_id: EquipmentId,
    /// Display name
    pub name: Option<String>,
    /// Whether an active subscription is required
    pub membership_required: bool,
    /// Access rule and pricing
    pub rule: AccessRule,
}

impl EquipmentAccessPolicy {
    /// Free equipment
    pub fn free(equipment_id: impl Into<EquipmentId>) -> Self {
        Self::with_rule(equipment_id, AccessRule::Free)
    }

    /// Subscription-gated equipment
    pub fn subscription_only(equipment_id: impl Into<EquipmentId>) -> Self {
        Self::with_rule(equipment_id, AccessRule::SubscriptionOnly)
    }

    /// Metered equipment
    pub fn pay_per_use(equipment_id: impl Into<EquipmentId>, pricing: PayPerUsePricing) -> Self {
        Self::with_rule(equipment_id, AccessRule::PayPerUse(pricing))
    }

    fn with_rule(equipment_id: impl Into<EquipmentId>, rule: AccessRule) -> Self {
        Self {
            equipment_id: equipment_id.into(),
            name: None,
            membership_required: false,
            rule,
        }
    }

    /// Set whether membership is required
    pub fn with_membership_required(mut self, required: bool) -> Self {
        self.membership_required = required;
        self
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Get the access type
    pub const fn access_type(&self) -> AccessType {
        self.rule.access_type()
    }

    /// Get pricing, if metered
    pub const fn pricing(&self) -> Option<&PayPerUsePricing> {
        self.rule.pricing()
    }

    /// Check the invariants that the type system does not already carry
    pub fn validate(&self) -> Result<(), PolicyValidationError> {
        if self.equipment_id.as_str().trim().is_empty() {
            return Err(PolicyValidationError::EmptyEquipmentId);
        }
        match &self.rule {
            AccessRule::PayPerUse(pricing) => pricing.validate(),
            AccessRule::Free | AccessRule::SubscriptionOnly => Ok(()),
        }
    }
}

impl From<EquipmentId> for String {
    fn from(id: EquipmentId) -> Self {
        id.0
    }
}

impl From<String> for EquipmentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Flat configuration shape of an access policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyRecord {
    pub equipment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub access_type: AccessType,
    #[serde(default)]
    pub membership_required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_per_unit: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_unit: Option<CostUnit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_billing_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_period_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_daily_cap: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overuse_penalty_flat: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overuse_penalty_percent: Option<Decimal>,
}

impl PolicyRecord {
    /// Name of the first pricing field that is set, if any
    fn first_pricing_field(&self) -> Option<&'static str> {
        [
            ("price_per_unit", self.price_per_unit.is_some()),
            ("cost_unit", self.cost_unit.is_some()),
            ("currency", self.currency.is_some()),
            ("minimum_billing_time", self.minimum_billing_time.is_some()),
            ("grace_period_minutes", self.grace_period_minutes.is_some()),
            ("max_daily_cap", self.max_daily_cap.is_some()),
            ("overuse_penalty_flat", self.overuse_penalty_flat.is_some()),
            ("overuse_penalty_percent", self.overuse_penalty_percent.is_some()),
        ]
        .into_iter()
        .find_map(|(field, set)| set.then_some(field))
    }
}

impl TryFrom<PolicyRecord> for EquipmentAccessPolicy {
    type Error = PolicyValidationError;

    fn try_from(record: PolicyRecord) -> Result<Self, Self::Error> {
        let rule = match record.access_type {
            AccessType::Free | AccessType::SubscriptionOnly => {
                if let Some(field) = record.first_pricing_field() {
                    return Err(PolicyValidationError::UnexpectedPricing {
                        access_type: record.access_type,
                        field,
                    });
                }
                if record.access_type == AccessType::Free {
                    AccessRule::Free
                } else {
                    AccessRule::SubscriptionOnly
                }
            }
            AccessType::PayPerUse => {
                let price_per_unit = record
                    .price_per_unit
                    .ok_or(PolicyValidationError::MissingField("price_per_unit"))?;
                let cost_unit = record
                    .cost_unit
                    .ok_or(PolicyValidationError::MissingField("cost_unit"))?;
                let currency = match record.currency.as_deref() {
                    Some(code) => Currency::new(code)?,
                    None => Currency::default(),
                };
                AccessRule::PayPerUse(PayPerUsePricing {
                    price_per_unit,
                    cost_unit,
                    currency,
                    minimum_billing_minutes: record.minimum_billing_time.unwrap_or(0),
                    grace_period_minutes: record.grace_period_minutes.unwrap_or(0),
                    max_daily_cap: record.max_daily_cap,
                    overuse_penalty_flat: record.overuse_penalty_flat,
                    overuse_penalty_percent: record.overuse_penalty_percent,
                })
            }
        };

        let policy = Self {
            equipment_id: EquipmentId(record.equipment_id),
            name: record.name,
            membership_required: record.membership_required,
            rule,
        };
        policy.validate()?;
        Ok(policy)
    }
}

impl From<EquipmentAccessPolicy> for PolicyRecord {
    fn from(policy: EquipmentAccessPolicy) -> Self {
        let access_type = policy.access_type();
        let mut record = Self {
            equipment_id: policy.equipment_id.into(),
            name: policy.name,
            access_type,
            membership_required: policy.membership_required,
            price_per_unit: None,
            cost_unit: None,
            currency: None,
            minimum_billing_time: None,
            grace_period_minutes: None,
            max_daily_cap: None,
            overuse_penalty_flat: None,
            overuse_penalty_percent: None,
        };
        if let AccessRule::PayPerUse(pricing) = policy.rule {
            record.price_per_unit = Some(pricing.price_per_unit);
            record.cost_unit = Some(pricing.cost_unit);
            record.currency = Some(pricing.currency.into());
            record.minimum_billing_time = Some(pricing.minimum_billing_minutes);
            record.grace_period_minutes = Some(pricing.grace_period_minutes);
            record.max_daily_cap = pricing.max_daily_cap;
            record.overuse_penalty_flat = pricing.overuse_penalty_flat;
            record.overuse_penalty_percent = pricing.overuse_penalty_percent;
        }
        record
    }
}
