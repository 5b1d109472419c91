//! Makerspace Billing Core - Equipment access and billing logic
//!
//! Decides whether a member may reserve a piece of equipment and what it
//! will cost, then computes the final charge once actual usage is known.
//!
//! The three calculators are pure functions over already-loaded data:
//!
//! - [`estimate_cost`] - grace period, minimum billing, rate, daily cap
//! - [`check_access`] - free / subscription-only / pay-per-use decision table
//! - [`calculate_final_billing`] - actual duration plus overuse penalty, then the cap
//!
//! [`BillingService`] wires them to the repositories.
//!
//! # Example
//!
//! ```rust,ignore
//! use makerspace_billing_core::{BillingConfig, BillingService};
//! use makerspace_store::Repositories;
//!
//! let billing = BillingService::new(Repositories::in_memory(), BillingConfig::default());
//!
//! // Quote a 90 minute reservation
//! let quote = billing.check_access(&user_id, &equipment_id, 90, Utc::now()).await?;
//!
//! // Bill it once the member is done
//! let bill = billing.finalize(&user_id, &equipment_id, 90, 105, Utc::now()).await?;
//! ```

pub mod access;
pub mod config;
pub mod error;
pub mod estimator;
pub mod final_billing;
pub mod service;

pub use access::check_access;
pub use config::BillingConfig;
pub use error::BillingError;
pub use estimator::estimate_cost;
pub use final_billing::calculate_final_billing;
pub use service::{BillingService, ReservationQuote};
