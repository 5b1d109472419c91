//! Makerspace Types - Shared domain types
//!
//! This crate contains domain types used across the makerspace billing crates:
//! - Equipment access policies and pay-per-use pricing
//! - Member subscriptions and wallets
//! - Cost estimates, access decisions, and reservation billing records

pub mod access;
pub mod billing;
pub mod equipment;
pub mod error;
pub mod money;
pub mod subscription;
pub mod user;
pub mod wallet;

pub use access::*;
pub use billing::*;
pub use equipment::*;
pub use error::*;
pub use money::*;
pub use subscription::*;
pub use user::*;
pub use wallet::*;
