//! Makerspace Store - Repository abstractions
//!
//! Typed repository traits for the data the billing evaluator reads
//! (policies, subscriptions, wallets) and the per-day usage ledger it
//! accumulates into, plus an in-memory implementation that can be seeded
//! from a JSON snapshot.
//!
//! # Example
//!
//! ```rust,ignore
//! use makerspace_store::{Repositories, Snapshot};
//!
//! let snapshot = Snapshot::load("data/makerspace.json")?;
//! let repos = Repositories::from_snapshot(snapshot)?;
//!
//! let policy = repos.policies.find_policy(&"laser-cutter-1".into()).await?;
//! ```

pub mod error;
pub mod memory;
pub mod repo;
pub mod snapshot;

pub use error::{StoreError, StoreResult};
pub use memory::{
    MemoryPolicyRepository, MemorySubscriptionRepository, MemoryUsageLedger,
    MemoryWalletRepository,
};
pub use repo::*;
pub use snapshot::Snapshot;
