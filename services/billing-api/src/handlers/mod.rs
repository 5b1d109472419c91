//! REST API handlers

pub mod billing;
pub mod health;
pub mod policy;
pub mod shared;

pub use billing::*;
pub use health::*;
pub use policy::*;
