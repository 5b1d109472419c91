//! Makerspace Utils - helpers shared by the services

pub mod config;

pub use config::load_env;
