//! SoulScout CLI library
//!
//! Exposes configuration loading for integration testing

pub mod config;

pub use config::{OracleProvider, SoulScoutConfig};
