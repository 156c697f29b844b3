//! Settings and configuration module
//!
//! Provides unified configuration with:
//! - Builder pattern
//! - TOML/JSON loading
//! - Environment overrides for the server binary

pub mod probe_config;

pub use probe_config::{ConfigError, ProbeConfig, ProbeConfigBuilder};
