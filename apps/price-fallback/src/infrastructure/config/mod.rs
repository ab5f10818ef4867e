//! Configuration Module
//!
//! Configuration loading for the price fallback service.

mod settings;

pub use settings::{ConfigError, EndpointSettings, FallbackConfig, TimingSettings};
