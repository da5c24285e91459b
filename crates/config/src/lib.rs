//! Configuration for the sales call engine
//!
//! Layered settings: `config/default.yaml`, an optional per-environment
//! file, then environment variables with the `SALESCALL__` prefix.

pub mod settings;

pub use settings::{
    load_settings, AudioConfig, CompanyConfig, LlmConfig, ObservabilityConfig, RetrievalConfig,
    SessionConfig, Settings,
};

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// Initialize process-wide tracing from the observability settings
pub fn init_tracing(observability: &ObservabilityConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(observability.log_level.clone()));

    if observability.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
