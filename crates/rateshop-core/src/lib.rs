//! Shared foundation for the rateshop workspace: application configuration,
//! canonical rate shapes, and the comparative-analysis math.
//!
//! Everything here is pure (no I/O beyond reading env vars in [`config`]), so
//! the import pipeline, both store backends, the HTTP service, and the CLI
//! can all agree on one set of domain types.

use thiserror::Error;

pub mod analysis;
pub mod app_config;
pub mod config;
pub mod rates;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use rates::{
    ImportStatus, NormalizedRate, DEFAULT_CHANNEL, DEFAULT_CURRENCY, DEFAULT_ROOM_TYPE,
    MAX_PRICE_EXCLUSIVE, MAX_REPORTED_ROW_ERRORS,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
