mod loader;
mod types;
mod validate;

pub use loader::{default_config_paths, find_config, load_config, load_config_from_str};
pub use types::*;
pub use validate::{validate_config, MIN_POLL_INTERVAL_SECS};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {}", .0.join("; "))]
    ValidationError(Vec<String>),
}
