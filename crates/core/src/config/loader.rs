use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

use super::{types::Config, ConfigError};

/// Locations searched when no explicit config path is given, in order.
pub fn default_config_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/etc/jakamo-connector/jakamo-connector.toml"),
        PathBuf::from("jakamo-connector.toml"),
    ]
}

/// Resolve the config file: the explicit path if given, otherwise the first
/// existing candidate.
pub fn find_config(
    explicit: Option<PathBuf>,
    candidates: &[PathBuf],
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    candidates
        .iter()
        .find(|path| path.exists())
        .cloned()
        .ok_or_else(|| {
            let searched: Vec<String> = candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            ConfigError::FileNotFound(format!("searched {}", searched.join(", ")))
        })
}

/// Load configuration from file with environment variable overrides.
///
/// Environment variables use the `JAKAMO_` prefix and `__` between sections,
/// e.g. `JAKAMO_API__CLIENT_SECRET`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("JAKAMO_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
