use std::path::Path;

use super::{types::Config, ConfigError};

/// Shortest poll interval either loop accepts.
pub const MIN_POLL_INTERVAL_SECS: u64 = 5;

const PLACEHOLDERS: &[(&str, &str)] = &[
    ("api.tenant_id", "YOUR_TENANT_ID_HERE"),
    ("api.client_id", "YOUR_CLIENT_ID_HERE"),
    ("api.client_secret", "YOUR_CLIENT_SECRET_HERE"),
];

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate configuration.
///
/// Every problem found is reported in a single `ValidationError`, so a broken
/// config file can be fixed in one go.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    let api = &config.api;
    let required = [
        ("api.base_url", &api.base_url),
        ("api.tenant_id", &api.tenant_id),
        ("api.client_id", &api.client_id),
        ("api.client_secret", &api.client_secret),
        ("api.api_scope", &api.api_scope),
    ];
    for (key, value) in required {
        if value.trim().is_empty() {
            errors.push(format!("{} is required", key));
        }
    }

    let values = [
        ("api.tenant_id", &api.tenant_id),
        ("api.client_id", &api.client_id),
        ("api.client_secret", &api.client_secret),
    ];
    for ((key, value), (_, placeholder)) in values.iter().zip(PLACEHOLDERS) {
        if value.as_str() == *placeholder {
            errors.push(format!("{} must be changed from its default value", key));
        }
    }

    if !api.base_url.trim().is_empty()
        && !(api.base_url.starts_with("https://") || api.base_url.starts_with("http://"))
    {
        errors.push("api.base_url must be an http(s) URL".to_string());
    }

    if api.timeout_secs == 0 {
        errors.push("api.timeout_secs cannot be 0".to_string());
    }

    let polling = &config.polling;
    if polling.inbound_check_interval_secs < MIN_POLL_INTERVAL_SECS {
        errors.push(format!(
            "polling.inbound_check_interval_secs must be at least {} seconds",
            MIN_POLL_INTERVAL_SECS
        ));
    }
    if polling.response_check_interval_secs < MIN_POLL_INTERVAL_SECS {
        errors.push(format!(
            "polling.response_check_interval_secs must be at least {} seconds",
            MIN_POLL_INTERVAL_SECS
        ));
    }
    if polling.max_retry_attempts == 0 {
        errors.push("polling.max_retry_attempts must be at least 1".to_string());
    }

    let folders = [
        ("folders.inbound_orders", config.folders.inbound_orders.as_path()),
        ("folders.processed_orders", config.folders.processed_orders.as_path()),
        ("folders.failed_orders", config.folders.failed_orders.as_path()),
        ("folders.order_responses", config.folders.order_responses.as_path()),
    ];
    for (key, path) in folders {
        if path.as_os_str().is_empty() {
            errors.push(format!("{} is required", key));
        }
    }
    for (i, (key_a, path_a)) in folders.iter().enumerate() {
        for (key_b, path_b) in &folders[i + 1..] {
            if !path_a.as_os_str().is_empty() && same_path(path_a, path_b) {
                errors.push(format!("{} and {} must be different folders", key_a, key_b));
            }
        }
    }

    let level = config.logging.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(format!(
            "logging.log_level must be one of {}",
            LOG_LEVELS.join(", ")
        ));
    }
    if config.logging.enable_file_logging && config.logging.log_file.file_name().is_none() {
        errors.push("logging.log_file must name a file".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors))
    }
}

fn same_path(a: &Path, b: &Path) -> bool {
    a.components().eq(b.components())
}
