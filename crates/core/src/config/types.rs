use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub folders: FolderConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote purchase order API and OAuth2 client credentials
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// API root, e.g. "https://api.jakamo.net/v1/"
    pub base_url: String,
    /// Token endpoint override. Defaults to the Microsoft identity platform
    /// endpoint of `tenant_id`.
    #[serde(default)]
    pub token_url: Option<String>,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub api_scope: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl ApiConfig {
    /// Token endpoint used for the client credentials grant.
    pub fn token_endpoint(&self) -> String {
        match &self.token_url {
            Some(url) if !url.trim().is_empty() => url.clone(),
            _ => format!(
                "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
                self.tenant_id
            ),
        }
    }
}

fn default_timeout() -> u32 {
    30
}

/// The four mailbox folders
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FolderConfig {
    #[serde(default = "default_inbound")]
    pub inbound_orders: PathBuf,
    #[serde(default = "default_processed")]
    pub processed_orders: PathBuf,
    #[serde(default = "default_failed")]
    pub failed_orders: PathBuf,
    #[serde(default = "default_responses")]
    pub order_responses: PathBuf,
}

impl Default for FolderConfig {
    fn default() -> Self {
        Self {
            inbound_orders: default_inbound(),
            processed_orders: default_processed(),
            failed_orders: default_failed(),
            order_responses: default_responses(),
        }
    }
}

fn default_inbound() -> PathBuf {
    PathBuf::from("/var/lib/jakamo/inbound")
}

fn default_processed() -> PathBuf {
    PathBuf::from("/var/lib/jakamo/processed")
}

fn default_failed() -> PathBuf {
    PathBuf::from("/var/lib/jakamo/failed")
}

fn default_responses() -> PathBuf {
    PathBuf::from("/var/lib/jakamo/responses")
}

/// Poll loop timing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingConfig {
    /// Seconds between inbound folder sweeps (minimum 5)
    #[serde(default = "default_inbound_interval")]
    pub inbound_check_interval_secs: u64,
    /// Seconds between response queue drains (minimum 5)
    #[serde(default = "default_response_interval")]
    pub response_check_interval_secs: u64,
    /// Reserved. Validated and reported, not consumed by the poll loops.
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
}

impl PollingConfig {
    pub fn inbound_interval(&self) -> Duration {
        Duration::from_secs(self.inbound_check_interval_secs)
    }

    pub fn response_interval(&self) -> Duration {
        Duration::from_secs(self.response_check_interval_secs)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            inbound_check_interval_secs: default_inbound_interval(),
            response_check_interval_secs: default_response_interval(),
            max_retry_attempts: default_max_retry_attempts(),
        }
    }
}

fn default_inbound_interval() -> u64 {
    30
}

fn default_response_interval() -> u64 {
    60
}

fn default_max_retry_attempts() -> u32 {
    3
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub enable_file_logging: bool,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    /// One of trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_file_logging: default_true(),
            log_file: default_log_file(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_log_file() -> PathBuf {
    PathBuf::from("/var/log/jakamo/connector.log")
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Sanitized config for startup logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub api: SanitizedApiConfig,
    pub folders: FolderConfig,
    pub polling: PollingConfig,
    pub logging: LoggingConfig,
}

/// Sanitized API config (client secret masked)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedApiConfig {
    pub base_url: String,
    pub token_url: String,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub api_scope: String,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            api: SanitizedApiConfig {
                base_url: config.api.base_url.clone(),
                token_url: config.api.token_endpoint(),
                tenant_id: config.api.tenant_id.clone(),
                client_id: config.api.client_id.clone(),
                client_secret: mask_secret(&config.api.client_secret),
                api_scope: config.api.api_scope.clone(),
                timeout_secs: config.api.timeout_secs,
            },
            folders: config.folders.clone(),
            polling: config.polling.clone(),
            logging: config.logging.clone(),
        }
    }
}

/// Masks a secret, keeping the first and last four characters of long values.
pub fn mask_secret(secret: &str) -> String {
    if secret.trim().is_empty() {
        return "[empty]".to_string();
    }

    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }

    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[api]
base_url = "https://api.example.test/v1/"
tenant_id = "tenant"
client_id = "client"
client_secret = "super-secret-value"
api_scope = "api://jakamo/.default"
"#;

    #[test]
    fn test_deserialize_minimal_uses_defaults() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.polling.inbound_check_interval_secs, 30);
        assert_eq!(config.polling.response_check_interval_secs, 60);
        assert_eq!(config.polling.max_retry_attempts, 3);
        assert_eq!(
            config.folders.inbound_orders,
            PathBuf::from("/var/lib/jakamo/inbound")
        );
        assert!(config.logging.enable_file_logging);
        assert_eq!(config.logging.log_level, "info");
        assert_eq!(config.logging.log_format, LogFormat::Text);
    }

    #[test]
    fn test_deserialize_missing_api_fails() {
        let toml = r#"
[polling]
inbound_check_interval_secs = 10
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_custom_folders_and_polling() {
        let toml = format!(
            "{}\n{}",
            MINIMAL,
            r#"
[folders]
inbound_orders = "/data/in"
processed_orders = "/data/done"
failed_orders = "/data/failed"
order_responses = "/data/out"

[polling]
inbound_check_interval_secs = 5
response_check_interval_secs = 120
max_retry_attempts = 1

[logging]
log_format = "json"
"#
        );
        let config: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.folders.order_responses, PathBuf::from("/data/out"));
        assert_eq!(config.polling.inbound_interval(), Duration::from_secs(5));
        assert_eq!(config.polling.response_interval(), Duration::from_secs(120));
        assert_eq!(config.logging.log_format, LogFormat::Json);
    }

    #[test]
    fn test_token_endpoint_defaults_to_tenant() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(
            config.api.token_endpoint(),
            "https://login.microsoftonline.com/tenant/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_sanitized_config_masks_secret() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.api.client_secret, "supe...alue");
        assert_eq!(sanitized.api.client_id, "client");
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "[empty]");
        assert_eq!(mask_secret("   "), "[empty]");
        assert_eq!(mask_secret("short"), "****");
        assert_eq!(mask_secret("12345678"), "****");
        assert_eq!(mask_secret("123456789"), "1234...6789");
    }
}
