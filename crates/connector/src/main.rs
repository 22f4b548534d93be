mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

use jakamo_core::config::default_config_paths;
use jakamo_core::{
    find_config, load_config, validate_config, Config, ConnectorService,
    HttpPurchaseOrderClient, Mailbox, PurchaseOrderClient, SanitizedConfig,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable naming the config file.
const CONFIG_ENV: &str = "JAKAMO_CONFIG";

#[tokio::main]
async fn main() {
    // Logging is configured from the file, so config errors go to stderr.
    let config = match load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Fatal error: {:#}", e);
            std::process::exit(1);
        }
    };

    let _log_guard = match logging::init(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Fatal error: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config).await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

/// Find, load and validate the configuration.
fn load() -> Result<Config> {
    let explicit = std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .or_else(|| std::env::args_os().nth(1).map(PathBuf::from));

    let config_path = find_config(explicit, &default_config_paths())
        .context("Failed to locate configuration file")?;

    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    Ok(config)
}

async fn run(config: Config) -> Result<()> {
    info!("Starting jakamo-connector v{}", VERSION);

    let sanitized = SanitizedConfig::from(&config);
    match serde_json::to_string(&sanitized) {
        Ok(json) => info!("Configuration: {}", json),
        Err(e) => warn!("Failed to serialize configuration for logging: {}", e),
    }
    warn!(
        "max_retry_attempts = {} is reserved and not used by the poll loops",
        config.polling.max_retry_attempts
    );

    let client: Arc<dyn PurchaseOrderClient> = Arc::new(
        HttpPurchaseOrderClient::new(config.api.clone())
            .context("Failed to create purchase order client")?,
    );
    info!("Using purchase order client: {}", client.name());

    let mailbox = Mailbox::new(config.folders.clone());
    mailbox
        .ensure_directories()
        .await
        .context("Failed to create mailbox folders")?;
    info!("Mailbox folders ready");

    let service = ConnectorService::from_parts(mailbox, client, &config.polling);
    service.start().await;

    shutdown_signal().await;
    info!("Shutdown signal received");

    service.stop().await;
    info!("jakamo-connector stopped");

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
