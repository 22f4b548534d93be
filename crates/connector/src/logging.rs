//! Tracing subscriber setup.

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use jakamo_core::config::{LogFormat, LoggingConfig};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Default filter directives for a configured level.
pub fn default_directives(level: &str) -> String {
    format!("{},reqwest=warn,hyper=warn", level.to_lowercase())
}

/// Install the global subscriber: stdout, plus a daily rolling file when
/// file logging is enabled.
///
/// `RUST_LOG` takes precedence over the configured level. The returned guard
/// flushes the file writer on drop and must be held until exit.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));

    let mut layers: Vec<BoxedLayer> = vec![stdout_layer(config.log_format)];

    let guard = if config.enable_file_logging {
        let (layer, guard) = file_layer(&config.log_file, config.log_format)?;
        layers.push(layer);
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

fn stdout_layer(format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Text => tracing_subscriber::fmt::layer().boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
    }
}

fn file_layer(log_file: &Path, format: LogFormat) -> Result<(BoxedLayer, WorkerGuard)> {
    let (dir, prefix) = split_log_path(log_file)?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {:?}", dir))?;

    let appender = tracing_appender::rolling::daily(dir, prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = match format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(writer)
            .boxed(),
    };
    Ok((layer, guard))
}

/// Directory and file name prefix for the rolling appender.
fn split_log_path(log_file: &Path) -> Result<(&Path, &std::ffi::OsStr)> {
    let prefix = log_file
        .file_name()
        .with_context(|| format!("Log file path has no file name: {:?}", log_file))?;
    let dir = match log_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Ok((dir, prefix))
}
