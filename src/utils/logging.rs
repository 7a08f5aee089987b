//! # Structured Logging
//!
//! Installs the process-wide `tracing` subscriber from a [`LoggingConfig`].
//!
//! Console and file outputs are independent layers; either may use JSON
//! formatting. `RUST_LOG` overrides the configured level when set.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::config::LoggingConfig;
use crate::error::{ProtocolError, Result};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Level directive used when `RUST_LOG` is absent.
pub fn level_directive(config: &LoggingConfig) -> String {
    config.log_level.as_str().to_ascii_lowercase()
}

fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_directive(config)))
}

fn console_layer(json: bool) -> BoxedLayer {
    if json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    }
}

fn file_layer(config: &LoggingConfig) -> Result<BoxedLayer> {
    let path = config.log_file_path.as_deref().ok_or_else(|| {
        ProtocolError::ConfigError("log_file_path must be specified when log_to_file is true".into())
    })?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ProtocolError::ConfigError(format!("Failed to open log file {path}: {e}")))?;
    let writer = Mutex::new(file);

    let layer = if config.json_format {
        fmt::layer().json().with_ansi(false).with_writer(writer).boxed()
    } else {
        fmt::layer().with_ansi(false).with_writer(writer).boxed()
    };
    Ok(layer)
}

/// Install the global subscriber.
///
/// # Errors
/// `ConfigError` if the log file cannot be opened or a global subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let mut layers: Vec<BoxedLayer> = Vec::new();
    if config.log_to_console {
        layers.push(console_layer(config.json_format));
    }
    if config.log_to_file {
        layers.push(file_layer(config)?);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter(config))
        .try_init()
        .map_err(|e| ProtocolError::ConfigError(format!("Failed to install subscriber: {e}")))?;

    info!(app = %config.app_name, level = %config.log_level, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn test_level_directive() {
        let mut config = LoggingConfig::default();
        assert_eq!(level_directive(&config), "info");
        config.log_level = Level::TRACE;
        assert_eq!(level_directive(&config), "trace");
    }

    #[test]
    fn test_file_output_requires_path() {
        let config = LoggingConfig {
            log_to_file: true,
            log_file_path: None,
            ..LoggingConfig::default()
        };
        assert!(matches!(file_layer(&config), Err(ProtocolError::ConfigError(_))));
    }
}
