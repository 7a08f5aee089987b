//! # Configuration Management
//!
//! Centralized configuration for the transport core.
//!
//! Groups the tunables of every layer: datagram sizing, per-connection
//! reliability limits and timeouts, quantization, and logging.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides (`GAMEWIRE_*`) via `from_env()`
//!
//! Every field has a default matching the wire constants, so a partial TOML
//! document only needs the values it changes.

use crate::core::buffer::{BUFFER_CAPACITY, MTU};
use crate::core::quantize::DEFAULT_CHUNK_SIZE;
use crate::error::{ProtocolError, Result};
use crate::protocol::window::WINDOW_SIZE;
use crate::utils::crypto::CipherBackend;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Countdown a new connection starts with
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(120);

/// Any inbound packet raises the countdown to at least this much
pub const DEFAULT_RECEIVE_TIMEOUT_FLOOR: Duration = Duration::from_secs(15);

/// Out-of-order reliable packets held before the peer is dropped
pub const DEFAULT_REORDER_LIMIT: usize = 200;

/// Whether connections encrypt once a key is agreed
pub const ENABLE_ENCRYPTION: bool = true;

/// Main network configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct NetworkConfig {
    /// Datagram configuration
    #[serde(default)]
    pub transport: TransportConfig,

    /// Per-connection reliability configuration
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Encoding configuration
    #[serde(default)]
    pub encoding: EncodingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl NetworkConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(timeout) = std::env::var("GAMEWIRE_CONNECTION_TIMEOUT_MS") {
            if let Ok(val) = timeout.parse::<u64>() {
                config.connection.timeout = Duration::from_millis(val);
            }
        }

        if let Ok(floor) = std::env::var("GAMEWIRE_RECEIVE_TIMEOUT_FLOOR_MS") {
            if let Ok(val) = floor.parse::<u64>() {
                config.connection.receive_timeout_floor = Duration::from_millis(val);
            }
        }

        if let Ok(limit) = std::env::var("GAMEWIRE_REORDER_LIMIT") {
            if let Ok(val) = limit.parse::<usize>() {
                config.connection.reorder_limit = val;
            }
        }

        if let Ok(enabled) = std::env::var("GAMEWIRE_ENCRYPTION") {
            if let Ok(val) = enabled.parse::<bool>() {
                config.transport.encryption_enabled = val;
            }
        }

        if let Ok(backend) = std::env::var("GAMEWIRE_CIPHER_BACKEND") {
            config.transport.cipher_backend = match backend.to_ascii_lowercase().as_str() {
                "auto" => CipherBackend::Auto,
                "accelerated" => CipherBackend::Accelerated,
                "portable" => CipherBackend::Portable,
                other => {
                    return Err(ProtocolError::ConfigError(format!(
                        "Invalid cipher backend: '{other}' (expected auto, accelerated or portable)"
                    )))
                }
            };
        }

        if let Ok(level) = std::env::var("GAMEWIRE_LOG_LEVEL") {
            config.logging.log_level = level
                .parse::<Level>()
                .map_err(|_| ProtocolError::ConfigError(format!("Invalid log level: {level}")))?;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.transport.validate());
        errors.extend(self.connection.validate());
        errors.extend(self.encoding.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Datagram-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Flush threshold of the accumulation buffers in bytes
    pub mtu: usize,

    /// Whether to encrypt once a key has been agreed
    pub encryption_enabled: bool,

    /// AES-GCM implementation
    pub cipher_backend: CipherBackend,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mtu: MTU,
            encryption_enabled: ENABLE_ENCRYPTION,
            cipher_backend: CipherBackend::Auto,
        }
    }
}

impl TransportConfig {
    /// Validate transport configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.mtu < 64 {
            errors.push(format!("MTU too small: {} bytes (minimum: 64)", self.mtu));
        } else if self.mtu * 3 > BUFFER_CAPACITY {
            errors.push(format!(
                "MTU too large: {} bytes (buffers hold {} bytes, maximum MTU: {})",
                self.mtu,
                BUFFER_CAPACITY,
                BUFFER_CAPACITY / 3
            ));
        }

        if !self.encryption_enabled {
            errors.push(
                "WARNING: Encryption is disabled - not recommended for production".to_string(),
            );
        }

        errors
    }
}

/// Per-connection reliability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Countdown a new connection starts with
    #[serde(with = "duration_serde")]
    pub timeout: Duration,

    /// Minimum countdown after any inbound packet
    #[serde(with = "duration_serde")]
    pub receive_timeout_floor: Duration,

    /// Out-of-order reliable packets held before disconnecting
    pub reorder_limit: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CONNECTION_TIMEOUT,
            receive_timeout_floor: DEFAULT_RECEIVE_TIMEOUT_FLOOR,
            reorder_limit: DEFAULT_REORDER_LIMIT,
        }
    }
}

impl ConnectionConfig {
    /// Validate connection configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.timeout.as_millis() < 100 {
            errors.push("Connection timeout too short (minimum: 100ms)".to_string());
        } else if self.timeout.as_secs() > 3600 {
            errors.push("Connection timeout too long (maximum: 1 hour)".to_string());
        }

        if self.receive_timeout_floor.is_zero() {
            errors.push("Receive timeout floor must be greater than 0".to_string());
        } else if self.receive_timeout_floor > self.timeout {
            errors.push("Receive timeout floor cannot exceed the connection timeout".to_string());
        }

        if self.reorder_limit == 0 {
            errors.push("Reorder limit must be greater than 0".to_string());
        } else if self.reorder_limit >= WINDOW_SIZE / 2 {
            errors.push(format!(
                "Reorder limit too large: {} (must stay below half the window, {})",
                self.reorder_limit,
                WINDOW_SIZE / 2
            ));
        }

        errors
    }
}

/// Encoding configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EncodingConfig {
    /// Chunk size for short vector quantization
    pub chunk_size: f32,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl EncodingConfig {
    /// Validate encoding configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !self.chunk_size.is_finite() || self.chunk_size <= 0.0 {
            errors.push(format!(
                "Invalid chunk size: {} (must be a positive number)",
                self.chunk_size
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,

    /// Whether to log to file
    pub log_to_file: bool,

    /// Path to log file (if log_to_file is true)
    pub log_file_path: Option<String>,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("gamewire"),
            log_level: Level::INFO,
            log_to_console: true,
            log_to_file: false,
            log_file_path: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        if self.log_to_file {
            if let Some(ref path) = self.log_file_path {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        errors.push(format!(
                            "Log file directory does not exist: {}",
                            parent.display()
                        ));
                    }
                }
            } else {
                errors.push("log_file_path must be specified when log_to_file is true".to_string());
            }
        }

        if !self.log_to_console && !self.log_to_file {
            errors
                .push("At least one logging output (console or file) must be enabled".to_string());
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
