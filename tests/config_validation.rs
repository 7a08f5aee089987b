//! Integration tests for configuration validation

#![allow(clippy::expect_used, clippy::unwrap_used)]

use gamewire::config::{
    ConnectionConfig, LoggingConfig, NetworkConfig, TransportConfig, DEFAULT_REORDER_LIMIT,
};
use gamewire::error::ProtocolError;
use gamewire::{CipherBackend, BUFFER_CAPACITY, MTU};
use serial_test::serial;
use std::time::Duration;
use tracing::Level;

#[test]
fn test_default_config_validates() {
    let config = NetworkConfig::default();
    let errors = config.validate();
    assert!(
        errors.is_empty(),
        "Default config should be valid, but got errors: {:?}",
        errors
    );
    assert_eq!(config.transport.mtu, MTU);
    assert_eq!(config.connection.reorder_limit, DEFAULT_REORDER_LIMIT);
    assert_eq!(config.connection.timeout, Duration::from_secs(120));
    assert_eq!(config.connection.receive_timeout_floor, Duration::from_secs(15));
}

#[test]
fn test_tiny_mtu() {
    let mut config = NetworkConfig::default();
    config.transport.mtu = 16;

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("MTU too small")));
}

#[test]
fn test_mtu_beyond_buffer_capacity() {
    let mut config = NetworkConfig::default();
    config.transport.mtu = BUFFER_CAPACITY / 3 + 1;

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("MTU too large")));
}

#[test]
fn test_encryption_disabled_warning() {
    let mut config = NetworkConfig::default();
    config.transport.encryption_enabled = false;

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("WARNING: Encryption is disabled")));
}

#[test]
fn test_short_connection_timeout() {
    let mut config = NetworkConfig::default();
    config.connection.timeout = Duration::from_millis(50);
    config.connection.receive_timeout_floor = Duration::from_millis(10);

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Connection timeout too short")));
}

#[test]
fn test_long_connection_timeout() {
    let mut config = NetworkConfig::default();
    config.connection.timeout = Duration::from_secs(7200);

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("Connection timeout too long")));
}

#[test]
fn test_receive_floor_above_timeout() {
    let mut config = NetworkConfig::default();
    config.connection.timeout = Duration::from_secs(10);

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("cannot exceed the connection timeout")));
}

#[test]
fn test_zero_receive_floor() {
    let mut config = NetworkConfig::default();
    config.connection.receive_timeout_floor = Duration::ZERO;

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Receive timeout floor must be greater than 0")));
}

#[test]
fn test_reorder_limit_bounds() {
    let zero = ConnectionConfig {
        reorder_limit: 0,
        ..ConnectionConfig::default()
    };
    assert!(zero
        .validate()
        .iter()
        .any(|e| e.contains("Reorder limit must be greater than 0")));

    let huge = ConnectionConfig {
        reorder_limit: 1024,
        ..ConnectionConfig::default()
    };
    assert!(huge
        .validate()
        .iter()
        .any(|e| e.contains("Reorder limit too large")));
}

#[test]
fn test_invalid_chunk_size() {
    for chunk in [0.0, -4.0, f32::NAN, f32::INFINITY] {
        let mut config = NetworkConfig::default();
        config.encoding.chunk_size = chunk;
        let errors = config.validate();
        assert!(
            errors.iter().any(|e| e.contains("Invalid chunk size")),
            "chunk size {chunk} accepted"
        );
    }
}

#[test]
fn test_empty_app_name() {
    let mut config = NetworkConfig::default();
    config.logging.app_name = String::new();

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("Application name cannot be empty")));
}

#[test]
fn test_log_to_file_without_path() {
    let mut config = NetworkConfig::default();
    config.logging.log_to_file = true;
    config.logging.log_file_path = None;

    let errors = config.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("log_file_path must be specified")));
}

#[test]
fn test_no_logging_outputs() {
    let logging = LoggingConfig {
        log_to_console: false,
        log_to_file: false,
        ..LoggingConfig::default()
    };

    let errors = logging.validate();
    assert!(errors
        .iter()
        .any(|e| e.contains("At least one logging output")));
}

#[test]
fn test_validate_strict_with_invalid_config() {
    let config = NetworkConfig::default_with_overrides(|c| {
        c.transport.mtu = 8;
        c.connection.reorder_limit = 0;
    });

    match config.validate_strict() {
        Err(ProtocolError::ConfigError(msg)) => {
            assert!(msg.contains("MTU too small"));
            assert!(msg.contains("Reorder limit"));
        }
        other => panic!("Expected ConfigError, got {other:?}"),
    }
    assert!(NetworkConfig::default().validate_strict().is_ok());
}

#[test]
fn test_partial_toml_fills_defaults() {
    let config = NetworkConfig::from_toml(
        r#"
        [transport]
        mtu = 600
        cipher_backend = "portable"

        [connection]
        timeout = 30000
        "#,
    )
    .expect("partial config should parse");

    assert_eq!(config.transport.mtu, 600);
    assert_eq!(config.transport.cipher_backend, CipherBackend::Portable);
    assert!(config.transport.encryption_enabled);
    assert_eq!(config.connection.timeout, Duration::from_secs(30));
    assert_eq!(config.connection.reorder_limit, DEFAULT_REORDER_LIMIT);
    assert_eq!(config.logging.log_level, Level::INFO);
}

#[test]
fn test_malformed_toml_rejected() {
    let result = NetworkConfig::from_toml("[transport\nmtu = ");
    assert!(matches!(result, Err(ProtocolError::ConfigError(_))));

    let result = NetworkConfig::from_toml("[logging]\nlog_level = \"loud\"");
    assert!(matches!(result, Err(ProtocolError::ConfigError(_))));
}

#[test]
fn test_example_config_round_trips() {
    let text = NetworkConfig::example_config();
    let parsed = NetworkConfig::from_toml(&text).expect("example config should parse");
    assert!(parsed.validate().is_empty());
    assert_eq!(parsed.transport.mtu, MTU);
}

#[test]
fn test_save_and_load_file() {
    let path = std::env::temp_dir().join(format!("gamewire-config-{}.toml", std::process::id()));
    let config = NetworkConfig::default_with_overrides(|c| {
        c.transport = TransportConfig {
            mtu: 900,
            ..TransportConfig::default()
        };
        c.logging.log_level = Level::DEBUG;
    });

    config.save_to_file(&path).expect("config should save");
    let loaded = NetworkConfig::from_file(&path).expect("config should load");
    let _ = std::fs::remove_file(&path);

    assert_eq!(loaded.transport.mtu, 900);
    assert_eq!(loaded.logging.log_level, Level::DEBUG);
}

#[test]
fn test_missing_file() {
    let result = NetworkConfig::from_file("/definitely/not/here/gamewire.toml");
    assert!(matches!(result, Err(ProtocolError::ConfigError(_))));
}

const ENV_KEYS: [&str; 6] = [
    "GAMEWIRE_CONNECTION_TIMEOUT_MS",
    "GAMEWIRE_RECEIVE_TIMEOUT_FLOOR_MS",
    "GAMEWIRE_REORDER_LIMIT",
    "GAMEWIRE_ENCRYPTION",
    "GAMEWIRE_CIPHER_BACKEND",
    "GAMEWIRE_LOG_LEVEL",
];

fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_env_overrides() {
    clear_env();
    std::env::set_var("GAMEWIRE_CONNECTION_TIMEOUT_MS", "45000");
    std::env::set_var("GAMEWIRE_REORDER_LIMIT", "64");
    std::env::set_var("GAMEWIRE_ENCRYPTION", "false");
    std::env::set_var("GAMEWIRE_CIPHER_BACKEND", "Accelerated");
    std::env::set_var("GAMEWIRE_LOG_LEVEL", "warn");

    let config = NetworkConfig::from_env();
    clear_env();
    let config = config.expect("env config should load");

    assert_eq!(config.connection.timeout, Duration::from_secs(45));
    assert_eq!(config.connection.reorder_limit, 64);
    assert!(!config.transport.encryption_enabled);
    assert_eq!(config.transport.cipher_backend, CipherBackend::Accelerated);
    assert_eq!(config.logging.log_level, Level::WARN);
}

#[test]
#[serial]
fn test_env_invalid_backend() {
    clear_env();
    std::env::set_var("GAMEWIRE_CIPHER_BACKEND", "chacha");
    let result = NetworkConfig::from_env();
    clear_env();

    match result {
        Err(ProtocolError::ConfigError(msg)) => assert!(msg.contains("chacha")),
        other => panic!("Expected ConfigError, got {other:?}"),
    }
}

#[test]
#[serial]
fn test_env_unparsable_numbers_ignored() {
    clear_env();
    std::env::set_var("GAMEWIRE_REORDER_LIMIT", "lots");
    let config = NetworkConfig::from_env();
    clear_env();

    assert_eq!(config.unwrap().connection.reorder_limit, DEFAULT_REORDER_LIMIT);
}
