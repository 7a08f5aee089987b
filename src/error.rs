//! # Error Types
//!
//! Error handling for the transport core.
//!
//! Most wire-level problems never surface as errors: malformed length prefixes
//! decode to empty values and protocol violations end in a typed
//! [`DisconnectReason`](crate::protocol::connection::DisconnectReason). The
//! variants below cover what remains.
//!
//! ## Error Categories
//! - **Buffer Errors**: reads past the valid region of a packet
//! - **Connection Errors**: writes on a closed connection, unknown packet tags
//! - **Cryptographic Errors**: key agreement and AEAD failures
//! - **Configuration Errors**: unreadable or invalid configuration
//!
//! ## Example Usage
//! ```rust
//! use gamewire::core::buffer::Buffer;
//! use gamewire::error::{ProtocolError, Result};
//!
//! fn read_header(buffer: &mut Buffer) -> Result<u32> {
//!     let _kind = buffer.get_u8()?;
//!     buffer.get_u32()
//! }
//!
//! let mut empty = Buffer::new();
//! assert!(matches!(read_header(&mut empty), Err(ProtocolError::BufferUnderflow { .. })));
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Handshake errors
    pub const ERR_KEY_PAIR_CONSUMED: &str = "Local key pair already consumed";
    pub const ERR_REMOTE_POINT_MISSING: &str = "Remote public point not received";
    pub const ERR_INVALID_REMOTE_POINT: &str = "Remote public point is not on curve P-521";
    pub const ERR_INVALID_COORDINATE: &str = "Curve coordinate has invalid length";

    /// Cryptographic errors
    pub const ERR_KEY_REJECTED: &str = "Cipher rejected the derived key";
    pub const ERR_CIPHERTEXT_TOO_SHORT: &str = "Encrypted packet shorter than nonce and tag";
}

/// ProtocolError is the primary error type for all transport operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Buffer underflow: needed {needed} bytes at position {position}, size {size}")]
    BufferUnderflow {
        position: usize,
        needed: usize,
        size: usize,
    },

    #[error("Buffer overflow: {0} bytes do not fit the buffer capacity")]
    BufferOverflow(usize),

    #[error("Varint longer than 5 bytes")]
    MalformedVarint,

    #[error("Unknown remote symbol index: {0}")]
    UnknownSymbol(u32),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Invalid packet type: {0}")]
    InvalidPacketType(u8),

    #[error("Decryption failed")]
    DecryptionFailure,

    #[error("Encryption failed")]
    EncryptionFailure,

    #[error("Handshake failed: {0}")]
    HandshakeError(String),

    #[error("Unexpected message type")]
    UnexpectedMessage,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Custom error: {0}")]
    Custom(String),
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
