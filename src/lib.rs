//! # gamewire
//!
//! Low-latency binary transport core for real-time multiplayer games, layered
//! over an unreliable datagram socket.
//!
//! ## Features
//! - Packed little-endian encoding with varints, quantized floats and string interning
//! - Two-tier buffer pool so the packet path does not allocate
//! - Ordered, duplicate-free reliable channel with a sliding sequence window
//! - P-521 key agreement and AES-256-GCM packet encryption
//!
//! ## Quick Start
//! ```rust
//! use gamewire::{Buffer, Connection, Dispatcher};
//! use std::time::Duration;
//!
//! let mut connection = Connection::new(|datagram: &Buffer| {
//!     // hand datagram.payload() to the socket
//!     let _ = datagram.payload();
//! }, Dispatcher::new());
//!
//! connection
//!     .send_reliable(|buffer, symbols| {
//!         buffer.put_u8(1);
//!         buffer.put_symbol(symbols, "lobby");
//!     })
//!     .unwrap();
//! connection.update(Duration::from_millis(16), 1);
//! assert_eq!(connection.in_flight_count(), 1);
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod utils;

pub use crate::config::NetworkConfig;
pub use crate::core::buffer::{AckState, Buffer, BUFFER_CAPACITY, MTU};
pub use crate::core::quantize::{QuantizationContext, Vec3};
pub use crate::core::serializable::NetSerializable;
pub use crate::core::symbols::SymbolTable;
pub use crate::error::{ProtocolError, Result};
pub use crate::protocol::connection::{
    Connection, ConnectionId, ConnectionState, DisconnectReason, HeaderWriter, PacketListener,
    PacketSink,
};
pub use crate::protocol::dispatcher::Dispatcher;
pub use crate::protocol::handshake::{KeyExchange, PublicPoint};
pub use crate::protocol::packet::PacketType;
pub use crate::utils::crypto::{CipherBackend, Crypto};
