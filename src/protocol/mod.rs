//! # Protocol Layer
//!
//! Packet framing, per-peer reliability and key agreement.
//!
//! ## Components
//! - **Packet**: one-byte packet type tags
//! - **Window**: duplicate-detection bitmap over the reliable sequence space
//! - **Connection**: reliable/unreliable/ack channels, reorder table, timeout
//! - **Handshake**: P-521 ECDH key agreement feeding the packet cipher
//! - **Dispatcher**: opcode-keyed handler table for delivered payloads
//!
//! ## Packet Layout
//! ```text
//! Reliable:    [1] [Seq i16] [Tick u32] [Payload]
//! Unreliable:  [0] [Header hook] [Tick u32] [Payload]
//! Ack:         [2] [Seq i16]*
//! Control:     [3 Ping | 4 Pong | 5 Disconnected]
//! ```

pub mod connection;
pub mod dispatcher;
pub mod handshake;
pub mod packet;
pub mod window;
