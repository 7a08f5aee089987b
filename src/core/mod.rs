//! # Core Encoding Components
//!
//! Packet buffers and the binary encodings written into them.
//!
//! ## Components
//! - **Buffer**: fixed-capacity packet container with cursor-based reads and writes
//! - **Varint**: base-128 integers with zig-zag mapping for signed values
//! - **Quantize**: lossy float, position and rotation encodings
//! - **Symbols**: per-connection string interning tables
//! - **Serializable**: capability trait for user payload types
//!
//! ## Wire Format
//! ```text
//! [Type(1)] [Channel header] [Payload(N)] [Nonce(12) + Tag(16), when encrypted]
//! ```

pub mod buffer;
pub mod quantize;
pub mod serializable;
pub mod symbols;
pub mod varint;
