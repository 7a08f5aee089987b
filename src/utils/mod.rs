//! # Utility Modules
//!
//! Supporting utilities for buffer recycling, cryptography, logging, and metrics.
//!
//! ## Components
//! - **Buffer Pool**: two-tier (thread-local + global) recycling of packet buffers
//! - **Crypto**: AES-256-GCM packet transform with accelerated and portable backends
//! - **Logging**: Structured logging configuration
//! - **Metrics**: Thread-safe observability counters
//!
//! ## Security
//! - Cryptographically secure RNG (OsRng) for every nonce
//! - Authenticated encryption; tampered packets are rejected before dispatch

pub mod buffer_pool;
pub mod crypto;
pub mod logging;
pub mod metrics;

pub use crypto::{CipherBackend, Crypto};
