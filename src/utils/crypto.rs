//! # Packet Encryption
//!
//! AES-256-GCM transform applied in place to a packet [`Buffer`].
//!
//! The first byte (packet type) stays in clear. Everything after it is
//! encrypted in place and the buffer grows by a 12-byte random nonce followed
//! by the 16-byte authentication tag:
//!
//! ```text
//! [Type(1)] [Ciphertext(N)] [Nonce(12)] [Tag(16)]
//! ```
//!
//! ## Backends
//! - **Accelerated**: `ring`, AES-NI / ARMv8 crypto extensions when present
//! - **Portable**: RustCrypto `aes-gcm`, pure software
//!
//! Both produce the same bytes for the same key and nonce, so peers may use
//! different backends.

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use rand_core::{OsRng, RngCore};
use ring::aead::{self, Aad, LessSafeKey, UnboundKey, AES_256_GCM};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::buffer::Buffer;
use crate::error::{constants, ProtocolError, Result};
use crate::utils::metrics::global_metrics;

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;
/// GCM nonce length in bytes.
pub const NONCE_LEN: usize = 12;
/// GCM tag length in bytes.
pub const TAG_LEN: usize = 16;
/// Bytes added to a packet by encryption.
pub const OVERHEAD: usize = NONCE_LEN + TAG_LEN;
/// Leading bytes left in clear.
pub const CLEAR_HEADER_LEN: usize = 1;

/// AES-GCM implementation selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CipherBackend {
    /// Accelerated on x86_64 and aarch64, portable elsewhere.
    #[default]
    Auto,
    Accelerated,
    Portable,
}

impl CipherBackend {
    fn resolve(self) -> Self {
        match self {
            CipherBackend::Auto => {
                if cfg!(any(target_arch = "x86_64", target_arch = "aarch64")) {
                    CipherBackend::Accelerated
                } else {
                    CipherBackend::Portable
                }
            }
            other => other,
        }
    }
}

enum Engine {
    Accelerated(LessSafeKey),
    Portable(Box<Aes256Gcm>),
}

/// Keyed AES-256-GCM transform for packet buffers.
pub struct Crypto {
    engine: Engine,
}

impl std::fmt::Debug for Crypto {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crypto")
            .field("backend", &self.backend())
            .finish_non_exhaustive()
    }
}

impl Crypto {
    /// Create a transform with the default backend.
    pub fn new(key: &[u8; KEY_LEN]) -> Result<Self> {
        Self::with_backend(key, CipherBackend::Auto)
    }

    /// Create a transform with an explicit backend.
    pub fn with_backend(key: &[u8; KEY_LEN], backend: CipherBackend) -> Result<Self> {
        let engine = match backend.resolve() {
            CipherBackend::Portable => {
                let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| {
                    ProtocolError::HandshakeError(constants::ERR_KEY_REJECTED.into())
                })?;
                Engine::Portable(Box::new(cipher))
            }
            _ => {
                let unbound = UnboundKey::new(&AES_256_GCM, key).map_err(|_| {
                    ProtocolError::HandshakeError(constants::ERR_KEY_REJECTED.into())
                })?;
                Engine::Accelerated(LessSafeKey::new(unbound))
            }
        };

        let crypto = Self { engine };
        debug!(backend = ?crypto.backend(), "Packet cipher ready");
        Ok(crypto)
    }

    /// Backend actually in use.
    pub fn backend(&self) -> CipherBackend {
        match self.engine {
            Engine::Accelerated(_) => CipherBackend::Accelerated,
            Engine::Portable(_) => CipherBackend::Portable,
        }
    }

    /// Generate a random nonce.
    pub fn generate_nonce() -> [u8; NONCE_LEN] {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        nonce
    }

    /// Encrypt `[1..size)` in place and append nonce and tag; the cursor is rewound.
    ///
    /// # Errors
    /// `BufferOverflow` if the grown packet would not fit, `EncryptionFailure`
    /// on an empty buffer or a cipher fault.
    pub fn encrypt_buffer(&self, buffer: &mut Buffer) -> Result<()> {
        self.seal_with_nonce(buffer, Self::generate_nonce())
    }

    pub(crate) fn seal_with_nonce(&self, buffer: &mut Buffer, nonce: [u8; NONCE_LEN]) -> Result<()> {
        let size = buffer.size();
        if size < CLEAR_HEADER_LEN {
            return Err(ProtocolError::EncryptionFailure);
        }
        if size + OVERHEAD > buffer.capacity() {
            return Err(ProtocolError::BufferOverflow(size + OVERHEAD));
        }

        let storage = buffer.storage_mut();
        let (body, tail) = storage.split_at_mut(size);
        let plaintext = &mut body[CLEAR_HEADER_LEN..];

        let tag: [u8; TAG_LEN] = match &self.engine {
            Engine::Accelerated(key) => {
                let tag = key
                    .seal_in_place_separate_tag(
                        aead::Nonce::assume_unique_for_key(nonce),
                        Aad::empty(),
                        plaintext,
                    )
                    .map_err(|_| ProtocolError::EncryptionFailure)?;
                let mut out = [0u8; TAG_LEN];
                out.copy_from_slice(tag.as_ref());
                out
            }
            Engine::Portable(cipher) => {
                let tag = cipher
                    .encrypt_in_place_detached(Nonce::from_slice(&nonce), &[], plaintext)
                    .map_err(|_| ProtocolError::EncryptionFailure)?;
                let mut out = [0u8; TAG_LEN];
                out.copy_from_slice(tag.as_slice());
                out
            }
        };

        tail[..NONCE_LEN].copy_from_slice(&nonce);
        tail[NONCE_LEN..OVERHEAD].copy_from_slice(&tag);

        buffer.set_size(size + OVERHEAD);
        buffer.rewind();
        global_metrics().encryption_success();
        Ok(())
    }

    /// Authenticate and decrypt a received packet in place, dropping nonce
    /// and tag; the cursor is rewound.
    ///
    /// # Errors
    /// `DecryptionFailure` if the packet is too short or fails authentication.
    /// The payload bytes are unspecified after a failure.
    pub fn decrypt_buffer(&self, buffer: &mut Buffer) -> Result<()> {
        let size = buffer.size();
        if size < CLEAR_HEADER_LEN + OVERHEAD {
            warn!(size, "{}", constants::ERR_CIPHERTEXT_TOO_SHORT);
            global_metrics().decryption_failure();
            return Err(ProtocolError::DecryptionFailure);
        }

        let cipher_end = size - OVERHEAD;
        let storage = buffer.storage_mut();
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&storage[cipher_end..cipher_end + NONCE_LEN]);

        let opened = match &self.engine {
            Engine::Accelerated(key) => {
                // ring expects ciphertext immediately followed by the tag
                storage.copy_within(cipher_end + NONCE_LEN..size, cipher_end);
                key.open_in_place(
                    aead::Nonce::assume_unique_for_key(nonce),
                    Aad::empty(),
                    &mut storage[CLEAR_HEADER_LEN..cipher_end + TAG_LEN],
                )
                .map(|_| ())
                .is_ok()
            }
            Engine::Portable(cipher) => {
                let tag = Tag::clone_from_slice(&storage[cipher_end + NONCE_LEN..size]);
                cipher
                    .decrypt_in_place_detached(
                        Nonce::from_slice(&nonce),
                        &[],
                        &mut storage[CLEAR_HEADER_LEN..cipher_end],
                        &tag,
                    )
                    .is_ok()
            }
        };

        if !opened {
            global_metrics().decryption_failure();
            return Err(ProtocolError::DecryptionFailure);
        }

        buffer.set_size(cipher_end);
        buffer.rewind();
        Ok(())
    }
}
