//! Key agreement for packet encryption using Elliptic Curve Diffie-Hellman (ECDH)
//!
//! Each side generates an ephemeral P-521 key pair and sends its public point
//! as two 66-byte big-endian coordinates. Once the remote point arrives, the
//! shared secret is reduced to its minimal big-endian two's-complement form
//! and hashed with SHA-256 into the AES-256-GCM packet key.
//!
//! The exchange is per connection: a [`KeyExchange`] lives only as long as the
//! handshake and zeroizes its secret on drop. How the points travel (which
//! packet, which channel) is up to the caller; [`PublicPoint`] implements
//! [`NetSerializable`] for that purpose.

use crate::core::buffer::Buffer;
use crate::core::serializable::NetSerializable;
use crate::error::{constants, ProtocolError, Result};
use crate::utils::crypto::{CipherBackend, Crypto, KEY_LEN};
use crate::utils::metrics::{global_metrics, Timer};
use p521::ecdh::EphemeralSecret;
use p521::elliptic_curve::sec1::ToEncodedPoint;
use p521::PublicKey;
use rand_core::OsRng;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};
use zeroize::{Zeroize, Zeroizing};

/// Length of one P-521 coordinate in bytes.
pub const COORDINATE_LEN: usize = 66;

/// SEC1 tag of an uncompressed point.
const SEC1_UNCOMPRESSED: u8 = 0x04;

/// Public half of a key pair as affine coordinates.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicPoint {
    pub x: [u8; COORDINATE_LEN],
    pub y: [u8; COORDINATE_LEN],
}

impl std::fmt::Debug for PublicPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublicPoint")
            .field("x0", &self.x[0])
            .field("y0", &self.y[0])
            .finish_non_exhaustive()
    }
}

impl PublicPoint {
    fn from_public_key(public: &PublicKey) -> Result<Self> {
        let encoded = public.to_encoded_point(false);
        let (x, y) = match (encoded.x(), encoded.y()) {
            (Some(x), Some(y)) => (x, y),
            _ => {
                return Err(ProtocolError::HandshakeError(
                    constants::ERR_INVALID_REMOTE_POINT.into(),
                ))
            }
        };
        Ok(Self {
            x: normalize_coordinate(x)?,
            y: normalize_coordinate(y)?,
        })
    }

    /// Rebuild the curve point; fails if it is not on P-521.
    pub fn to_public_key(&self) -> Result<PublicKey> {
        let mut sec1 = [0u8; 1 + 2 * COORDINATE_LEN];
        sec1[0] = SEC1_UNCOMPRESSED;
        sec1[1..=COORDINATE_LEN].copy_from_slice(&self.x);
        sec1[1 + COORDINATE_LEN..].copy_from_slice(&self.y);

        PublicKey::from_sec1_bytes(&sec1)
            .map_err(|_| ProtocolError::HandshakeError(constants::ERR_INVALID_REMOTE_POINT.into()))
    }
}

impl NetSerializable for PublicPoint {
    fn write(&self, buffer: &mut Buffer) {
        buffer.put_blob(&self.x);
        buffer.put_blob(&self.y);
    }

    fn read(buffer: &mut Buffer) -> Result<Self> {
        let x = buffer.get_blob()?;
        let y = buffer.get_blob()?;
        Ok(Self {
            x: normalize_coordinate(&x)?,
            y: normalize_coordinate(&y)?,
        })
    }
}

/// Left-pad a big-endian coordinate to [`COORDINATE_LEN`], accepting a
/// leading sign byte or shorter minimal encodings.
fn normalize_coordinate(bytes: &[u8]) -> Result<[u8; COORDINATE_LEN]> {
    let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    let significant = &bytes[first..];
    if significant.len() > COORDINATE_LEN {
        return Err(ProtocolError::HandshakeError(
            constants::ERR_INVALID_COORDINATE.into(),
        ));
    }

    let mut out = [0u8; COORDINATE_LEN];
    out[COORDINATE_LEN - significant.len()..].copy_from_slice(significant);
    Ok(out)
}

/// Minimal big-endian two's-complement form of a non-negative integer.
pub(crate) fn minimal_signed_be(bytes: &[u8]) -> Zeroizing<Vec<u8>> {
    let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    let significant = &bytes[first..];

    let mut out = Zeroizing::new(Vec::with_capacity(significant.len() + 1));
    if significant.first().map_or(true, |&b| b & 0x80 != 0) {
        out.push(0);
    }
    out.extend_from_slice(significant);
    out
}

/// Hash a shared secret into a packet key.
fn derive_key_from_shared_secret(secret: &[u8]) -> Zeroizing<[u8; KEY_LEN]> {
    let signed = minimal_signed_be(secret);

    let mut hasher = Sha256::new();
    hasher.update(signed.as_slice());
    let mut digest: [u8; KEY_LEN] = hasher.finalize().into();

    let key = Zeroizing::new(digest);
    digest.zeroize();
    key
}

/// One side of an ephemeral P-521 key agreement.
pub struct KeyExchange {
    secret: Option<EphemeralSecret>,
    public: PublicPoint,
    remote: Option<PublicPoint>,
}

impl KeyExchange {
    /// Generate a fresh key pair.
    #[instrument]
    pub fn new() -> Result<Self> {
        let secret = EphemeralSecret::random(&mut OsRng);
        let public = PublicPoint::from_public_key(&secret.public_key())?;

        debug!("Generated ephemeral P-521 key pair");

        Ok(Self {
            secret: Some(secret),
            public,
            remote: None,
        })
    }

    /// Point to send to the peer.
    pub fn public_point(&self) -> &PublicPoint {
        &self.public
    }

    /// Record the peer's point.
    pub fn set_remote_point(&mut self, point: PublicPoint) {
        self.remote = Some(point);
    }

    /// Agree on the packet key. The local secret is consumed.
    ///
    /// # Errors
    /// `HandshakeError` if the remote point is missing or not on the curve, or
    /// if the key has already been derived.
    #[instrument(skip(self))]
    pub fn derive_key(&mut self) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        let _timer = Timer::start("key_agreement");
        let metrics = global_metrics();
        metrics.handshake_attempt();

        match self.agree() {
            Ok(key) => {
                metrics.handshake_success();
                debug!("Derived packet key");
                Ok(key)
            }
            Err(e) => {
                metrics.handshake_failed();
                warn!(error = %e, "Key agreement failed");
                Err(e)
            }
        }
    }

    fn agree(&mut self) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        let remote = self.remote.as_ref().ok_or_else(|| {
            ProtocolError::HandshakeError(constants::ERR_REMOTE_POINT_MISSING.into())
        })?;
        let remote = remote.to_public_key()?;

        let secret = self.secret.take().ok_or_else(|| {
            ProtocolError::HandshakeError(constants::ERR_KEY_PAIR_CONSUMED.into())
        })?;

        let shared = secret.diffie_hellman(&remote);
        Ok(derive_key_from_shared_secret(
            shared.raw_secret_bytes().as_slice(),
        ))
    }

    /// Agree on the packet key and build the cipher for it.
    pub fn derive_crypto(&mut self, backend: CipherBackend) -> Result<Crypto> {
        let key = self.derive_key()?;
        Crypto::with_backend(&key, backend)
    }
}

impl std::fmt::Debug for KeyExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyExchange")
            .field("consumed", &self.secret.is_none())
            .field("remote", &self.remote.is_some())
            .finish_non_exhaustive()
    }
}
