//! Hashing utilities: plain SHA-256 digests and the keyed block hash.
//!
//! Block hashes, the proof-of-work target and merkle nodes all go through a
//! single [`BlockHasher`]. The default is HMAC-SHA256 under a fixed key, which
//! keeps hashes compatible with ledgers produced by earlier tooling. Swapping
//! the hasher changes every block hash, so all parties must agree on it.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// A named alias for a 32-byte(u8) array, used to represent a 256-bit hash.
pub type H256 = [u8; 32];

/// Key embedded in the default block hasher.
pub const DEFAULT_HASH_KEY: &str = "alludam";

/// A wrapper type for H256 with Display and Debug formatting.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Hash(pub H256);

impl Hash {
    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &H256 {
        &self.0
    }

    /// Convert to a lowercase hex string (no prefix).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", &self.to_hex()[..8])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<H256> for Hash {
    fn from(bytes: H256) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Hash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Plain SHA-256 of arbitrary data.
pub fn sha256(data: &[u8]) -> Hash {
    Hash(Sha256::digest(data).into())
}

/// The hash function shared by block construction, mining and merkle commitment.
pub trait BlockHasher: Send + Sync {
    /// Hash raw bytes.
    fn digest(&self, data: &[u8]) -> Hash;

    /// Hash a string and return the lowercase hex digest.
    fn digest_hex(&self, data: &str) -> String {
        self.digest(data.as_bytes()).to_hex()
    }
}

/// HMAC-SHA256 under a fixed key. This is the ledger's default hasher.
#[derive(Clone)]
pub struct HmacSha256Hasher {
    key: Vec<u8>,
}

impl HmacSha256Hasher {
    /// Create a hasher with a custom key.
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self {
            key: key.as_ref().to_vec(),
        }
    }
}

impl Default for HmacSha256Hasher {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_KEY)
    }
}

impl fmt::Debug for HmacSha256Hasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacSha256Hasher").finish_non_exhaustive()
    }
}

impl BlockHasher for HmacSha256Hasher {
    fn digest(&self, data: &[u8]) -> Hash {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.key)
            .expect("HMAC accepts keys of any length");
        mac.update(data);
        Hash(mac.finalize().into_bytes().into())
    }
}

/// Unkeyed SHA-256. Produces different block hashes than the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl BlockHasher for Sha256Hasher {
    fn digest(&self, data: &[u8]) -> Hash {
        sha256(data)
    }
}
