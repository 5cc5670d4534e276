//! secp256k1 ECDSA primitives for signing and verification.
//!
//! Keys and signatures cross the library boundary as hex strings: public keys
//! as uncompressed SEC1 points, private keys as 32-byte scalars, signatures as
//! DER. Every message is hashed with SHA-256 before it is signed.

use crate::hash::{sha256, Hash};
use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature as EcdsaSignature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use std::fmt;
use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid private key")]
    InvalidPrivateKey,
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("invalid signature encoding")]
    InvalidSignature,
    #[error("signing failed")]
    SigningFailed,
}

/// A public key for signature verification.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(VerifyingKey);

impl PublicKey {
    /// Parse a SEC1-encoded key (compressed or uncompressed) from hex.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidPublicKey)?;
        VerifyingKey::from_sec1_bytes(&bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidPublicKey)
    }

    /// Uncompressed SEC1 encoding as hex (`04 || x || y`).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.to_encoded_point(false).as_bytes())
    }

    /// Verify a signature over a SHA-256 digest.
    pub fn verify_digest(&self, digest: &Hash, signature: &Signature) -> bool {
        self.0
            .verify_prehash(digest.as_bytes(), &signature.0)
            .is_ok()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}...)", &self.to_hex()[..16])
    }
}

/// An ECDSA signature.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature(EcdsaSignature);

impl Signature {
    /// Parse a DER signature from hex.
    ///
    /// High-S signatures are normalized so that signatures produced by other
    /// ECDSA implementations still verify.
    pub fn from_der_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidSignature)?;
        let sig = EcdsaSignature::from_der(&bytes).map_err(|_| CryptoError::InvalidSignature)?;
        Ok(Self(sig.normalize_s().unwrap_or(sig)))
    }

    /// DER encoding as hex.
    pub fn to_der_hex(&self) -> String {
        hex::encode(self.0.to_der().as_bytes())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", &self.to_der_hex()[..16])
    }
}

/// A keypair for signing and verification.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
    pub public_key: PublicKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        let public_key = PublicKey(*signing_key.verifying_key());
        Self {
            signing_key,
            public_key,
        }
    }

    /// Restore a keypair from a hex private key.
    ///
    /// Keys rendered without leading zeros are left-padded to 32 bytes.
    pub fn from_private_hex(s: &str) -> Result<Self, CryptoError> {
        if s.is_empty() || s.len() > 64 {
            return Err(CryptoError::InvalidPrivateKey);
        }
        let padded = format!("{:0>64}", s);
        let bytes = hex::decode(padded).map_err(|_| CryptoError::InvalidPrivateKey)?;
        let signing_key =
            SigningKey::from_slice(&bytes).map_err(|_| CryptoError::InvalidPrivateKey)?;
        let public_key = PublicKey(*signing_key.verifying_key());
        Ok(Self {
            signing_key,
            public_key,
        })
    }

    /// Hex of the public key.
    pub fn public_key_hex(&self) -> String {
        self.public_key.to_hex()
    }

    /// Hex of the private scalar (64 chars).
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    /// Sign a SHA-256 digest. Nonces are derived per RFC 6979.
    pub fn sign_digest(&self, digest: &Hash) -> Result<Signature, CryptoError> {
        self.signing_key
            .sign_prehash(digest.as_bytes())
            .map(Signature)
            .map_err(|_| CryptoError::SigningFailed)
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Explicit handle for signer operations on the secp256k1 curve.
///
/// Carries no mutable state, so a single context can be shared freely
/// between threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct CryptoContext;

impl CryptoContext {
    pub fn new() -> Self {
        Self
    }

    /// Generate a fresh keypair.
    pub fn generate_keypair(&self) -> Keypair {
        Keypair::generate()
    }

    /// Sign `SHA-256(message)` with a hex private key; returns the DER signature as hex.
    pub fn sign(&self, private_key_hex: &str, message: &str) -> Result<String, CryptoError> {
        let keypair = Keypair::from_private_hex(private_key_hex)?;
        let digest = sha256(message.as_bytes());
        Ok(keypair.sign_digest(&digest)?.to_der_hex())
    }

    /// Check a hex DER signature over `SHA-256(message)`.
    ///
    /// Malformed keys or signatures yield `false`.
    pub fn verify(&self, public_key_hex: &str, message: &str, signature_hex: &str) -> bool {
        let Ok(public_key) = PublicKey::from_hex(public_key_hex) else {
            return false;
        };
        let Ok(signature) = Signature::from_der_hex(signature_hex) else {
            return false;
        };
        public_key.verify_digest(&sha256(message.as_bytes()), &signature)
    }
}

/// Generate a keypair without an explicit context.
pub fn generate_keypair() -> Keypair {
    CryptoContext::new().generate_keypair()
}
