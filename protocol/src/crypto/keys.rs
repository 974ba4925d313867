//! # Ed25519 Key Material
//!
//! Ed25519 keypairs, public keys and signatures used by DID documents,
//! `did:key` identifiers and the Data-Integrity cryptosuite.
//!
//! ## Security considerations
//!
//! - Signing keys are zeroized on drop (thanks, ed25519-dalek).
//! - Fresh keys come from the OS RNG (`OsRng`).
//! - Key bytes are never logged. `Debug` prints only the public half.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::multikey::{self, MultikeyType};

/// Ed25519 secret seed length.
pub const ED25519_SECRET_KEY_LENGTH: usize = 32;

/// Ed25519 signature length.
pub const ED25519_SIGNATURE_LENGTH: usize = 64;

/// Errors that can occur during key operations.
///
/// Intentionally vague about key contents; messages never echo key bytes.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid key length: expected {expected}, got {got} bytes")]
    InvalidLength { expected: &'static str, got: usize },

    #[error("invalid secret key: not a valid scalar for this curve")]
    InvalidSecretKey,

    #[error("invalid public key: not a valid curve point")]
    InvalidPublicKey,

    #[error("invalid signature encoding")]
    InvalidSignature,

    #[error("wrong key type: {0}")]
    WrongKeyType(String),

    #[error("multikey error: {0}")]
    Multikey(#[from] multikey::MultikeyError),
}

/// An Ed25519 keypair.
///
/// Deliberately not `Serialize`: exporting a secret should be an explicit
/// call to [`secret_key_bytes`](Self::secret_key_bytes), never a side effect
/// of shoving a struct into JSON.
///
/// # Examples
///
/// ```
/// use btco_protocol::crypto::keys::EdKeypair;
///
/// let kp = EdKeypair::generate();
/// let sig = kp.sign(b"anchor me");
/// assert!(kp.public_key().verify(b"anchor me", &sig));
/// ```
pub struct EdKeypair {
    signing_key: SigningKey,
}

/// The public half of an Ed25519 keypair.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdPublicKey {
    bytes: [u8; 32],
}

/// A 64-byte Ed25519 signature.
#[derive(Clone, PartialEq, Eq)]
pub struct EdSignature {
    bytes: [u8; 64],
}

impl EdKeypair {
    /// Generate a fresh keypair from the OS cryptographic RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Construct a keypair deterministically from a 32-byte seed.
    pub fn from_seed(seed: &[u8; ED25519_SECRET_KEY_LENGTH]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Construct a keypair from a slice that must be exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        let seed: [u8; ED25519_SECRET_KEY_LENGTH] =
            bytes.try_into().map_err(|_| KeyError::InvalidLength {
                expected: "32",
                got: bytes.len(),
            })?;
        Ok(Self::from_seed(&seed))
    }

    /// Decode an Ed25519 private multikey (`z3u2...`).
    pub fn from_multikey(value: &str) -> Result<Self, KeyError> {
        let decoded = multikey::decode_multikey(value)?;
        if decoded.key_type != MultikeyType::Ed25519 {
            return Err(KeyError::WrongKeyType(format!(
                "expected Ed25519 private key, got {}",
                decoded.key_type
            )));
        }
        if !decoded.is_private {
            return Err(KeyError::WrongKeyType(
                "expected a private key, got a public key".into(),
            ));
        }
        Self::from_slice(&decoded.bytes)
    }

    pub fn public_key(&self) -> EdPublicKey {
        EdPublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// Deterministic RFC 8032 signature over `message`.
    pub fn sign(&self, message: &[u8]) -> EdSignature {
        EdSignature {
            bytes: self.signing_key.sign(message).to_bytes(),
        }
    }

    /// Exports the raw 32-byte seed. Handle with extreme care.
    pub fn secret_key_bytes(&self) -> [u8; ED25519_SECRET_KEY_LENGTH] {
        self.signing_key.to_bytes()
    }

    /// The seed encoded as a private multikey.
    pub fn secret_key_multibase(&self) -> String {
        // Length is fixed at 32, encoding cannot fail.
        multikey::encode_private_key(MultikeyType::Ed25519, &self.secret_key_bytes())
            .unwrap_or_default()
    }
}

impl Clone for EdKeypair {
    fn clone(&self) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&self.signing_key.to_bytes()),
        }
    }
}

impl fmt::Debug for EdKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdKeypair(pub={})", self.public_key().to_hex())
    }
}

// ---------------------------------------------------------------------------
// EdPublicKey
// ---------------------------------------------------------------------------

impl EdPublicKey {
    /// Validate and wrap 32 bytes as an Ed25519 point.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; 32] = slice.try_into().map_err(|_| KeyError::InvalidLength {
            expected: "32",
            got: slice.len(),
        })?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    /// Decode an Ed25519 public multikey (`z6Mk...`).
    pub fn from_multikey(value: &str) -> Result<Self, KeyError> {
        let (key_type, bytes) = multikey::decode_public_key(value)?;
        if key_type != MultikeyType::Ed25519 {
            return Err(KeyError::WrongKeyType(format!(
                "expected Ed25519 public key, got {key_type}"
            )));
        }
        Self::try_from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// `publicKeyMultibase` form of this key.
    pub fn to_multikey(&self) -> String {
        multikey::encode_public_key(MultikeyType::Ed25519, &self.bytes).unwrap_or_default()
    }

    /// The `did:key` identifier for this key.
    pub fn to_did_key(&self) -> String {
        format!("did:key:{}", self.to_multikey())
    }

    /// Returns `true` if the signature is valid for this key and message.
    pub fn verify(&self, message: &[u8], signature: &EdSignature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let dalek_sig = DalekSignature::from_bytes(&signature.bytes);
        verifying_key.verify(message, &dalek_sig).is_ok()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Display for EdPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for EdPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdPublicKey({})", &self.to_hex()[..16])
    }
}

// ---------------------------------------------------------------------------
// EdSignature
// ---------------------------------------------------------------------------

impl EdSignature {
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self { bytes }
    }

    /// Parse a signature from a slice that must be exactly 64 bytes.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; 64] = slice.try_into().map_err(|_| KeyError::InvalidSignature)?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Debug for EdSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        write!(f, "EdSignature({}...{})", &hex_str[..8], &hex_str[120..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_roundtrip() {
        let kp = EdKeypair::generate();
        let sig = kp.sign(b"satoshi 12345");
        assert!(kp.public_key().verify(b"satoshi 12345", &sig));
        assert!(!kp.public_key().verify(b"satoshi 12346", &sig));
    }

    #[test]
    fn wrong_key_fails_verification() {
        let kp1 = EdKeypair::generate();
        let kp2 = EdKeypair::generate();
        let sig = kp1.sign(b"message");
        assert!(!kp2.public_key().verify(b"message", &sig));
    }

    #[test]
    fn deterministic_from_seed() {
        let seed = [42u8; 32];
        let kp1 = EdKeypair::from_seed(&seed);
        let kp2 = EdKeypair::from_seed(&seed);
        assert_eq!(kp1.public_key(), kp2.public_key());
        assert_eq!(kp1.sign(b"x").as_bytes(), kp2.sign(b"x").as_bytes());
    }

    #[test]
    fn from_slice_rejects_wrong_length() {
        assert!(matches!(
            EdKeypair::from_slice(&[0u8; 31]),
            Err(KeyError::InvalidLength { got: 31, .. })
        ));
    }

    #[test]
    fn multikey_roundtrip_for_both_halves() {
        let kp = EdKeypair::generate();
        let restored = EdKeypair::from_multikey(&kp.secret_key_multibase()).unwrap();
        assert_eq!(restored.public_key(), kp.public_key());

        let pk = EdPublicKey::from_multikey(&kp.public_key().to_multikey()).unwrap();
        assert_eq!(pk, kp.public_key());
    }

    #[test]
    fn public_multikey_is_not_a_private_key() {
        let kp = EdKeypair::generate();
        let err = EdKeypair::from_multikey(&kp.public_key().to_multikey()).unwrap_err();
        assert!(matches!(err, KeyError::WrongKeyType(_)));
    }

    #[test]
    fn did_key_format() {
        let kp = EdKeypair::generate();
        let did = kp.public_key().to_did_key();
        assert!(did.starts_with("did:key:z6Mk"), "got {did}");
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let kp = EdKeypair::from_seed(&[3u8; 32]);
        let debug_str = format!("{:?}", kp);
        assert!(debug_str.starts_with("EdKeypair(pub="));
        assert!(!debug_str.contains(&hex::encode([3u8; 32])));
    }

    #[test]
    fn signature_requires_64_bytes() {
        assert!(EdSignature::try_from_slice(&[0u8; 63]).is_err());
        assert!(EdSignature::try_from_slice(&[0u8; 64]).is_ok());
    }
}
