//! # Multi-Curve Signatures
//!
//! One entry point for the three key types the key manager holds:
//!
//! | Type        | Curve      | Public key          | Signature                       |
//! |-------------|------------|---------------------|---------------------------------|
//! | `Ed25519`   | Curve25519 | 32 bytes            | RFC 8032 over the raw message   |
//! | `Secp256k1` | secp256k1  | 33 bytes compressed | ECDSA (compact) over SHA-256(m) |
//! | `Schnorr`   | secp256k1  | 32 bytes x-only     | BIP-340 over SHA-256(m)         |
//!
//! Verification returns a plain `bool`. Malformed keys and signatures are
//! just another way of failing verification, never a panic.

use bitcoin::secp256k1::{self, ecdsa, schnorr, Keypair, Message, PublicKey, Secp256k1, SecretKey, XOnlyPublicKey};
use serde::{Deserialize, Serialize};

use super::hash::sha256;
use super::keys::{EdKeypair, EdPublicKey, EdSignature, KeyError};

/// The asymmetric key types supported by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    Ed25519,
    Secp256k1,
    Schnorr,
}

impl KeyType {
    /// Byte length of the public key this type derives.
    pub fn public_key_len(&self) -> usize {
        match self {
            KeyType::Ed25519 | KeyType::Schnorr => 32,
            KeyType::Secp256k1 => 33,
        }
    }
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            KeyType::Ed25519 => "Ed25519",
            KeyType::Secp256k1 => "Secp256k1",
            KeyType::Schnorr => "Schnorr",
        };
        f.write_str(name)
    }
}

/// Generate 32 bytes of secret key material valid for `key_type`.
pub fn generate_secret(key_type: KeyType) -> [u8; 32] {
    match key_type {
        KeyType::Ed25519 => EdKeypair::generate().secret_key_bytes(),
        KeyType::Secp256k1 | KeyType::Schnorr => {
            SecretKey::new(&mut secp256k1::rand::thread_rng()).secret_bytes()
        }
    }
}

/// Derive the public key bytes for a secret.
pub fn public_key_for(key_type: KeyType, secret: &[u8]) -> Result<Vec<u8>, KeyError> {
    check_secret_len(secret)?;
    match key_type {
        KeyType::Ed25519 => Ok(EdKeypair::from_slice(secret)?.public_key().as_bytes().to_vec()),
        KeyType::Secp256k1 => {
            let secp = Secp256k1::signing_only();
            let sk = secp_secret(secret)?;
            Ok(PublicKey::from_secret_key(&secp, &sk).serialize().to_vec())
        }
        KeyType::Schnorr => {
            let secp = Secp256k1::signing_only();
            let keypair = Keypair::from_secret_key(&secp, &secp_secret(secret)?);
            Ok(keypair.x_only_public_key().0.serialize().to_vec())
        }
    }
}

/// Sign `message` with a secret of the given type.
pub fn sign(key_type: KeyType, secret: &[u8], message: &[u8]) -> Result<Vec<u8>, KeyError> {
    check_secret_len(secret)?;
    match key_type {
        KeyType::Ed25519 => Ok(EdKeypair::from_slice(secret)?.sign(message).as_bytes().to_vec()),
        KeyType::Secp256k1 => {
            let secp = Secp256k1::signing_only();
            let msg = Message::from_digest(sha256(message));
            let sig = secp.sign_ecdsa(&msg, &secp_secret(secret)?);
            Ok(sig.serialize_compact().to_vec())
        }
        KeyType::Schnorr => {
            let secp = Secp256k1::new();
            let keypair = Keypair::from_secret_key(&secp, &secp_secret(secret)?);
            let msg = Message::from_digest(sha256(message));
            Ok(secp.sign_schnorr(&msg, &keypair).serialize().to_vec())
        }
    }
}

/// Verify a signature produced by [`sign`].
pub fn verify(key_type: KeyType, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    match key_type {
        KeyType::Ed25519 => {
            let (Ok(pk), Ok(sig)) = (
                EdPublicKey::try_from_slice(public_key),
                EdSignature::try_from_slice(signature),
            ) else {
                return false;
            };
            pk.verify(message, &sig)
        }
        KeyType::Secp256k1 => {
            let (Ok(pk), Ok(sig)) = (
                PublicKey::from_slice(public_key),
                ecdsa::Signature::from_compact(signature),
            ) else {
                return false;
            };
            let secp = Secp256k1::verification_only();
            let msg = Message::from_digest(sha256(message));
            secp.verify_ecdsa(&msg, &sig, &pk).is_ok()
        }
        KeyType::Schnorr => {
            let (Ok(pk), Ok(sig)) = (
                XOnlyPublicKey::from_slice(public_key),
                schnorr::Signature::from_slice(signature),
            ) else {
                return false;
            };
            let secp = Secp256k1::verification_only();
            let msg = Message::from_digest(sha256(message));
            secp.verify_schnorr(&sig, &msg, &pk).is_ok()
        }
    }
}

fn check_secret_len(secret: &[u8]) -> Result<(), KeyError> {
    if secret.len() != 32 {
        return Err(KeyError::InvalidLength {
            expected: "32",
            got: secret.len(),
        });
    }
    Ok(())
}

fn secp_secret(secret: &[u8]) -> Result<SecretKey, KeyError> {
    SecretKey::from_slice(secret).map_err(|_| KeyError::InvalidSecretKey)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_TYPES: [KeyType; 3] = [KeyType::Ed25519, KeyType::Secp256k1, KeyType::Schnorr];

    #[test]
    fn sign_verify_roundtrip_all_types() {
        for key_type in ALL_TYPES {
            let secret = generate_secret(key_type);
            let public = public_key_for(key_type, &secret).unwrap();
            assert_eq!(public.len(), key_type.public_key_len());

            let sig = sign(key_type, &secret, b"inscribe").unwrap();
            assert!(verify(key_type, &public, b"inscribe", &sig), "{key_type}");
        }
    }

    #[test]
    fn flipped_message_byte_fails_all_types() {
        for key_type in ALL_TYPES {
            let secret = generate_secret(key_type);
            let public = public_key_for(key_type, &secret).unwrap();
            let sig = sign(key_type, &secret, b"inscribe").unwrap();
            assert!(!verify(key_type, &public, b"inscribf", &sig), "{key_type}");
        }
    }

    #[test]
    fn flipped_signature_byte_fails_all_types() {
        for key_type in ALL_TYPES {
            let secret = generate_secret(key_type);
            let public = public_key_for(key_type, &secret).unwrap();
            let mut sig = sign(key_type, &secret, b"inscribe").unwrap();
            sig[10] ^= 0x01;
            assert!(!verify(key_type, &public, b"inscribe", &sig), "{key_type}");
        }
    }

    #[test]
    fn wrong_secret_length_rejected() {
        for key_type in ALL_TYPES {
            assert!(matches!(
                sign(key_type, &[1u8; 16], b"m"),
                Err(KeyError::InvalidLength { got: 16, .. })
            ));
        }
    }

    #[test]
    fn zero_scalar_rejected_for_secp() {
        assert!(matches!(
            public_key_for(KeyType::Secp256k1, &[0u8; 32]),
            Err(KeyError::InvalidSecretKey)
        ));
    }

    #[test]
    fn garbage_public_key_fails_instead_of_panicking() {
        assert!(!verify(KeyType::Secp256k1, &[0u8; 5], b"m", &[0u8; 64]));
        assert!(!verify(KeyType::Schnorr, &[0u8; 32], b"m", &[0u8; 3]));
        assert!(!verify(KeyType::Ed25519, &[0u8; 32], b"m", &[0u8; 64]));
    }
}
