//! # Multikey & Multibase Encoding
//!
//! Self-describing key encoding: a multicodec varint tag identifying the key
//! type, followed by the raw key bytes, rendered as multibase base58btc
//! (`z` prefix). This is the format of `publicKeyMultibase`, `did:key`
//! identifiers and encoded private keys.
//!
//! ```text
//! z + base58btc( varint(codec) || key bytes )
//! ```
//!
//! | Codec            | Tag bytes   | Key length |
//! |------------------|-------------|------------|
//! | ed25519-pub      | `ed 01`     | 32         |
//! | ed25519-priv     | `80 26`     | 32         |
//! | secp256k1-pub    | `e7 01`     | 33         |
//! | secp256k1-priv   | `81 26`     | 32         |

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Multibase prefix for base58btc.
pub const MULTIBASE_BASE58BTC_PREFIX: char = 'z';

const ED25519_PUB_TAG: [u8; 2] = [0xed, 0x01];
const ED25519_PRIV_TAG: [u8; 2] = [0x80, 0x26];
const SECP256K1_PUB_TAG: [u8; 2] = [0xe7, 0x01];
const SECP256K1_PRIV_TAG: [u8; 2] = [0x81, 0x26];

#[derive(Debug, Error)]
pub enum MultikeyError {
    #[error("multibase value must start with 'z' (base58btc)")]
    MissingBasePrefix,

    #[error("invalid base58btc payload: {0}")]
    InvalidBase58(String),

    #[error("unsupported multicodec tag: {0}")]
    UnsupportedCodec(String),

    #[error("{key_type} key must be {expected} bytes, got {got}")]
    InvalidKeyLength {
        key_type: MultikeyType,
        expected: usize,
        got: usize,
    },
}

/// Key curves expressible as a multikey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MultikeyType {
    Ed25519,
    Secp256k1,
}

impl MultikeyType {
    /// Byte length of a public key of this type.
    pub fn public_key_len(&self) -> usize {
        match self {
            MultikeyType::Ed25519 => 32,
            MultikeyType::Secp256k1 => 33,
        }
    }

    fn tag(&self, private: bool) -> [u8; 2] {
        match (self, private) {
            (MultikeyType::Ed25519, false) => ED25519_PUB_TAG,
            (MultikeyType::Ed25519, true) => ED25519_PRIV_TAG,
            (MultikeyType::Secp256k1, false) => SECP256K1_PUB_TAG,
            (MultikeyType::Secp256k1, true) => SECP256K1_PRIV_TAG,
        }
    }

    fn expected_len(&self, private: bool) -> usize {
        if private {
            32
        } else {
            self.public_key_len()
        }
    }
}

impl std::fmt::Display for MultikeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MultikeyType::Ed25519 => f.write_str("Ed25519"),
            MultikeyType::Secp256k1 => f.write_str("Secp256k1"),
        }
    }
}

/// A decoded multikey: what it is and its raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMultikey {
    pub key_type: MultikeyType,
    pub is_private: bool,
    pub bytes: Vec<u8>,
}

/// Encode raw bytes as multibase base58btc.
pub fn encode_multibase(bytes: &[u8]) -> String {
    format!("{}{}", MULTIBASE_BASE58BTC_PREFIX, bs58::encode(bytes).into_string())
}

/// Decode a multibase base58btc string back to bytes.
pub fn decode_multibase(value: &str) -> Result<Vec<u8>, MultikeyError> {
    let payload = value
        .strip_prefix(MULTIBASE_BASE58BTC_PREFIX)
        .ok_or(MultikeyError::MissingBasePrefix)?;
    bs58::decode(payload)
        .into_vec()
        .map_err(|e| MultikeyError::InvalidBase58(e.to_string()))
}

/// Encode a public key as a multikey string.
pub fn encode_public_key(key_type: MultikeyType, bytes: &[u8]) -> Result<String, MultikeyError> {
    encode(key_type, false, bytes)
}

/// Encode a private key as a multikey string.
pub fn encode_private_key(key_type: MultikeyType, bytes: &[u8]) -> Result<String, MultikeyError> {
    encode(key_type, true, bytes)
}

fn encode(key_type: MultikeyType, private: bool, bytes: &[u8]) -> Result<String, MultikeyError> {
    let expected = key_type.expected_len(private);
    if bytes.len() != expected {
        return Err(MultikeyError::InvalidKeyLength {
            key_type,
            expected,
            got: bytes.len(),
        });
    }
    let mut buf = Vec::with_capacity(2 + bytes.len());
    buf.extend_from_slice(&key_type.tag(private));
    buf.extend_from_slice(bytes);
    Ok(encode_multibase(&buf))
}

/// Decode any supported multikey string, checking that the key length
/// matches the declared codec.
pub fn decode_multikey(value: &str) -> Result<DecodedMultikey, MultikeyError> {
    let raw = decode_multibase(value)?;
    if raw.len() < 2 {
        return Err(MultikeyError::UnsupportedCodec(hex::encode(&raw)));
    }
    let (tag, key) = raw.split_at(2);
    let (key_type, is_private) = match [tag[0], tag[1]] {
        ED25519_PUB_TAG => (MultikeyType::Ed25519, false),
        ED25519_PRIV_TAG => (MultikeyType::Ed25519, true),
        SECP256K1_PUB_TAG => (MultikeyType::Secp256k1, false),
        SECP256K1_PRIV_TAG => (MultikeyType::Secp256k1, true),
        _ => return Err(MultikeyError::UnsupportedCodec(hex::encode(tag))),
    };
    let expected = key_type.expected_len(is_private);
    if key.len() != expected {
        return Err(MultikeyError::InvalidKeyLength {
            key_type,
            expected,
            got: key.len(),
        });
    }
    Ok(DecodedMultikey {
        key_type,
        is_private,
        bytes: key.to_vec(),
    })
}

/// Decode a multikey that must be a public key.
pub fn decode_public_key(value: &str) -> Result<(MultikeyType, Vec<u8>), MultikeyError> {
    let decoded = decode_multikey(value)?;
    if decoded.is_private {
        return Err(MultikeyError::UnsupportedCodec(
            "private key codec where a public key was expected".into(),
        ));
    }
    Ok((decoded.key_type, decoded.bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ed25519_public_key_round_trip() {
        let key = [7u8; 32];
        let encoded = encode_public_key(MultikeyType::Ed25519, &key).unwrap();
        // Every Ed25519 multikey starts with "z6Mk".
        assert!(encoded.starts_with("z6Mk"), "got {encoded}");
        let (key_type, bytes) = decode_public_key(&encoded).unwrap();
        assert_eq!(key_type, MultikeyType::Ed25519);
        assert_eq!(bytes, key);
    }

    #[test]
    fn secp256k1_public_key_requires_33_bytes() {
        let err = encode_public_key(MultikeyType::Secp256k1, &[2u8; 32]).unwrap_err();
        assert!(matches!(err, MultikeyError::InvalidKeyLength { expected: 33, .. }));
        let mut key = [0u8; 33];
        key[0] = 0x02;
        let encoded = encode_public_key(MultikeyType::Secp256k1, &key).unwrap();
        assert!(encoded.starts_with("zQ3s"), "got {encoded}");
    }

    #[test]
    fn private_key_is_tagged_private() {
        let encoded = encode_private_key(MultikeyType::Ed25519, &[1u8; 32]).unwrap();
        let decoded = decode_multikey(&encoded).unwrap();
        assert!(decoded.is_private);
        assert!(decode_public_key(&encoded).is_err());
    }

    #[test]
    fn unknown_codec_rejected() {
        let encoded = encode_multibase(&[0x12, 0x20, 1, 2, 3]);
        assert!(matches!(
            decode_multikey(&encoded),
            Err(MultikeyError::UnsupportedCodec(_))
        ));
    }

    #[test]
    fn truncated_key_rejected() {
        let mut raw = ED25519_PUB_TAG.to_vec();
        raw.extend_from_slice(&[9u8; 31]);
        let encoded = encode_multibase(&raw);
        assert!(matches!(
            decode_multikey(&encoded),
            Err(MultikeyError::InvalidKeyLength { got: 31, .. })
        ));
    }

    #[test]
    fn missing_prefix_rejected() {
        assert!(matches!(
            decode_multibase("6MkhaXgBZD"),
            Err(MultikeyError::MissingBasePrefix)
        ));
        assert!(matches!(
            decode_multibase("z0OIl"),
            Err(MultikeyError::InvalidBase58(_))
        ));
    }
}
