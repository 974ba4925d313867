//! # Cryptographic Primitives
//!
//! Thin, type-safe wrappers around audited implementations:
//!
//! - **Ed25519** (`ed25519-dalek`) for DID verification methods and
//!   Data-Integrity proofs.
//! - **secp256k1** ECDSA and BIP-340 Schnorr (`bitcoin::secp256k1`) for
//!   ledger keys and Taproot.
//! - **SHA-256** (`sha2`) for canonical document and content hashing.
//! - **Multikey / multibase** for self-describing key encoding.
//!
//! Nothing in here rolls its own curve arithmetic.

pub mod hash;
pub mod keys;
pub mod multikey;
pub mod signatures;

pub use hash::{sha256, sha256_hex};
pub use keys::{EdKeypair, EdPublicKey, EdSignature, KeyError};
pub use multikey::{decode_multikey, encode_multibase, decode_multibase, MultikeyType};
pub use signatures::KeyType;
