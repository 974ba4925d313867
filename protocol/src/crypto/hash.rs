//! # Hashing Utilities
//!
//! SHA-256 is the only digest this protocol needs: it hashes canonical
//! documents for Data-Integrity proofs, content for credential subjects, and
//! messages before secp256k1 signing. Bitcoin-side hashing (txids, tapleaf
//! and sighash digests) is handled by the `bitcoin` crate itself.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 digest of `data`.
///
/// # Example
///
/// ```
/// use btco_protocol::crypto::sha256;
///
/// let hash = sha256(b"btco");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// SHA-256 digest as lowercase hex, the form used in `ContentInfo.hash`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Hash two inputs independently and concatenate the digests.
///
/// This is the Data-Integrity "hash data" construction: the proof
/// configuration and the document are never hashed together, so neither can
/// be shifted into the other to forge a collision.
pub fn concat_hashes(first: &[u8], second: &[u8]) -> [u8; 64] {
    let mut out = [0u8; 64];
    out[..32].copy_from_slice(&sha256(first));
    out[32..].copy_from_slice(&sha256(second));
    out
}
