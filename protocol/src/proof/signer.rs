//! # Proof Signers
//!
//! [`ProofSigner`] is the narrow seam custodial key services plug into:
//! hand over the document, the unsigned proof configuration and the
//! canonical hash of both, get back a `proofValue`. Canonicalization needs
//! the document loader, so it happens before the signer is called. The crate ships two implementations:
//!
//! - [`LocalSigner`] holds an Ed25519 key in process.
//! - [`KeyManagerSigner`] signs with a key held by a [`KeyManager`], so the
//!   secret never leaves the manager.

use async_trait::async_trait;
use serde_json::Value;

use super::eddsa::PrivateKeyInput;
use super::loader::did_key_verification_method;
use super::types::DataIntegrityProof;
use crate::crypto::keys::{EdKeypair, EdPublicKey, EdSignature};
use crate::crypto::multikey::encode_multibase;
use crate::error::{BtcoError, BtcoResult};
use crate::keys::KeyManager;

/// What a signer is asked to sign.
#[derive(Debug, Clone, Copy)]
pub struct SignRequest<'a> {
    pub document: &'a Value,
    /// Proof configuration, without `proofValue`.
    pub proof: &'a DataIntegrityProof,
    /// The 64 bytes to sign: both canonical hashes, configuration first.
    pub hash_data: &'a [u8; 64],
}

#[async_trait]
pub trait ProofSigner: Send + Sync {
    /// Id of the verification method proofs will name.
    fn verification_method_id(&self) -> String;

    /// Produce the multibase `proofValue` for `request`.
    async fn sign(&self, request: SignRequest<'_>) -> BtcoResult<String>;

    /// Check an Ed25519 signature.
    fn verify(&self, signature: &[u8], message: &[u8], public_key: &[u8]) -> bool {
        let (Ok(signature), Ok(public_key)) = (
            EdSignature::try_from_slice(signature),
            EdPublicKey::try_from_slice(public_key),
        ) else {
            return false;
        };
        public_key.verify(message, &signature)
    }
}

// ---------------------------------------------------------------------------
// LocalSigner
// ---------------------------------------------------------------------------

pub struct LocalSigner {
    keypair: EdKeypair,
    verification_method: String,
}

impl LocalSigner {
    pub fn new(key: &PrivateKeyInput, verification_method: impl Into<String>) -> BtcoResult<Self> {
        Ok(Self {
            keypair: key.to_keypair()?,
            verification_method: verification_method.into(),
        })
    }

    /// Signer naming the key's own `did:key` method.
    pub fn did_key(key: &PrivateKeyInput) -> BtcoResult<Self> {
        let keypair = key.to_keypair()?;
        let verification_method = did_key_verification_method(&keypair.public_key());
        Ok(Self {
            keypair,
            verification_method,
        })
    }

    pub fn public_key(&self) -> EdPublicKey {
        self.keypair.public_key()
    }
}

#[async_trait]
impl ProofSigner for LocalSigner {
    fn verification_method_id(&self) -> String {
        self.verification_method.clone()
    }

    async fn sign(&self, request: SignRequest<'_>) -> BtcoResult<String> {
        Ok(encode_multibase(self.keypair.sign(request.hash_data).as_bytes()))
    }
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner")
            .field("verification_method", &self.verification_method)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// KeyManagerSigner
// ---------------------------------------------------------------------------

/// Signs with a managed Ed25519 key.
#[derive(Debug, Clone)]
pub struct KeyManagerSigner {
    manager: KeyManager,
    key_id: String,
    verification_method: String,
}

impl KeyManagerSigner {
    /// `verification_method` defaults to the key's `did:key` method. Fails
    /// with `INVALID_KEY_TYPE` for non-Ed25519 keys.
    pub fn new(manager: KeyManager, key_id: &str, verification_method: Option<String>) -> BtcoResult<Self> {
        let public_key = manager.ed25519_public_key(key_id)?;
        Ok(Self {
            verification_method: verification_method.unwrap_or_else(|| did_key_verification_method(&public_key)),
            key_id: key_id.to_string(),
            manager,
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }
}

#[async_trait]
impl ProofSigner for KeyManagerSigner {
    fn verification_method_id(&self) -> String {
        self.verification_method.clone()
    }

    async fn sign(&self, request: SignRequest<'_>) -> BtcoResult<String> {
        let signature = self.manager.sign(&self.key_id, request.hash_data)?;
        if signature.len() != 64 {
            return Err(BtcoError::InvalidKeyType(format!("key {} did not produce an Ed25519 signature", self.key_id)));
        }
        Ok(encode_multibase(&signature))
    }
}
