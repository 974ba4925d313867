//! # Key Manager
//!
//! Creates, imports and uses keys of the three supported types without ever
//! handing the secret half to a caller. Everything that needs a secret
//! (signing, address derivation, `did:key` rendering) goes through here.
//!
//! ## Address derivation
//!
//! | Key type    | Address                              |
//! |-------------|--------------------------------------|
//! | `Ed25519`   | none (not a ledger key)              |
//! | `Schnorr`   | P2TR, key-path only (`bc1p`/`tb1p`)  |
//! | `Secp256k1` | P2WPKH (`bc1q`/`tb1q`)               |

use std::sync::Arc;

use bitcoin::secp256k1::{Secp256k1, XOnlyPublicKey};
use bitcoin::{Address, CompressedPublicKey};
use tracing::{debug, info};
use uuid::Uuid;
use zeroize::Zeroizing;

use super::record::{KeyInfo, KeyRecord};
use super::store::{KeyStore, MemoryKeyStore};
use crate::config::Network;
use crate::crypto::keys::EdPublicKey;
use crate::crypto::signatures::{self, KeyType};
use crate::error::{BtcoError, BtcoResult};

/// Owns key material on behalf of the rest of the protocol.
#[derive(Clone)]
pub struct KeyManager {
    store: Arc<dyn KeyStore>,
    default_network: Network,
}

impl KeyManager {
    pub fn new(store: Arc<dyn KeyStore>, default_network: Network) -> Self {
        Self {
            store,
            default_network,
        }
    }

    /// A manager over a fresh [`MemoryKeyStore`].
    pub fn in_memory(default_network: Network) -> Self {
        Self::new(Arc::new(MemoryKeyStore::new()), default_network)
    }

    pub fn default_network(&self) -> Network {
        self.default_network
    }

    /// Generate a new key from the OS RNG and store it. Returns the key id.
    pub fn create_key(&self, key_type: KeyType, network: Option<Network>) -> BtcoResult<String> {
        let secret = Zeroizing::new(signatures::generate_secret(key_type));
        self.store_new(key_type, &secret[..], None, network)
    }

    /// Import an existing 32-byte private key.
    pub fn import_key(
        &self,
        private_key: &[u8],
        key_type: KeyType,
        alias: Option<String>,
    ) -> BtcoResult<String> {
        if private_key.len() != 32 {
            return Err(BtcoError::InvalidPrivateKeyLength {
                expected: "32",
                got: private_key.len(),
            });
        }
        if let Some(alias) = &alias {
            if alias.is_empty() {
                return Err(BtcoError::InvalidInput("alias must not be empty".into()));
            }
        }
        self.store_new(key_type, private_key, alias, None)
    }

    fn store_new(
        &self,
        key_type: KeyType,
        secret: &[u8],
        alias: Option<String>,
        network: Option<Network>,
    ) -> BtcoResult<String> {
        let public_key = signatures::public_key_for(key_type, secret)?;
        let id = Uuid::new_v4().to_string();
        let record = KeyRecord::new(
            id.clone(),
            key_type,
            secret.to_vec(),
            public_key,
            alias,
            network,
        );
        self.store.put(record)?;
        info!(key_id = %id, %key_type, "key stored");
        Ok(id)
    }

    /// Look a key up by id first, then by alias.
    pub fn get_key(&self, id_or_alias: &str) -> BtcoResult<Option<KeyInfo>> {
        Ok(self.lookup(id_or_alias)?.map(|r| r.info()))
    }

    fn lookup(&self, id_or_alias: &str) -> BtcoResult<Option<KeyRecord>> {
        if let Some(record) = self.store.get(id_or_alias)? {
            return Ok(Some(record));
        }
        Ok(self.store.find_by_alias(id_or_alias)?)
    }

    fn require(&self, id_or_alias: &str) -> BtcoResult<KeyRecord> {
        self.lookup(id_or_alias)?
            .ok_or_else(|| BtcoError::KeyNotFound(id_or_alias.to_string()))
    }

    /// Delete a key. Returns `false` if no such key existed.
    pub fn delete_key(&self, id_or_alias: &str) -> BtcoResult<bool> {
        let Some(record) = self.lookup(id_or_alias)? else {
            return Ok(false);
        };
        let removed = self.store.delete(&record.id)?;
        if removed {
            info!(key_id = %record.id, "key deleted");
        }
        Ok(removed)
    }

    /// Every managed key, oldest first.
    pub fn list_keys(&self) -> BtcoResult<Vec<KeyInfo>> {
        let mut keys: Vec<KeyInfo> = self.store.list()?.iter().map(KeyRecord::info).collect();
        keys.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(keys)
    }

    /// Sign `message` with the named key.
    pub fn sign(&self, id_or_alias: &str, message: &[u8]) -> BtcoResult<Vec<u8>> {
        let record = self.require(id_or_alias)?;
        debug!(key_id = %record.id, len = message.len(), "signing");
        Ok(signatures::sign(record.key_type, record.secret(), message)?)
    }

    /// Verify a signature against the named key's public half.
    pub fn verify(&self, id_or_alias: &str, message: &[u8], signature: &[u8]) -> BtcoResult<bool> {
        let record = self.require(id_or_alias)?;
        Ok(signatures::verify(
            record.key_type,
            &record.public_key,
            message,
            signature,
        ))
    }

    /// The ledger address controlled by this key, or `None` for Ed25519.
    pub fn derive_address(&self, id_or_alias: &str) -> BtcoResult<Option<String>> {
        let record = self.require(id_or_alias)?;
        let network = record.network.unwrap_or(self.default_network).to_bitcoin();
        let address = match record.key_type {
            KeyType::Ed25519 => return Ok(None),
            KeyType::Schnorr => {
                let secp = Secp256k1::verification_only();
                let xonly = XOnlyPublicKey::from_slice(&record.public_key)
                    .map_err(|e| BtcoError::InvalidInput(format!("stored x-only key: {e}")))?;
                Address::p2tr(&secp, xonly, None, network)
            }
            KeyType::Secp256k1 => {
                let pk = CompressedPublicKey::from_slice(&record.public_key)
                    .map_err(|e| BtcoError::InvalidInput(format!("stored public key: {e}")))?;
                Address::p2wpkh(&pk, network)
            }
        };
        Ok(Some(address.to_string()))
    }

    /// `did:key` identifier for an Ed25519 key.
    pub fn to_did(&self, id_or_alias: &str) -> BtcoResult<String> {
        Ok(self.ed25519_public_key(id_or_alias)?.to_did_key())
    }

    /// The public half of an Ed25519 key, for verification methods.
    pub fn ed25519_public_key(&self, id_or_alias: &str) -> BtcoResult<EdPublicKey> {
        let record = self.require(id_or_alias)?;
        if record.key_type != KeyType::Ed25519 {
            return Err(BtcoError::InvalidKeyType(format!(
                "{} keys have no did:key form, Ed25519 required",
                record.key_type
            )));
        }
        Ok(EdPublicKey::try_from_slice(&record.public_key)?)
    }
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("default_network", &self.default_network)
            .finish_non_exhaustive()
    }
}
