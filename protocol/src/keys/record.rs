//! Key records as held by a [`KeyStore`](super::store::KeyStore).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::Network;
use crate::crypto::signatures::KeyType;

/// A stored key: identity, type, both halves of the key material, and the
/// optional alias/network it was created with.
///
/// The secret half is wiped from memory when the record is dropped and is
/// only reachable from inside the crate, so nothing outside the key manager
/// can copy it out.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct KeyRecord {
    #[zeroize(skip)]
    pub id: String,
    #[zeroize(skip)]
    pub key_type: KeyType,
    private_key: Vec<u8>,
    #[zeroize(skip)]
    pub public_key: Vec<u8>,
    #[zeroize(skip)]
    pub alias: Option<String>,
    #[zeroize(skip)]
    pub network: Option<Network>,
    #[zeroize(skip)]
    pub created_at: DateTime<Utc>,
}

impl KeyRecord {
    pub(crate) fn new(
        id: String,
        key_type: KeyType,
        private_key: Vec<u8>,
        public_key: Vec<u8>,
        alias: Option<String>,
        network: Option<Network>,
    ) -> Self {
        Self {
            id,
            key_type,
            private_key,
            public_key,
            alias,
            network,
            created_at: Utc::now(),
        }
    }

    pub(crate) fn secret(&self) -> &[u8] {
        &self.private_key
    }

    /// The shareable view of this record.
    pub fn info(&self) -> KeyInfo {
        KeyInfo {
            id: self.id.clone(),
            key_type: self.key_type,
            public_key: hex::encode(&self.public_key),
            alias: self.alias.clone(),
            network: self.network,
            created_at: self.created_at,
        }
    }
}

impl fmt::Debug for KeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRecord")
            .field("id", &self.id)
            .field("key_type", &self.key_type)
            .field("public_key", &hex::encode(&self.public_key))
            .field("alias", &self.alias)
            .field("network", &self.network)
            .finish_non_exhaustive()
    }
}

/// Public metadata about a managed key. Never carries secret material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub key_type: KeyType,
    /// Hex-encoded public key (32 bytes Ed25519/Schnorr, 33 bytes Secp256k1).
    pub public_key: String,
    pub alias: Option<String>,
    pub network: Option<Network>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_and_info_omit_secret() {
        let record = KeyRecord::new(
            "k1".into(),
            KeyType::Ed25519,
            vec![0xAB; 32],
            vec![0x01; 32],
            Some("main".into()),
            None,
        );
        let debug = format!("{:?}", record);
        assert!(!debug.contains(&"ab".repeat(32)));

        let json = serde_json::to_string(&record.info()).unwrap();
        assert!(!json.contains(&"ab".repeat(32)));
        assert!(json.contains("\"type\":\"Ed25519\""));
    }

    #[test]
    fn zeroize_wipes_secret() {
        let mut record = KeyRecord::new(
            "k1".into(),
            KeyType::Schnorr,
            vec![0x55; 32],
            vec![0x02; 32],
            None,
            Some(Network::Testnet),
        );
        record.zeroize();
        // Vec zeroize wipes the buffer and then truncates it.
        assert!(record.secret().is_empty());
        assert_eq!(record.id, "k1");
    }
}
