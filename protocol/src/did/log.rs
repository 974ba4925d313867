//! # DID Log
//!
//! The version history of a DID as newline-delimited JSON, one entry per
//! document version:
//!
//! ```text
//! {"@context":[...],"versionId":"1-z...","versionTime":"...","parameters":{...},"state":{...},"proof":[...]}
//! {"@context":[...],"versionId":"2-z...","versionTime":"...","parameters":{...},"state":{...},"proof":[...]}
//! ```
//!
//! Entries are JSON-LD under the `ordinals` vocabulary so they can carry
//! `eddsa-rdfc-2022` proofs; `state` brings its own DID contexts.
//!
//! `versionId` is `<n>-<entry hash>`, where the entry hash covers the entry
//! (without proofs) with its own `versionId` replaced by the previous one.
//! The first entry chains from the DID itself. Each entry must be signed by
//! a key listed in the `updateKeys` in force: its own for the first entry,
//! the previous entry's afterwards.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::document::DidDocument;
use crate::config::BTCO_CONTEXT_V1;
use crate::crypto::hash::sha256;
use crate::crypto::multikey::encode_multibase;
use crate::error::{BtcoError, BtcoResult};
use crate::proof::canonical::{canonical_json, canonicalize};
use crate::proof::eddsa::{create_proof_with_signer, verify_proof};
use crate::proof::loader::{load_verification_method, DocumentLoader};
use crate::proof::signer::ProofSigner;
use crate::proof::types::{xsd_datetime, DataIntegrityProof, ProofOptions, VerificationResult, VerifyOptions};

/// `parameters.method` of every entry.
pub const LOG_METHOD: &str = "did:btco:1.0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogParameters {
    pub method: String,
    /// Multikeys allowed to sign the next version.
    pub update_keys: Vec<String>,
    /// Whether the DID may move to a different identifier.
    pub portable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidLogEntry {
    #[serde(rename = "@context", default = "log_context")]
    pub context: Vec<String>,
    pub version_id: String,
    pub version_time: String,
    pub parameters: LogParameters,
    pub state: DidDocument,
    #[serde(default)]
    pub proof: Vec<DataIntegrityProof>,
}

fn log_context() -> Vec<String> {
    vec![BTCO_CONTEXT_V1.to_string()]
}

impl DidLogEntry {
    /// Sequence number encoded in `versionId`.
    pub fn version_number(&self) -> Option<u64> {
        self.version_id.split_once('-')?.0.parse().ok()
    }
}

/// Hash of `entry` chained onto `previous_version_id`.
fn entry_hash(entry: &DidLogEntry, previous_version_id: &str) -> BtcoResult<String> {
    let mut value = serde_json::to_value(DidLogEntry {
        version_id: previous_version_id.to_string(),
        proof: Vec::new(),
        ..entry.clone()
    })?;
    if let Some(object) = value.as_object_mut() {
        object.remove("proof");
    }
    Ok(encode_multibase(&sha256(canonical_json(&value).as_bytes())))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DidLog {
    entries: Vec<DidLogEntry>,
}

impl DidLog {
    /// A log whose first version is `state`.
    pub fn create(state: DidDocument, update_keys: Vec<String>, portable: bool) -> BtcoResult<Self> {
        if update_keys.is_empty() {
            return Err(BtcoError::InvalidInput("a DID log needs at least one update key".into()));
        }
        let mut log = Self::default();
        let parameters = LogParameters {
            method: LOG_METHOD.to_string(),
            update_keys,
            portable,
        };
        log.push(state, parameters)?;
        Ok(log)
    }

    /// Append an unsigned version. `update_keys` of `None` keeps the
    /// current set.
    pub fn update(&mut self, state: DidDocument, update_keys: Option<Vec<String>>) -> BtcoResult<&DidLogEntry> {
        let latest = self
            .latest()
            .ok_or_else(|| BtcoError::InvalidInput("cannot update an empty DID log".into()))?;
        if !latest.parameters.portable && state.id != latest.state.id {
            return Err(BtcoError::InvalidInput(format!(
                "log is not portable: {} cannot become {}",
                latest.state.id, state.id
            )));
        }
        let mut parameters = latest.parameters.clone();
        if let Some(keys) = update_keys {
            if keys.is_empty() {
                return Err(BtcoError::InvalidInput("update keys must not be empty".into()));
            }
            parameters.update_keys = keys;
        }
        self.push(state, parameters)?;
        self.latest()
            .ok_or_else(|| BtcoError::InvalidInput("log is empty after append".into()))
    }

    fn push(&mut self, state: DidDocument, parameters: LogParameters) -> BtcoResult<()> {
        let number = self.entries.len() + 1;
        let previous = match self.latest() {
            Some(entry) => entry.version_id.clone(),
            None => state.id.clone(),
        };
        let mut entry = DidLogEntry {
            context: log_context(),
            version_id: String::new(),
            version_time: xsd_datetime(chrono::Utc::now()),
            parameters,
            state,
            proof: Vec::new(),
        };
        entry.version_id = format!("{number}-{}", entry_hash(&entry, &previous)?);
        info!(version_id = %entry.version_id, did = %entry.state.id, "appended DID log entry");
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[DidLogEntry] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&DidLogEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a proof by `signer` to the entry at `index`.
    pub async fn sign_entry(
        &mut self,
        index: usize,
        signer: &dyn ProofSigner,
        loader: &dyn DocumentLoader,
    ) -> BtcoResult<DataIntegrityProof> {
        let entry = self
            .entries
            .get(index)
            .ok_or_else(|| BtcoError::InvalidInput(format!("no log entry at index {index}")))?;
        let value = serde_json::to_value(entry)?;
        let proof = create_proof_with_signer(&value, &ProofOptions::default(), signer, loader).await?;
        debug!(index, verification_method = %proof.verification_method, "signed DID log entry");
        if let Some(entry) = self.entries.get_mut(index) {
            entry.proof.push(proof.clone());
        }
        Ok(proof)
    }

    /// Sign the most recent entry.
    pub async fn sign_latest(
        &mut self,
        signer: &dyn ProofSigner,
        loader: &dyn DocumentLoader,
    ) -> BtcoResult<DataIntegrityProof> {
        let index = self
            .entries
            .len()
            .checked_sub(1)
            .ok_or_else(|| BtcoError::InvalidInput("cannot sign an empty DID log".into()))?;
        self.sign_entry(index, signer, loader).await
    }

    /// One canonical JSON entry per line.
    pub fn to_jsonl(&self) -> BtcoResult<String> {
        let mut out = String::new();
        for entry in &self.entries {
            let line = String::from_utf8(canonicalize(entry)?)
                .map_err(|e| BtcoError::Serialization(e.to_string()))?;
            out.push_str(&line);
            out.push('\n');
        }
        Ok(out)
    }

    /// Parse a JSONL log. Blank lines are skipped.
    pub fn from_jsonl(jsonl: &str) -> BtcoResult<Self> {
        let entries = jsonl
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line)
                    .map_err(|e| BtcoError::InvalidJson(format!("DID log line {}: {e}", n + 1)))
            })
            .collect::<BtcoResult<Vec<DidLogEntry>>>()?;
        Ok(Self { entries })
    }

    /// Check version continuity and every entry's proofs.
    pub async fn verify(&self, loader: &dyn DocumentLoader) -> VerificationResult {
        if self.entries.is_empty() {
            return VerificationResult::failure("DID log is empty");
        }
        let mut errors = Vec::new();
        let mut previous: Option<&DidLogEntry> = None;

        for (i, entry) in self.entries.iter().enumerate() {
            let label = format!("entry {}", i + 1);
            let chained_from = previous
                .map(|p| p.version_id.clone())
                .unwrap_or_else(|| entry.state.id.clone());
            match entry_hash(entry, &chained_from) {
                Ok(hash) if entry.version_id == format!("{}-{hash}", i + 1) => {}
                Ok(_) => errors.push(format!("{label}: versionId {} does not match its content", entry.version_id)),
                Err(e) => errors.push(format!("{label}: {e}")),
            }
            if entry.parameters.method != LOG_METHOD {
                errors.push(format!("{label}: unsupported method '{}'", entry.parameters.method));
            }
            if let Some(prev) = previous {
                if entry.version_time < prev.version_time {
                    errors.push(format!("{label}: versionTime goes backwards"));
                }
                if !prev.parameters.portable && entry.state.id != prev.state.id {
                    errors.push(format!("{label}: id changed on a non-portable DID"));
                }
            }

            let authorized = previous.map(|p| &p.parameters.update_keys).unwrap_or(&entry.parameters.update_keys);
            errors.extend(
                verify_entry_proofs(entry, authorized, loader)
                    .await
                    .into_iter()
                    .map(|e| format!("{label}: {e}")),
            );
            previous = Some(entry);
        }

        if errors.is_empty() {
            VerificationResult::success()
        } else {
            VerificationResult {
                verified: false,
                errors: Some(errors),
            }
        }
    }
}

async fn verify_entry_proofs(entry: &DidLogEntry, authorized: &[String], loader: &dyn DocumentLoader) -> Vec<String> {
    if entry.proof.is_empty() {
        return vec!["no proof".to_string()];
    }
    let value = match serde_json::to_value(entry) {
        Ok(value) => value,
        Err(e) => return vec![e.to_string()],
    };

    let mut errors = Vec::new();
    for proof in &entry.proof {
        let result = verify_proof(&value, proof, &VerifyOptions::default(), loader).await;
        errors.extend(result.errors().iter().cloned());
        if result.verified && !is_authorized(proof, authorized, loader).await {
            errors.push(format!("{} is not an authorized update key", proof.verification_method));
        }
    }
    errors
}

async fn is_authorized(proof: &DataIntegrityProof, authorized: &[String], loader: &dyn DocumentLoader) -> bool {
    match load_verification_method(loader, &proof.verification_method).await {
        Ok(method) => authorized.contains(&method.public_key_multibase),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Network;
    use crate::crypto::keys::EdKeypair;
    use crate::did::document::{create_did_document, DidDocumentOptions};
    use crate::proof::eddsa::PrivateKeyInput;
    use crate::proof::loader::StaticDocumentLoader;
    use crate::proof::signer::LocalSigner;

    struct Fixture {
        log: DidLog,
        signer: LocalSigner,
        loader: StaticDocumentLoader,
    }

    async fn signed_log() -> Fixture {
        let keypair = EdKeypair::generate();
        let signer = LocalSigner::did_key(&PrivateKeyInput::from(&keypair)).unwrap();
        let loader = StaticDocumentLoader::new();
        let state = create_did_document(500, Network::Mainnet, DidDocumentOptions::default()).unwrap().document;
        let mut log = DidLog::create(state, vec![keypair.public_key().to_multikey()], false).unwrap();
        log.sign_latest(&signer, &loader).await.unwrap();
        Fixture { log, signer, loader }
    }

    #[tokio::test]
    async fn signed_log_verifies_and_round_trips_as_jsonl() {
        let Fixture { mut log, signer, loader } = signed_log().await;
        let next = create_did_document(500, Network::Mainnet, DidDocumentOptions::default()).unwrap().document;
        log.update(next, None).unwrap();
        log.sign_latest(&signer, &loader).await.unwrap();

        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[1].version_number(), Some(2));
        assert!(log.verify(&loader).await.verified);

        let jsonl = log.to_jsonl().unwrap();
        assert_eq!(jsonl.lines().count(), 2);
        let parsed = DidLog::from_jsonl(&jsonl).unwrap();
        assert_eq!(parsed, log);
        assert!(parsed.verify(&loader).await.verified);
    }

    #[tokio::test]
    async fn unsigned_or_unauthorized_entries_fail() {
        let Fixture { mut log, loader, .. } = signed_log().await;
        let next = create_did_document(500, Network::Mainnet, DidDocumentOptions::default()).unwrap().document;
        log.update(next, None).unwrap();
        let result = log.verify(&loader).await;
        assert!(!result.verified);
        assert!(result.errors()[0].contains("no proof"));

        let stranger = LocalSigner::did_key(&PrivateKeyInput::from(&EdKeypair::generate())).unwrap();
        log.sign_latest(&stranger, &loader).await.unwrap();
        let result = log.verify(&loader).await;
        assert!(result.errors().iter().any(|e| e.contains("not an authorized update key")));
    }

    #[tokio::test]
    async fn tampered_state_breaks_the_chain() {
        let Fixture { log, loader, .. } = signed_log().await;
        let mut jsonl = log.to_jsonl().unwrap();
        jsonl = jsonl.replace("did:btco:500", "did:btco:501");
        let tampered = DidLog::from_jsonl(&jsonl).unwrap();
        assert!(!tampered.verify(&loader).await.verified);
    }

    #[test]
    fn non_portable_logs_keep_their_id() {
        let state = create_did_document(1, Network::Mainnet, DidDocumentOptions::default()).unwrap().document;
        let mut log = DidLog::create(state, vec!["z6Mk".into()], false).unwrap();
        let moved = create_did_document(2, Network::Mainnet, DidDocumentOptions::default()).unwrap().document;
        assert_eq!(log.update(moved.clone(), None).unwrap_err().code(), "INVALID_INPUT");

        let state = create_did_document(1, Network::Mainnet, DidDocumentOptions::default()).unwrap().document;
        let mut portable = DidLog::create(state, vec!["z6Mk".into()], true).unwrap();
        assert!(portable.update(moved, Some(vec!["z6Mk2".into()])).is_ok());
        assert_eq!(portable.latest().unwrap().parameters.update_keys, vec!["z6Mk2".to_string()]);
    }

    #[test]
    fn bad_jsonl_reports_the_line() {
        let err = DidLog::from_jsonl("\n{broken").unwrap_err();
        assert_eq!(err.code(), "INVALID_JSON");
        assert!(err.to_string().contains("line 2"));
        assert!(DidLog::create(
            create_did_document(1, Network::Mainnet, DidDocumentOptions::default()).unwrap().document,
            vec![],
            false
        )
        .is_err());
    }
}
