//! # `eddsa-rdfc-2022` Cryptosuite
//!
//! ```text
//!   proof config ──JSON-LD──> quads ──RDFC-1.0──> SHA-256 ─┐
//!   (+ document @context)                                   ├─ 64 bytes ──Ed25519──> proofValue
//!   document ────JSON-LD──> quads ──RDFC-1.0──> SHA-256 ─┘                            (z + base58btc)
//!   (without proof)
//! ```
//!
//! Both inputs are expanded through the contexts they name, each one
//! dereferenced by the [`DocumentLoader`], so documents that differ only in
//! compaction (term vs compact IRI vs full IRI, key order, blank node
//! labels) hash the same. A term the contexts do not define is an error,
//! never silently dropped. The `@context` of the document is folded into
//! the proof configuration before hashing but never emitted on the proof.
//!
//! `eddsa-jcs-2022` is kept as a second suite for plain JSON: it hashes
//! sorted-key JSON and only checks that the named contexts load.
//!
//! Verification never returns an error: every failure comes back as
//! `{verified: false, errors: [...]}`.

use serde_json::Value;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::canonical::canonical_bytes;
use super::jsonld::{to_rdf, ContextSet};
use super::loader::{load_document, load_verification_method, DocumentLoader};
use super::rdf::canonicalize;
use super::signer::{ProofSigner, SignRequest};
use super::types::{
    Cryptosuite, DataIntegrityProof, ProofOptions, VerificationResult, VerifyOptions, DATA_INTEGRITY_PROOF,
};
use crate::config::DATA_INTEGRITY_CONTEXT_V2;
use crate::crypto::hash::{concat_hashes, sha256};
use crate::crypto::keys::{EdKeypair, EdSignature, ED25519_SECRET_KEY_LENGTH};
use crate::crypto::multikey::{decode_multibase, decode_multikey, encode_multibase, MultikeyType};
use crate::error::{BtcoError, BtcoResult};

const UNKNOWN_VERIFICATION_ERROR: &str = "Unknown verification error";

// ---------------------------------------------------------------------------
// Private key input
// ---------------------------------------------------------------------------

/// The accepted shapes of an Ed25519 private key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub enum PrivateKeyInput {
    RawBytes32([u8; 32]),
    /// Seed followed by public key, as some wallets export it. Only the
    /// seed is used.
    RawBytes64([u8; 64]),
    /// A private multikey (`z3u2...`).
    EncodedMultikey(String),
}

impl PrivateKeyInput {
    /// Classify raw bytes by length.
    pub fn from_bytes(bytes: &[u8]) -> BtcoResult<Self> {
        match bytes.len() {
            32 => {
                let mut raw = [0u8; 32];
                raw.copy_from_slice(bytes);
                Ok(Self::RawBytes32(raw))
            }
            64 => {
                let mut raw = [0u8; 64];
                raw.copy_from_slice(bytes);
                Ok(Self::RawBytes64(raw))
            }
            got => Err(BtcoError::InvalidPrivateKeyLength {
                expected: "32 or 64",
                got,
            }),
        }
    }

    pub fn from_multikey(value: &str) -> Self {
        Self::EncodedMultikey(value.to_string())
    }

    /// Normalize to a keypair.
    pub fn to_keypair(&self) -> BtcoResult<EdKeypair> {
        match self {
            Self::RawBytes32(seed) => Ok(EdKeypair::from_seed(seed)),
            Self::RawBytes64(bytes) => {
                warn!("64-byte Ed25519 private key supplied; using the first 32 bytes as the seed");
                let mut seed = Zeroizing::new([0u8; ED25519_SECRET_KEY_LENGTH]);
                seed.copy_from_slice(&bytes[..ED25519_SECRET_KEY_LENGTH]);
                Ok(EdKeypair::from_seed(&seed))
            }
            Self::EncodedMultikey(value) => {
                let decoded = decode_multikey(value)?;
                let bytes = Zeroizing::new(decoded.bytes);
                if decoded.key_type != MultikeyType::Ed25519 {
                    return Err(BtcoError::InvalidKeyType(format!(
                        "expected an Ed25519 private key, got {}",
                        decoded.key_type
                    )));
                }
                if !decoded.is_private {
                    return Err(BtcoError::InvalidKeyType("expected a private multikey, got a public one".into()));
                }
                Ok(EdKeypair::from_slice(&bytes)?)
            }
        }
    }
}

impl From<&EdKeypair> for PrivateKeyInput {
    fn from(keypair: &EdKeypair) -> Self {
        Self::RawBytes32(keypair.secret_key_bytes())
    }
}

impl std::fmt::Debug for PrivateKeyInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::RawBytes32(_) => "RawBytes32",
            Self::RawBytes64(_) => "RawBytes64",
            Self::EncodedMultikey(_) => "EncodedMultikey",
        };
        write!(f, "PrivateKeyInput::{kind}(<redacted>)")
    }
}

// ---------------------------------------------------------------------------
// Hashing
// ---------------------------------------------------------------------------

/// `SHA-256(canonical(proof config)) || SHA-256(canonical(document))`,
/// canonicalized the way `proof.cryptosuite` names.
///
/// Any `proof` member of `document` and any `proofValue` on `proof` are
/// ignored. The configuration takes the document's `@context`.
pub async fn hash_data(
    document: &Value,
    proof: &DataIntegrityProof,
    loader: &dyn DocumentLoader,
) -> BtcoResult<[u8; 64]> {
    let suite = Cryptosuite::parse(&proof.cryptosuite)?;
    let mut unsecured = document.clone();
    if let Some(object) = unsecured.as_object_mut() {
        object.remove("proof");
    }
    let mut config = serde_json::to_value(proof.without_value())?;

    let (config_bytes, document_bytes) = match suite {
        Cryptosuite::EddsaRdfc2022 => {
            if let Some(object) = config.as_object_mut() {
                object.insert("@context".to_string(), proof_context(document.get("@context")));
            }
            let contexts = ContextSet::load(&[&unsecured, &config], loader).await?;
            let config_nquads = canonicalize(&to_rdf(&config, &contexts)?)?;
            let document_nquads = canonicalize(&to_rdf(&unsecured, &contexts)?)?;
            (config_nquads.into_bytes(), document_nquads.into_bytes())
        }
        Cryptosuite::EddsaJcs2022 => {
            if let (Some(context), Some(object)) = (document.get("@context"), config.as_object_mut()) {
                object.insert("@context".to_string(), context.clone());
            }
            check_contexts(document, loader).await?;
            (canonical_bytes(&config), canonical_bytes(&unsecured))
        }
    };
    debug!(cryptosuite = %suite, "hashed proof input");
    Ok(concat_hashes(&sha256(&config_bytes), &sha256(&document_bytes)))
}

/// The document's contexts, with the Data-Integrity context appended when
/// the document does not already name it.
fn proof_context(context: Option<&Value>) -> Value {
    let mut entries = match context {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(entries)) => entries.clone(),
        Some(other) => vec![other.clone()],
    };
    if !entries.iter().any(|c| c.as_str() == Some(DATA_INTEGRITY_CONTEXT_V2)) {
        entries.push(Value::String(DATA_INTEGRITY_CONTEXT_V2.to_string()));
    }
    Value::Array(entries)
}

/// Every context IRI named by `document` must dereference.
async fn check_contexts(document: &Value, loader: &dyn DocumentLoader) -> BtcoResult<()> {
    let iris: Vec<&str> = match document.get("@context") {
        None => Vec::new(),
        Some(Value::String(iri)) => vec![iri.as_str()],
        Some(Value::Array(entries)) => entries.iter().filter_map(Value::as_str).collect(),
        Some(Value::Object(_)) => Vec::new(),
        Some(other) => return Err(BtcoError::InvalidInput(format!("invalid @context: {other}"))),
    };
    for iri in iris {
        load_document(loader, iri).await?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// Sign `document` with `key`.
pub async fn create_proof(
    document: &Value,
    options: &ProofOptions,
    key: &PrivateKeyInput,
    loader: &dyn DocumentLoader,
) -> BtcoResult<DataIntegrityProof> {
    let keypair = key.to_keypair()?;
    let config = prepare(document, options, loader).await?;
    let signature = keypair.sign(&hash_data(document, &config, loader).await?);
    Ok(DataIntegrityProof {
        proof_value: Some(encode_multibase(signature.as_bytes())),
        ..config
    })
}

/// Sign `document` through a [`ProofSigner`]. `options.verification_method`
/// defaults to the signer's.
pub async fn create_proof_with_signer(
    document: &Value,
    options: &ProofOptions,
    signer: &dyn ProofSigner,
    loader: &dyn DocumentLoader,
) -> BtcoResult<DataIntegrityProof> {
    let mut options = options.clone();
    if options.verification_method.is_empty() {
        options.verification_method = signer.verification_method_id();
    }
    let config = prepare(document, &options, loader).await?;
    let hash = hash_data(document, &config, loader).await?;
    let proof_value = signer
        .sign(SignRequest {
            document,
            proof: &config,
            hash_data: &hash,
        })
        .await?;
    Ok(DataIntegrityProof {
        proof_value: Some(proof_value),
        ..config
    })
}

async fn prepare(
    document: &Value,
    options: &ProofOptions,
    loader: &dyn DocumentLoader,
) -> BtcoResult<DataIntegrityProof> {
    if !document.is_object() {
        return Err(BtcoError::InvalidInput("only JSON objects can be signed".into()));
    }
    if options.verification_method.trim().is_empty() {
        return Err(BtcoError::InvalidInput("verification method is required".into()));
    }
    let config = DataIntegrityProof::configuration(options);
    debug!(
        verification_method = %config.verification_method,
        purpose = %config.proof_purpose,
        "creating proof"
    );
    Ok(config)
}

/// `document` with `proof` appended to whatever proofs it already carries.
pub fn attach_proof(document: &Value, proof: &DataIntegrityProof) -> BtcoResult<Value> {
    let mut secured = document.clone();
    let object = secured
        .as_object_mut()
        .ok_or_else(|| BtcoError::InvalidInput("only JSON objects can carry proofs".into()))?;
    let proof = serde_json::to_value(proof)?;
    let merged = match object.remove("proof") {
        None => proof,
        Some(Value::Array(mut existing)) => {
            existing.push(proof);
            Value::Array(existing)
        }
        Some(existing) => Value::Array(vec![existing, proof]),
    };
    object.insert("proof".to_string(), merged);
    Ok(secured)
}

// ---------------------------------------------------------------------------
// Verify
// ---------------------------------------------------------------------------

/// Check `proof` over `document`. Never fails.
pub async fn verify_proof(
    document: &Value,
    proof: &DataIntegrityProof,
    options: &VerifyOptions,
    loader: &dyn DocumentLoader,
) -> VerificationResult {
    match try_verify(document, proof, options, loader).await {
        Ok(()) => VerificationResult::success(),
        Err(err) => {
            let message = err.to_string();
            debug!(verification_method = %proof.verification_method, error = %message, "proof rejected");
            if message.trim().is_empty() {
                VerificationResult::failure(UNKNOWN_VERIFICATION_ERROR)
            } else {
                VerificationResult::failure(message)
            }
        }
    }
}

/// Verify every proof embedded in `secured` (a single object or an array).
pub async fn verify_document(secured: &Value, options: &VerifyOptions, loader: &dyn DocumentLoader) -> VerificationResult {
    let proofs: Vec<Value> = match secured.get("proof") {
        None => return VerificationResult::failure("document carries no proof"),
        Some(Value::Array(proofs)) if proofs.is_empty() => {
            return VerificationResult::failure("document carries no proof")
        }
        Some(Value::Array(proofs)) => proofs.clone(),
        Some(proof) => vec![proof.clone()],
    };

    let mut errors = Vec::new();
    for (i, raw) in proofs.into_iter().enumerate() {
        let proof: DataIntegrityProof = match serde_json::from_value(raw) {
            Ok(proof) => proof,
            Err(e) => {
                errors.push(format!("proof[{i}] is malformed: {e}"));
                continue;
            }
        };
        let result = verify_proof(secured, &proof, options, loader).await;
        errors.extend(result.errors().iter().map(|e| format!("proof[{i}]: {e}")));
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

async fn try_verify(
    document: &Value,
    proof: &DataIntegrityProof,
    options: &VerifyOptions,
    loader: &dyn DocumentLoader,
) -> BtcoResult<()> {
    if proof.type_ != DATA_INTEGRITY_PROOF {
        return Err(BtcoError::VerificationFailed(format!("unsupported proof type '{}'", proof.type_)));
    }
    Cryptosuite::parse(&proof.cryptosuite)?;
    if let Some(expected) = &options.expected_proof_purpose {
        if &proof.proof_purpose != expected {
            return Err(BtcoError::VerificationFailed(format!(
                "proof purpose '{}' does not match expected '{expected}'",
                proof.proof_purpose
            )));
        }
    }
    if options.challenge.is_some() && proof.challenge != options.challenge {
        return Err(BtcoError::VerificationFailed("challenge does not match".into()));
    }
    if options.domain.is_some() && proof.domain != options.domain {
        return Err(BtcoError::VerificationFailed("domain does not match".into()));
    }

    let proof_value = proof
        .proof_value
        .as_deref()
        .ok_or_else(|| BtcoError::VerificationFailed("proof has no proofValue".into()))?;
    let signature = EdSignature::try_from_slice(&decode_multibase(proof_value)?)?;

    let hash = hash_data(document, proof, loader).await?;
    let method = load_verification_method(loader, &proof.verification_method).await?;
    let (key_type, _) = method.decode_key().map_err(BtcoError::VerificationFailed)?;
    if key_type != MultikeyType::Ed25519 {
        return Err(BtcoError::InvalidKeyType(format!(
            "verification method {} is {key_type}, not Ed25519",
            method.id
        )));
    }
    let public_key = method
        .ed25519_key()
        .ok_or_else(|| BtcoError::VerificationFailed(format!("{} is not a valid Ed25519 key", method.id)))?;

    if !public_key.verify(&hash, &signature) {
        return Err(BtcoError::VerificationFailed("signature does not match".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BTCO_CONTEXT_V1, DID_CONTEXT_V1, VC_CONTEXT_V1};
    use crate::crypto::multikey::encode_private_key;
    use crate::proof::loader::{did_key_verification_method, StaticDocumentLoader};
    use crate::proof::types::{Cryptosuite, AUTHENTICATION, EDDSA_JCS_2022};
    use serde_json::json;

    fn document() -> Value {
        json!({
            "@context": [VC_CONTEXT_V1, BTCO_CONTEXT_V1],
            "id": "urn:uuid:8a4c",
            "name": "satoshi",
            "nested": {"b": 2, "a": [1, 2, 3]}
        })
    }

    async fn signed(keypair: &EdKeypair, doc: &Value) -> DataIntegrityProof {
        let options = ProofOptions::new(did_key_verification_method(&keypair.public_key()));
        create_proof(doc, &options, &PrivateKeyInput::from(keypair), &StaticDocumentLoader::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn round_trip_verifies() {
        let keypair = EdKeypair::generate();
        let doc = document();
        let proof = signed(&keypair, &doc).await;
        assert!(proof.proof_value.as_deref().unwrap().starts_with('z'));
        assert_eq!(proof.proof_purpose, "assertionMethod");

        let result = verify_proof(&doc, &proof, &VerifyOptions::default(), &StaticDocumentLoader::new()).await;
        assert_eq!(result, VerificationResult::success());
    }

    #[tokio::test]
    async fn a_different_key_fails() {
        let signer = EdKeypair::generate();
        let other = EdKeypair::generate();
        let doc = document();
        let mut proof = signed(&signer, &doc).await;
        proof.verification_method = did_key_verification_method(&other.public_key());

        let result = verify_proof(&doc, &proof, &VerifyOptions::default(), &StaticDocumentLoader::new()).await;
        assert!(!result.verified);
        assert_eq!(result.errors().len(), 1);
    }

    #[tokio::test]
    async fn tampering_fails() {
        let keypair = EdKeypair::generate();
        let doc = document();
        let proof = signed(&keypair, &doc).await;
        let loader = StaticDocumentLoader::new();

        let mut changed = doc.clone();
        changed["name"] = json!("nakamoto");
        assert!(!verify_proof(&changed, &proof, &VerifyOptions::default(), &loader).await.verified);

        let mut relabeled = proof.clone();
        relabeled.proof_purpose = AUTHENTICATION.into();
        assert!(!verify_proof(&doc, &relabeled, &VerifyOptions::default(), &loader).await.verified);
    }

    #[tokio::test]
    async fn key_order_does_not_matter() {
        let keypair = EdKeypair::generate();
        let doc = document();
        let proof = signed(&keypair, &doc).await;
        let reordered: Value = serde_json::from_str(
            &format!(r#"{{"nested":{{"a":[1,2,3],"b":2}},"name":"satoshi","id":"urn:uuid:8a4c","@context":["{VC_CONTEXT_V1}","{BTCO_CONTEXT_V1}"]}}"#),
        )
        .unwrap();
        assert!(verify_proof(&reordered, &proof, &VerifyOptions::default(), &StaticDocumentLoader::new()).await.verified);
    }

    #[tokio::test]
    async fn compaction_does_not_change_the_hash() {
        let keypair = EdKeypair::generate();
        let loader = StaticDocumentLoader::new();
        let compact = json!({
            "@context": [VC_CONTEXT_V1, BTCO_CONTEXT_V1],
            "id": "urn:uuid:8a4c",
            "title": "Genesis",
            "contentInfo": {"mimeType": "image/png", "size": 5120}
        });
        let prefixed = json!({
            "@context": [VC_CONTEXT_V1, BTCO_CONTEXT_V1],
            "@id": "urn:uuid:8a4c",
            "ordinals:title": "Genesis",
            "ordinals:contentInfo": {"ordinals:size": 5120, "ordinals:mimeType": "image/png"}
        });
        let expanded = json!({
            "@context": [VC_CONTEXT_V1, BTCO_CONTEXT_V1],
            "@id": "urn:uuid:8a4c",
            "https://ordinals.plus/v1#title": [{"@value": "Genesis"}],
            "https://ordinals.plus/v1#contentInfo": [{
                "https://ordinals.plus/v1#mimeType": "image/png",
                "https://ordinals.plus/v1#size": {"@value": 5120}
            }]
        });

        let proof = signed(&keypair, &compact).await;
        assert_eq!(proof.cryptosuite, "eddsa-rdfc-2022");
        let reference = hash_data(&compact, &proof, &loader).await.unwrap();
        assert_eq!(reference, hash_data(&prefixed, &proof, &loader).await.unwrap());
        assert_eq!(reference, hash_data(&expanded, &proof, &loader).await.unwrap());
        assert!(verify_proof(&expanded, &proof, &VerifyOptions::default(), &loader).await.verified);

        let mut changed = expanded.clone();
        changed["https://ordinals.plus/v1#title"] = json!("Exodus");
        assert!(!verify_proof(&changed, &proof, &VerifyOptions::default(), &loader).await.verified);
    }

    #[tokio::test]
    async fn jcs_suite_signs_plain_json() {
        let keypair = EdKeypair::generate();
        let loader = StaticDocumentLoader::new();
        let doc = json!({"@context": [VC_CONTEXT_V1], "anything": {"goes": true}});
        let options = ProofOptions::new(did_key_verification_method(&keypair.public_key()))
            .with_cryptosuite(Cryptosuite::EddsaJcs2022);
        let proof = create_proof(&doc, &options, &PrivateKeyInput::from(&keypair), &loader)
            .await
            .unwrap();
        assert_eq!(proof.cryptosuite, EDDSA_JCS_2022);
        assert!(verify_proof(&doc, &proof, &VerifyOptions::default(), &loader).await.verified);

        // Sorted-key JSON is not JSON-LD aware.
        let renamed = json!({"@context": [VC_CONTEXT_V1], "https://ordinals.plus/v1#anything": {"goes": true}});
        assert!(!verify_proof(&renamed, &proof, &VerifyOptions::default(), &loader).await.verified);
    }

    #[tokio::test]
    async fn undefined_terms_cannot_be_signed() {
        let keypair = EdKeypair::generate();
        let doc = json!({"@context": [VC_CONTEXT_V1], "nickname": "satoshi"});
        let options = ProofOptions::new(did_key_verification_method(&keypair.public_key()));
        let err = create_proof(&doc, &options, &PrivateKeyInput::from(&keypair), &StaticDocumentLoader::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
        assert!(err.to_string().contains("nickname"));
    }

    #[tokio::test]
    async fn unknown_cryptosuites_fail_verification() {
        let keypair = EdKeypair::generate();
        let doc = document();
        let mut proof = signed(&keypair, &doc).await;
        proof.cryptosuite = "ecdsa-rdfc-2019".into();
        let result = verify_proof(&doc, &proof, &VerifyOptions::default(), &StaticDocumentLoader::new()).await;
        assert!(!result.verified);
        assert!(result.errors()[0].contains("unsupported cryptosuite"));
    }

    #[tokio::test]
    async fn private_key_shapes() {
        let keypair = EdKeypair::generate();
        let seed = keypair.secret_key_bytes();
        let mut long = seed.to_vec();
        long.extend_from_slice(keypair.public_key().as_bytes());

        let from64 = PrivateKeyInput::from_bytes(&long).unwrap().to_keypair().unwrap();
        assert_eq!(from64.public_key(), keypair.public_key());

        let multikey = encode_private_key(MultikeyType::Ed25519, &seed).unwrap();
        let from_multikey = PrivateKeyInput::from_multikey(&multikey).to_keypair().unwrap();
        assert_eq!(from_multikey.public_key(), keypair.public_key());

        let err = PrivateKeyInput::from_bytes(&[1u8; 31]).unwrap_err();
        assert_eq!(err.code(), "INVALID_PRIVATE_KEY_LENGTH");

        let secp = encode_private_key(MultikeyType::Secp256k1, &[3u8; 32]).unwrap();
        let err = PrivateKeyInput::from_multikey(&secp).to_keypair().unwrap_err();
        assert_eq!(err.code(), "INVALID_KEY_TYPE");
        assert!(!format!("{:?}", PrivateKeyInput::from(&keypair)).contains(&hex::encode(seed)));
    }

    #[tokio::test]
    async fn unknown_context_is_refused() {
        let keypair = EdKeypair::generate();
        let doc = json!({"@context": [DID_CONTEXT_V1, "https://example.com/ctx"], "a": 1});
        let options = ProofOptions::new(did_key_verification_method(&keypair.public_key()));
        let err = create_proof(&doc, &options, &PrivateKeyInput::from(&keypair), &StaticDocumentLoader::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "LOADER_ERROR");
    }

    #[tokio::test]
    async fn verifier_expectations_are_enforced() {
        let keypair = EdKeypair::generate();
        let doc = document();
        let options = ProofOptions::new(did_key_verification_method(&keypair.public_key()))
            .with_purpose(AUTHENTICATION)
            .with_challenge("nonce-1")
            .with_domain("example.com");
        let loader = StaticDocumentLoader::new();
        let proof = create_proof(&doc, &options, &PrivateKeyInput::from(&keypair), &loader)
            .await
            .unwrap();

        let good = VerifyOptions {
            expected_proof_purpose: Some(AUTHENTICATION.into()),
            challenge: Some("nonce-1".into()),
            domain: Some("example.com".into()),
        };
        assert!(verify_proof(&doc, &proof, &good, &loader).await.verified);
        let wrong_challenge = VerifyOptions {
            challenge: Some("nonce-2".into()),
            ..good.clone()
        };
        assert!(!verify_proof(&doc, &proof, &wrong_challenge, &loader).await.verified);
        let wrong_purpose = VerifyOptions {
            expected_proof_purpose: Some("assertionMethod".into()),
            ..good
        };
        assert!(!verify_proof(&doc, &proof, &wrong_purpose, &loader).await.verified);
    }

    #[tokio::test]
    async fn appended_proofs_all_verify() {
        let first = EdKeypair::generate();
        let second = EdKeypair::generate();
        let loader = StaticDocumentLoader::new();
        let doc = document();

        let secured = attach_proof(&doc, &signed(&first, &doc).await).unwrap();
        // The second signer signs the document without the first proof.
        let secured = attach_proof(&secured, &signed(&second, &doc).await).unwrap();
        assert_eq!(secured["proof"].as_array().map(Vec::len), Some(2));
        assert!(verify_document(&secured, &VerifyOptions::default(), &loader).await.verified);

        let unsigned = verify_document(&doc, &VerifyOptions::default(), &loader).await;
        assert!(!unsigned.verified);
    }

    #[tokio::test]
    async fn malformed_proof_value_is_a_failure_not_an_error() {
        let keypair = EdKeypair::generate();
        let doc = document();
        let mut proof = signed(&keypair, &doc).await;
        proof.proof_value = Some("not-multibase".into());
        let result = verify_proof(&doc, &proof, &VerifyOptions::default(), &StaticDocumentLoader::new()).await;
        assert!(!result.verified);
        assert!(!result.errors()[0].is_empty());
    }
}
