//! # DID Documents
//!
//! W3C DID Core documents for `did:btco` identifiers.
//!
//! ```json
//! {
//!   "@context": ["https://www.w3.org/ns/did/v1", "https://w3id.org/security/multikey/v1"],
//!   "id": "did:btco:12345",
//!   "verificationMethod": [{
//!     "id": "did:btco:12345#key-1",
//!     "type": "Multikey",
//!     "controller": "did:btco:12345",
//!     "publicKeyMultibase": "z6Mk..."
//!   }],
//!   "authentication": ["did:btco:12345#key-1"],
//!   "assertionMethod": ["did:btco:12345#key-1"]
//! }
//! ```
//!
//! Serialization is canonical JSON (sorted keys, no whitespace) so a
//! document inscribed twice produces identical bytes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use zeroize::Zeroizing;

use super::identifier::BtcoDid;
use crate::config::{Network, DID_CONTEXT_V1, MULTIKEY_CONTEXT_V1};
use crate::crypto::keys::{EdKeypair, EdPublicKey, ED25519_SECRET_KEY_LENGTH};
use crate::crypto::multikey::{decode_public_key, MultikeyType};
use crate::error::BtcoResult;
use crate::proof::canonical::canonicalize;

/// Verification method type for multikey-encoded keys.
pub const MULTIKEY_TYPE: &str = "Multikey";

/// Legacy Ed25519-only verification method type.
pub const ED25519_VERIFICATION_KEY_2020: &str = "Ed25519VerificationKey2020";

/// Fragment of the key generated by [`create_did_document`].
pub const DEFAULT_KEY_FRAGMENT: &str = "key-1";

// ---------------------------------------------------------------------------
// Document Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub controller: String,
    pub public_key_multibase: String,
}

impl VerificationMethod {
    /// Decode the key, checking it against the declared method type.
    pub fn decode_key(&self) -> Result<(MultikeyType, Vec<u8>), String> {
        let (key_type, bytes) = decode_public_key(&self.public_key_multibase).map_err(|e| e.to_string())?;
        match self.type_.as_str() {
            MULTIKEY_TYPE => Ok((key_type, bytes)),
            ED25519_VERIFICATION_KEY_2020 if key_type == MultikeyType::Ed25519 => Ok((key_type, bytes)),
            ED25519_VERIFICATION_KEY_2020 => Err(format!("{} declares Ed25519 but carries a {key_type} key", self.id)),
            other => Err(format!("unsupported verification method type '{other}'")),
        }
    }

    /// The Ed25519 key of this method, if that is what it carries.
    pub fn ed25519_key(&self) -> Option<EdPublicKey> {
        match self.decode_key() {
            Ok((MultikeyType::Ed25519, bytes)) => EdPublicKey::try_from_slice(&bytes).ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub service_endpoint: Value,
}

/// A `did:btco` DID document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    #[serde(rename = "@context")]
    pub context: Vec<String>,

    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,

    #[serde(default)]
    pub verification_method: Vec<VerificationMethod>,

    #[serde(default)]
    pub authentication: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertion_method: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<Service>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deactivated: Option<bool>,
}

impl DidDocument {
    pub fn is_deactivated(&self) -> bool {
        self.deactivated.unwrap_or(false)
    }

    /// Look a method up by full id or by bare/`#`-prefixed fragment.
    pub fn verification_method(&self, reference: &str) -> Option<&VerificationMethod> {
        let fragment = reference
            .rsplit_once('#')
            .map(|(_, f)| f)
            .unwrap_or(reference);
        self.verification_method.iter().find(|vm| {
            vm.id == reference || vm.id.rsplit_once('#').map(|(_, f)| f) == Some(fragment)
        })
    }

    pub fn to_json(&self) -> BtcoResult<String> {
        serialize_did_document(self)
    }
}

/// Optional fields for [`create_did_document`].
#[derive(Debug, Clone, Default)]
pub struct DidDocumentOptions {
    pub controller: Option<String>,
    pub services: Vec<Service>,
    pub deactivated: bool,
}

/// A freshly created document and the key behind its `#key-1`.
pub struct CreatedDidDocument {
    pub document: DidDocument,
    pub public_key: EdPublicKey,
    pub secret_key: Zeroizing<[u8; ED25519_SECRET_KEY_LENGTH]>,
}

impl std::fmt::Debug for CreatedDidDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreatedDidDocument")
            .field("document", &self.document)
            .field("public_key", &self.public_key.to_multikey())
            .finish_non_exhaustive()
    }
}

/// Outcome of [`validate_did_document`]. Every problem is reported, not
/// just the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// New document for `satoshi` on `network` with a fresh Ed25519 key.
pub fn create_did_document(
    satoshi: u64,
    network: Network,
    options: DidDocumentOptions,
) -> BtcoResult<CreatedDidDocument> {
    let did = BtcoDid::new(satoshi, network)?;
    let keypair = EdKeypair::generate();
    let public_key = keypair.public_key();
    let document = document_for_key(&did, &public_key, options);
    debug!(did = %did, "created DID document");
    Ok(CreatedDidDocument {
        document,
        public_key,
        secret_key: Zeroizing::new(keypair.secret_key_bytes()),
    })
}

/// Document for `did` whose single method carries `public_key`.
pub fn document_for_key(did: &BtcoDid, public_key: &EdPublicKey, options: DidDocumentOptions) -> DidDocument {
    let id = did.to_string();
    let key_id = did.fragment_url(DEFAULT_KEY_FRAGMENT);
    DidDocument {
        context: vec![DID_CONTEXT_V1.to_string(), MULTIKEY_CONTEXT_V1.to_string()],
        controller: options.controller,
        verification_method: vec![VerificationMethod {
            id: key_id.clone(),
            type_: MULTIKEY_TYPE.to_string(),
            controller: id.clone(),
            public_key_multibase: public_key.to_multikey(),
        }],
        authentication: vec![key_id.clone()],
        assertion_method: vec![key_id],
        service: options.services,
        deactivated: options.deactivated.then_some(true),
        id,
    }
}

/// Structural checks on a document.
pub fn validate_did_document(document: &DidDocument) -> ValidationResult {
    let mut errors = Vec::new();

    if document.context.is_empty() {
        errors.push("@context is required".to_string());
    } else if document.context[0] != DID_CONTEXT_V1 {
        errors.push(format!("first @context entry must be {DID_CONTEXT_V1}"));
    }

    if document.id.is_empty() {
        errors.push("id is required".to_string());
    } else if let Err(e) = document.id.parse::<BtcoDid>() {
        errors.push(format!("id: {e}"));
    }

    for (i, vm) in document.verification_method.iter().enumerate() {
        if vm.id.trim().is_empty() {
            errors.push(format!("verificationMethod[{i}] has an empty id"));
        }
        if vm.controller.trim().is_empty() {
            errors.push(format!("verificationMethod[{i}] has an empty controller"));
        }
        if let Err(e) = vm.decode_key() {
            errors.push(format!("verificationMethod[{i}]: {e}"));
        }
    }

    let relationships = [
        ("authentication", &document.authentication),
        ("assertionMethod", &document.assertion_method),
    ];
    for (name, references) in relationships {
        for reference in references.iter() {
            let local = reference.starts_with('#') || reference.starts_with(&format!("{}#", document.id));
            if local && document.verification_method(reference).is_none() {
                errors.push(format!("{name} references unknown method '{reference}'"));
            }
        }
    }

    ValidationResult {
        is_valid: errors.is_empty(),
        errors,
    }
}

/// Canonical JSON.
pub fn serialize_did_document(document: &DidDocument) -> BtcoResult<String> {
    let bytes = canonicalize(document)?;
    String::from_utf8(bytes).map_err(|e| crate::error::BtcoError::Serialization(e.to_string()))
}

/// Parse and validate. `None` for malformed JSON or an invalid document.
pub fn deserialize_did_document(json: &str) -> Option<DidDocument> {
    let document: DidDocument = serde_json::from_str(json).ok()?;
    let result = validate_did_document(&document);
    if !result.is_valid {
        debug!(id = %document.id, errors = ?result.errors, "rejected DID document");
        return None;
    }
    Some(document)
}
