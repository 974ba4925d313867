//! # Document Loading
//!
//! Proof creation and verification need to dereference IRIs: JSON-LD
//! contexts named by a document, and the verification method named by a
//! proof. Both go through [`DocumentLoader`].
//!
//! | Loader                   | Serves                                        |
//! |--------------------------|-----------------------------------------------|
//! | `StaticDocumentLoader`   | Built-in contexts, registered documents,      |
//! |                          | `did:key` (derived locally, no I/O)           |
//! | `ResolverDocumentLoader` | `did:btco` through a [`DidResolver`], then    |
//! |                          | falls back to a static loader                 |
//!
//! Every load goes through [`load_document`], which enforces the loader's
//! timeout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::config::{
    BTCO_CONTEXT_V1, DATA_INTEGRITY_CONTEXT_V2, DEFAULT_LOADER_TIMEOUT, DID_CONTEXT_V1, MULTIKEY_CONTEXT_V1,
    VC_CONTEXT_V1,
};
use crate::crypto::keys::EdPublicKey;
use crate::did::document::{VerificationMethod, MULTIKEY_TYPE};
use crate::did::resolver::DidResolver;
use crate::error::{BtcoError, BtcoResult};

/// A dereferenced IRI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocument {
    pub document: Value,
    pub document_url: String,
    pub context_url: Option<String>,
}

impl RemoteDocument {
    fn new(document: Value, document_url: &str) -> Self {
        Self {
            document,
            document_url: document_url.to_string(),
            context_url: None,
        }
    }
}

#[async_trait]
pub trait DocumentLoader: Send + Sync {
    async fn resolve(&self, iri: &str) -> BtcoResult<RemoteDocument>;

    /// Upper bound on a single `resolve`.
    fn timeout(&self) -> Duration {
        DEFAULT_LOADER_TIMEOUT
    }
}

/// `loader.resolve(iri)` bounded by `loader.timeout()`.
pub async fn load_document(loader: &dyn DocumentLoader, iri: &str) -> BtcoResult<RemoteDocument> {
    let timeout = loader.timeout();
    tokio::time::timeout(timeout, loader.resolve(iri))
        .await
        .map_err(|_| BtcoError::Loader(format!("timed out after {timeout:?} loading {iri}")))?
}

/// Dereference a verification method id to the method itself.
///
/// The loader may return either the method object or the whole controller
/// document; in the latter case the document must be the one of the DID in
/// `id`. Either way the method found must carry `id` itself or its bare
/// `#fragment`, never the same fragment under another DID.
pub async fn load_verification_method(loader: &dyn DocumentLoader, id: &str) -> BtcoResult<VerificationMethod> {
    let (did, fragment) = match id.split_once('#') {
        Some((did, fragment)) => (did, Some(fragment)),
        None => (id, None),
    };
    let remote = load_document(loader, id).await?;
    let mut object = if remote.document.get("publicKeyMultibase").is_some() {
        remote.document
    } else {
        if let Some(controller) = remote.document.get("id").and_then(Value::as_str) {
            if controller != did {
                return Err(BtcoError::Loader(format!(
                    "{id} dereferenced to the controller document of {controller}"
                )));
            }
        }
        remote
            .document
            .get("verificationMethod")
            .and_then(Value::as_array)
            .and_then(|methods| methods.iter().find(|m| names_method(m, id, fragment)))
            .cloned()
            .ok_or_else(|| BtcoError::Loader(format!("verification method {id} not found")))?
    };
    if !names_method(&object, id, fragment) {
        return Err(BtcoError::Loader(format!("{id} dereferenced to a different verification method")));
    }
    if let Some(method) = object.as_object_mut() {
        method.insert("id".to_string(), Value::String(id.to_string()));
    }
    serde_json::from_value(object).map_err(|e| BtcoError::Loader(format!("malformed verification method {id}: {e}")))
}

/// `method` is `id` itself, or names it by bare `#fragment`.
fn names_method(method: &Value, id: &str, fragment: Option<&str>) -> bool {
    match method.get("id").and_then(Value::as_str) {
        Some(candidate) if candidate == id => true,
        Some(candidate) => fragment.is_some_and(|f| candidate.strip_prefix('#') == Some(f)),
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Static loader
// ---------------------------------------------------------------------------

/// In-process loader: built-in contexts, registered documents, `did:key`.
#[derive(Debug, Clone)]
pub struct StaticDocumentLoader {
    documents: HashMap<String, Value>,
    timeout: Duration,
}

impl Default for StaticDocumentLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticDocumentLoader {
    /// A loader that knows every context this crate emits.
    pub fn new() -> Self {
        let mut documents = HashMap::new();
        for (iri, context) in builtin_contexts() {
            documents.insert(iri.to_string(), context);
        }
        Self {
            documents,
            timeout: DEFAULT_LOADER_TIMEOUT,
        }
    }

    pub fn with_document(mut self, iri: &str, document: Value) -> Self {
        self.documents.insert(iri.to_string(), document);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl DocumentLoader for StaticDocumentLoader {
    async fn resolve(&self, iri: &str) -> BtcoResult<RemoteDocument> {
        if let Some(document) = self.documents.get(iri) {
            return Ok(RemoteDocument::new(document.clone(), iri));
        }
        if iri.starts_with("did:key:") {
            return did_key_document(iri).map(|doc| RemoteDocument::new(doc, iri));
        }
        Err(BtcoError::Loader(format!("no document registered for {iri}")))
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

const SEC: &str = "https://w3id.org/security#";

/// Every term this crate writes must be defined here, or RDFC expansion
/// refuses the document.
fn builtin_contexts() -> Vec<(&'static str, Value)> {
    let sec = |term: &str| format!("{SEC}{term}");
    let xsd_datetime = "http://www.w3.org/2001/XMLSchema#dateTime";
    vec![
        (
            DID_CONTEXT_V1,
            json!({"@context": {"@protected": true, "id": "@id", "type": "@type",
                "alsoKnownAs": {"@id": "https://www.w3.org/ns/activitystreams#alsoKnownAs", "@type": "@id"},
                "verificationMethod": {"@id": sec("verificationMethod"), "@type": "@id"},
                "authentication": {"@id": sec("authenticationMethod"), "@type": "@id"},
                "assertionMethod": {"@id": sec("assertionMethod"), "@type": "@id"},
                "keyAgreement": {"@id": sec("keyAgreementMethod"), "@type": "@id"},
                "controller": {"@id": sec("controller"), "@type": "@id"},
                "service": {"@id": "https://www.w3.org/ns/did#service", "@type": "@id"},
                "serviceEndpoint": {"@id": "https://www.w3.org/ns/did#serviceEndpoint", "@type": "@id"}}}),
        ),
        (
            MULTIKEY_CONTEXT_V1,
            json!({"@context": {"@protected": true, "id": "@id", "type": "@type",
                "Multikey": {"@id": sec("Multikey")},
                "controller": {"@id": sec("controller"), "@type": "@id"},
                "publicKeyMultibase": {"@id": sec("publicKeyMultibase"), "@type": sec("multibase")}}}),
        ),
        (
            DATA_INTEGRITY_CONTEXT_V2,
            json!({"@context": {"@protected": true, "id": "@id", "type": "@type",
                "DataIntegrityProof": {"@id": sec("DataIntegrityProof")},
                "cryptosuite": {"@id": sec("cryptosuite"), "@type": sec("cryptosuiteString")},
                "verificationMethod": {"@id": sec("verificationMethod"), "@type": "@id"},
                "proofPurpose": {"@id": sec("proofPurpose"), "@type": "@vocab", "@context": {
                    "assertionMethod": {"@id": sec("assertionMethod"), "@type": "@id"},
                    "authentication": {"@id": sec("authenticationMethod"), "@type": "@id"}}},
                "created": {"@id": "http://purl.org/dc/terms/created", "@type": xsd_datetime},
                "expires": {"@id": sec("expiration"), "@type": xsd_datetime},
                "challenge": sec("challenge"),
                "domain": sec("domain"),
                "nonce": sec("nonce"),
                "proof": {"@id": sec("proof"), "@type": "@id", "@container": "@graph"},
                "proofValue": {"@id": sec("proofValue"), "@type": sec("multibase")}}}),
        ),
        (
            VC_CONTEXT_V1,
            json!({"@context": {"@version": 1.1, "@protected": true, "id": "@id", "type": "@type",
                "VerifiableCredential": {"@id": "https://www.w3.org/2018/credentials#VerifiableCredential"},
                "credentialSubject": {"@id": "https://www.w3.org/2018/credentials#credentialSubject", "@type": "@id"},
                "credentialStatus": {"@id": "https://www.w3.org/2018/credentials#credentialStatus", "@type": "@id"},
                "holder": {"@id": "https://www.w3.org/2018/credentials#holder", "@type": "@id"},
                "issuer": {"@id": "https://www.w3.org/2018/credentials#issuer", "@type": "@id"},
                "issuanceDate": {"@id": "https://www.w3.org/2018/credentials#issuanceDate", "@type": xsd_datetime},
                "expirationDate": {"@id": "https://www.w3.org/2018/credentials#expirationDate", "@type": xsd_datetime},
                "proof": {"@id": sec("proof"), "@type": "@id", "@container": "@graph"}}}),
        ),
        (
            BTCO_CONTEXT_V1,
            json!({"@context": {"@version": 1.1, "@vocab": "https://ordinals.plus/v1#",
                "ordinals": "https://ordinals.plus/v1#",
                "VerifiableCollectible": "ordinals:VerifiableCollectible",
                "contentInfo": "ordinals:contentInfo", "mimeType": "ordinals:mimeType",
                "hash": "ordinals:hash", "size": "ordinals:size",
                "dimensions": "ordinals:dimensions", "duration": "ordinals:duration"}}),
        ),
    ]
}

/// Controller document (bare `did:key`) or method object (`did:key:..#..`)
/// for an Ed25519 `did:key`.
fn did_key_document(iri: &str) -> BtcoResult<Value> {
    let (did, fragment) = match iri.split_once('#') {
        Some((did, fragment)) => (did, Some(fragment)),
        None => (iri, None),
    };
    let multikey = did
        .strip_prefix("did:key:")
        .ok_or_else(|| BtcoError::Loader(format!("{iri} is not a did:key")))?;
    EdPublicKey::from_multikey(multikey)
        .map_err(|e| BtcoError::Loader(format!("unsupported did:key {did}: {e}")))?;
    if fragment.is_some_and(|f| f != multikey) {
        return Err(BtcoError::Loader(format!("did:key fragment must repeat the key in {iri}")));
    }

    let method_id = format!("{did}#{multikey}");
    let method = json!({
        "id": method_id,
        "type": MULTIKEY_TYPE,
        "controller": did,
        "publicKeyMultibase": multikey,
    });
    if fragment.is_some() {
        let mut method = method;
        method["@context"] = json!([DID_CONTEXT_V1, MULTIKEY_CONTEXT_V1]);
        return Ok(method);
    }
    Ok(json!({
        "@context": [DID_CONTEXT_V1, MULTIKEY_CONTEXT_V1],
        "id": did,
        "verificationMethod": [method],
        "authentication": [method_id],
        "assertionMethod": [method_id],
    }))
}

/// The `did:key` verification method id for an Ed25519 key.
pub fn did_key_verification_method(public_key: &EdPublicKey) -> String {
    let multikey = public_key.to_multikey();
    format!("did:key:{multikey}#{multikey}")
}

// ---------------------------------------------------------------------------
// Resolver-backed loader
// ---------------------------------------------------------------------------

/// Dereferences `did:btco` IRIs through a resolver.
pub struct ResolverDocumentLoader {
    resolver: Arc<DidResolver>,
    fallback: StaticDocumentLoader,
}

impl ResolverDocumentLoader {
    pub fn new(resolver: Arc<DidResolver>) -> Self {
        Self {
            resolver,
            fallback: StaticDocumentLoader::new(),
        }
    }

    pub fn with_fallback(mut self, fallback: StaticDocumentLoader) -> Self {
        self.fallback = fallback;
        self
    }

    async fn resolve_btco(&self, iri: &str) -> BtcoResult<RemoteDocument> {
        let (did, fragment) = match iri.split_once('#') {
            Some((did, fragment)) => (did, Some(fragment)),
            None => (iri, None),
        };
        let result = self.resolver.resolve(did).await?;
        if let Some(error) = result.error() {
            return Err(BtcoError::Loader(format!("cannot resolve {did}: {error}")));
        }
        if result.is_deactivated() {
            return Err(BtcoError::Loader(format!("{did} is deactivated")));
        }
        let document = result
            .did_document
            .ok_or_else(|| BtcoError::Loader(format!("{did} resolved without a document")))?;
        debug!(iri, "dereferenced did:btco");

        let value = match fragment {
            None => serde_json::to_value(&document)?,
            Some(fragment) => {
                let method = document
                    .verification_method(fragment)
                    .ok_or_else(|| BtcoError::Loader(format!("verification method {iri} not found")))?;
                let mut value = serde_json::to_value(method)?;
                value["@context"] = json!(document.context);
                value
            }
        };
        Ok(RemoteDocument::new(value, iri))
    }
}

#[async_trait]
impl DocumentLoader for ResolverDocumentLoader {
    async fn resolve(&self, iri: &str) -> BtcoResult<RemoteDocument> {
        if iri.starts_with("did:btco:") {
            return self.resolve_btco(iri).await;
        }
        self.fallback.resolve(iri).await
    }

    fn timeout(&self) -> Duration {
        self.fallback.timeout()
    }
}

impl std::fmt::Debug for ResolverDocumentLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverDocumentLoader")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Network;
    use crate::content::prepare_content;
    use crate::crypto::keys::EdKeypair;
    use crate::did::document::{create_did_document, serialize_did_document, DidDocumentOptions};
    use crate::provider::{CreateInscriptionRequest, MemoryOrdinalsProvider, OrdinalsProvider};

    #[tokio::test]
    async fn builtin_contexts_load() {
        let loader = StaticDocumentLoader::new();
        for iri in [DID_CONTEXT_V1, MULTIKEY_CONTEXT_V1, DATA_INTEGRITY_CONTEXT_V2, VC_CONTEXT_V1, BTCO_CONTEXT_V1] {
            let remote = load_document(&loader, iri).await.unwrap();
            assert_eq!(remote.document_url, iri);
            assert!(remote.document.get("@context").is_some());
        }
        let err = load_document(&loader, "https://example.com/unknown").await.unwrap_err();
        assert_eq!(err.code(), "LOADER_ERROR");
    }

    #[tokio::test]
    async fn did_key_methods_are_derived_locally() {
        let key = EdKeypair::generate().public_key();
        let vm_id = did_key_verification_method(&key);
        let loader = StaticDocumentLoader::new();

        let method = load_verification_method(&loader, &vm_id).await.unwrap();
        assert_eq!(method.id, vm_id);
        assert_eq!(method.ed25519_key(), Some(key.clone()));

        let controller = load_document(&loader, &key.to_did_key()).await.unwrap();
        assert_eq!(controller.document["authentication"][0], vm_id);

        assert!(load_document(&loader, "did:key:zNotAKey").await.is_err());
    }

    fn controller_document(did: &str, method_id: &str, multikey: &str) -> Value {
        json!({
            "@context": [DID_CONTEXT_V1, MULTIKEY_CONTEXT_V1],
            "id": did,
            "verificationMethod": [{
                "id": method_id,
                "type": MULTIKEY_TYPE,
                "controller": did,
                "publicKeyMultibase": multikey,
            }],
        })
    }

    #[tokio::test]
    async fn methods_must_belong_to_the_requested_did() {
        let key = EdKeypair::generate().public_key();
        let multikey = key.to_multikey();
        let wanted = "did:btco:sig:5#key-1";

        // Same fragment, different DID.
        let foreign = StaticDocumentLoader::new()
            .with_document(wanted, controller_document("did:btco:sig:5", "did:other:1#key-1", &multikey));
        let err = load_verification_method(&foreign, wanted).await.unwrap_err();
        assert_eq!(err.code(), "LOADER_ERROR");

        // Another DID's controller document, even with a bare fragment.
        let borrowed = StaticDocumentLoader::new()
            .with_document(wanted, controller_document("did:other:1", "#key-1", &multikey));
        assert!(load_verification_method(&borrowed, wanted).await.is_err());

        // A method object carrying another DID's id.
        let object = StaticDocumentLoader::new().with_document(
            wanted,
            json!({"id": "did:other:1#key-1", "type": MULTIKEY_TYPE, "controller": "did:other:1",
                "publicKeyMultibase": multikey}),
        );
        assert!(load_verification_method(&object, wanted).await.is_err());

        // Full and bare-fragment ids of the right DID both resolve.
        for method_id in [wanted, "#key-1"] {
            let loader = StaticDocumentLoader::new()
                .with_document(wanted, controller_document("did:btco:sig:5", method_id, &multikey));
            let method = load_verification_method(&loader, wanted).await.unwrap();
            assert_eq!(method.id, wanted);
            assert_eq!(method.ed25519_key(), Some(key.clone()));
        }
    }

    struct SlowLoader;

    #[async_trait]
    impl DocumentLoader for SlowLoader {
        async fn resolve(&self, iri: &str) -> BtcoResult<RemoteDocument> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(RemoteDocument::new(Value::Null, iri))
        }

        fn timeout(&self) -> Duration {
            Duration::from_millis(50)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_loads_time_out() {
        let err = load_document(&SlowLoader, "https://slow.example").await.unwrap_err();
        assert_eq!(err.code(), "LOADER_ERROR");
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn resolver_loader_dereferences_did_btco_methods() {
        let provider = Arc::new(MemoryOrdinalsProvider::new(Network::Signet));
        let created = create_did_document(99, Network::Signet, DidDocumentOptions::default()).unwrap();
        provider
            .create_inscription(CreateInscriptionRequest {
                content: prepare_content(
                    serialize_did_document(&created.document).unwrap(),
                    "application/json",
                    None,
                    None,
                )
                .unwrap(),
                satoshi: 99,
                destination: None,
            })
            .await
            .unwrap();
        let resolver = Arc::new(DidResolver::new().with_provider(Network::Signet, provider));
        let loader = ResolverDocumentLoader::new(resolver);

        let method = load_verification_method(&loader, "did:btco:sig:99#key-1").await.unwrap();
        assert_eq!(method.ed25519_key(), Some(created.public_key.clone()));

        let doc = load_document(&loader, "did:btco:sig:99").await.unwrap();
        assert_eq!(doc.document["id"], "did:btco:sig:99");

        assert!(load_verification_method(&loader, "did:btco:sig:99#key-2").await.is_err());
        assert!(load_document(&loader, "did:btco:sig:100").await.is_err());
        // Non-btco IRIs fall through to the static loader.
        assert!(load_document(&loader, VC_CONTEXT_V1).await.is_ok());
    }
}
