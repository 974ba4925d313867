//! # DID Resolver
//!
//! Resolves `did:btco` identifiers and DID URLs against the inscriptions on
//! the identified satoshi.
//!
//! ## Documents
//!
//! ```text
//! inscriptions on sat (creation order)
//!   [0] DID doc v1          <- ignored, superseded
//!   [1] image/png           <- not a document
//!   [2] DID doc v2          <- resolved document
//!   [3] "🔥"                <- burn marker: deactivated
//! ```
//!
//! The most recent inscription that parses as a valid document for this
//! DID wins. A burn marker after it, or `"deactivated": true` inside it,
//! marks the DID deactivated.
//!
//! ## Resources
//!
//! Every inscription on the satoshi is a resource, numbered by its position
//! in ledger creation order. Indices never change once assigned.
//!
//! Misses come back as metadata errors (`notFound`, `invalidDid`,
//! `RESOURCE_NOT_FOUND`). The only error that crosses the resolution
//! boundary is a missing provider for the DID's network.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::document::{deserialize_did_document, DidDocument};
use super::identifier::BtcoDid;
use super::url::DidUrl;
use crate::config::{Network, ProtocolConfig, BURN_MARKER, DEFAULT_RESOLVER_CACHE_TTL};
use crate::content::mime::APPLICATION_JSON;
use crate::crypto::hash::sha256_hex;
use crate::error::{BtcoError, BtcoResult};
use crate::provider::{Inscription, OrdinalsProvider};

/// Content type of a resolved DID document.
pub const DID_LD_JSON: &str = "application/did+ld+json";

pub const ERROR_INVALID_DID: &str = "invalidDid";
pub const ERROR_NOT_FOUND: &str = "notFound";
pub const ERROR_RESOURCE_NOT_FOUND: &str = "RESOURCE_NOT_FOUND";
pub const ERROR_INTERNAL: &str = "internalError";

// ---------------------------------------------------------------------------
// Result Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidResolutionMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_info: Option<ResourceInfo>,
}

impl DidResolutionMetadata {
    fn error(code: &str, message: impl Into<String>) -> Self {
        Self {
            error: Some(code.to_string()),
            message: Some(message.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocumentMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deactivated: Option<bool>,
    /// Inscription the document was read from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u64>,
    /// How many document versions precede the resolved one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_versions: Option<usize>,
}

/// Outcome of whole-document resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    pub did_resolution_metadata: DidResolutionMetadata,
    pub did_document: Option<DidDocument>,
    pub did_document_metadata: DidDocumentMetadata,
}

impl ResolutionResult {
    fn failed(code: &str, message: impl Into<String>) -> Self {
        Self {
            did_resolution_metadata: DidResolutionMetadata::error(code, message),
            did_document: None,
            did_document_metadata: DidDocumentMetadata::default(),
        }
    }

    pub fn is_deactivated(&self) -> bool {
        self.did_document_metadata.deactivated.unwrap_or(false)
    }

    pub fn error(&self) -> Option<&str> {
        self.did_resolution_metadata.error.as_deref()
    }
}

/// One inscription seen as a DID resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInfo {
    /// `<did>/<index>`.
    pub id: String,
    pub index: usize,
    pub inscription_id: String,
    pub content_type: String,
    pub size: usize,
    /// Hex SHA-256 of the content.
    pub hash: String,
    pub satoshi: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u64>,
}

/// Outcome of resource resolution. `did_document` is always `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceResolution {
    pub did_resolution_metadata: DidResolutionMetadata,
    pub did_document: Option<DidDocument>,
    /// Resource bytes, or the JSON-encoded `ResourceInfo` when the caller
    /// asked for metadata.
    #[serde(skip)]
    pub content: Option<Vec<u8>>,
}

impl ResourceResolution {
    fn failed(code: &str, message: impl Into<String>) -> Self {
        Self {
            did_resolution_metadata: DidResolutionMetadata::error(code, message),
            did_document: None,
            content: None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.did_resolution_metadata.error.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.did_resolution_metadata.content_type.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

struct CachedResolution {
    stored_at: Instant,
    result: ResolutionResult,
}

/// Resolves DIDs through one provider per network.
pub struct DidResolver {
    providers: HashMap<Network, Arc<dyn OrdinalsProvider>>,
    cache: DashMap<String, CachedResolution>,
    cache_ttl: Duration,
}

impl Default for DidResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DidResolver {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            cache: DashMap::new(),
            cache_ttl: DEFAULT_RESOLVER_CACHE_TTL,
        }
    }

    pub fn from_config(config: &ProtocolConfig) -> Self {
        Self::new().with_cache_ttl(config.resolver_cache_ttl())
    }

    /// Resolver with a single provider serving `network`.
    pub fn with_provider(mut self, network: Network, provider: Arc<dyn OrdinalsProvider>) -> Self {
        self.providers.insert(network, provider);
        self
    }

    /// A zero TTL disables caching.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn invalidate(&self, did: &str) {
        self.cache.remove(did);
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn provider(&self, network: Network) -> BtcoResult<&Arc<dyn OrdinalsProvider>> {
        self.providers.get(&network).ok_or(BtcoError::OrdProviderRequired)
    }

    /// Resolve a DID to its current document.
    pub async fn resolve(&self, did: &str) -> BtcoResult<ResolutionResult> {
        let parsed: BtcoDid = match did.parse() {
            Ok(parsed) => parsed,
            Err(e) => return Ok(ResolutionResult::failed(ERROR_INVALID_DID, e.to_string())),
        };
        let provider = self.provider(parsed.network())?;

        if let Some(hit) = self.cached(did) {
            debug!(did, "resolution cache hit");
            return Ok(hit);
        }

        let inscriptions = match ordered_inscriptions(provider.as_ref(), parsed.satoshi()).await {
            Ok(inscriptions) => inscriptions,
            Err(e) => {
                warn!(did, error = %e, "provider lookup failed");
                return Ok(ResolutionResult::failed(ERROR_INTERNAL, e.to_string()));
            }
        };
        let result = document_from_inscriptions(&parsed, &inscriptions);
        info!(
            did,
            found = result.did_document.is_some(),
            deactivated = result.is_deactivated(),
            "resolved DID"
        );

        if result.did_document.is_some() && !self.cache_ttl.is_zero() {
            self.cache.insert(
                did.to_string(),
                CachedResolution {
                    stored_at: Instant::now(),
                    result: result.clone(),
                },
            );
        }
        Ok(result)
    }

    fn cached(&self, did: &str) -> Option<ResolutionResult> {
        let entry = self.cache.get(did)?;
        if entry.stored_at.elapsed() < self.cache_ttl {
            return Some(entry.result.clone());
        }
        drop(entry);
        self.cache.remove(did);
        None
    }

    /// Resolve a DID URL addressing a resource (`<did>/<index>[/info]`).
    pub async fn resolve_resource(&self, did_url: &str) -> BtcoResult<ResourceResolution> {
        let url: DidUrl = match did_url.parse() {
            Ok(url) => url,
            Err(e) => return Ok(ResourceResolution::failed(ERROR_INVALID_DID, e.to_string())),
        };
        let Some(index) = url.resource_index else {
            return Ok(ResourceResolution::failed(
                ERROR_RESOURCE_NOT_FOUND,
                format!("{did_url} does not address a resource"),
            ));
        };
        let provider = self.provider(url.did.network())?;

        let inscriptions = match ordered_inscriptions(provider.as_ref(), url.did.satoshi()).await {
            Ok(inscriptions) => inscriptions,
            Err(e) => return Ok(ResourceResolution::failed(ERROR_INTERNAL, e.to_string())),
        };
        let Some(inscription) = inscriptions.get(index) else {
            debug!(did_url, index, available = inscriptions.len(), "resource not found");
            return Ok(ResourceResolution::failed(
                ERROR_RESOURCE_NOT_FOUND,
                format!("no resource at index {index} on satoshi {}", url.did.satoshi()),
            ));
        };

        let resource_info = resource_info(&url.did, index, inscription);
        let (content_type, content) = if url.wants_info() {
            let json = serde_json::to_vec(&resource_info)?;
            (APPLICATION_JSON.to_string(), json)
        } else {
            (inscription.content_type.clone(), inscription.content.clone())
        };
        debug!(did_url, index, %content_type, "resolved resource");

        Ok(ResourceResolution {
            did_resolution_metadata: DidResolutionMetadata {
                content_type: Some(content_type),
                resource_info: Some(resource_info),
                ..Default::default()
            },
            did_document: None,
            content: Some(content),
        })
    }

    /// Every resource on the DID's satoshi, in index order.
    pub async fn list_resources(&self, did: &str) -> BtcoResult<Vec<ResourceInfo>> {
        let parsed: BtcoDid = did.parse()?;
        let provider = self.provider(parsed.network())?;
        let inscriptions = ordered_inscriptions(provider.as_ref(), parsed.satoshi()).await?;
        Ok(inscriptions
            .iter()
            .enumerate()
            .map(|(index, inscription)| resource_info(&parsed, index, inscription))
            .collect())
    }

    /// Resolve either form: a bare DID or a resource URL.
    pub async fn resolve_any(&self, did_or_url: &str) -> BtcoResult<Resolved> {
        match did_or_url.parse::<DidUrl>() {
            Ok(url) if url.is_resource() => Ok(Resolved::Resource(self.resolve_resource(did_or_url).await?)),
            Ok(url) => Ok(Resolved::Document(self.resolve(&url.did.to_string()).await?)),
            Err(e) => Ok(Resolved::Document(ResolutionResult::failed(ERROR_INVALID_DID, e.to_string()))),
        }
    }
}

/// Result of [`DidResolver::resolve_any`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Document(ResolutionResult),
    Resource(ResourceResolution),
}

impl std::fmt::Debug for DidResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DidResolver")
            .field("networks", &self.providers.keys().collect::<Vec<_>>())
            .field("cached", &self.cache.len())
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The satoshi's inscriptions in resource order: confirmed by block height,
/// unconfirmed last, provider order within a block.
async fn ordered_inscriptions(provider: &dyn OrdinalsProvider, satoshi: u64) -> BtcoResult<Vec<Inscription>> {
    let mut inscriptions = provider.get_inscriptions_by_satoshi(satoshi).await?;
    sort_for_resources(&mut inscriptions);
    Ok(inscriptions)
}

fn sort_for_resources(inscriptions: &mut [Inscription]) {
    inscriptions.sort_by_key(|i| (i.block_height.is_none(), i.block_height));
}

fn resource_info(did: &BtcoDid, index: usize, inscription: &Inscription) -> ResourceInfo {
    ResourceInfo {
        id: did.resource_url(index),
        index,
        inscription_id: inscription.inscription_id.clone(),
        content_type: inscription.content_type.clone(),
        size: inscription.content.len(),
        hash: sha256_hex(&inscription.content),
        satoshi: inscription.satoshi,
        block_height: inscription.block_height,
    }
}

fn document_from_inscriptions(did: &BtcoDid, inscriptions: &[Inscription]) -> ResolutionResult {
    let id = did.to_string();
    let burned = inscriptions
        .last()
        .and_then(Inscription::content_text)
        .is_some_and(|text| text.trim() == BURN_MARKER);

    let latest = inscriptions.iter().enumerate().rev().find_map(|(position, inscription)| {
        let document = deserialize_did_document(inscription.content_text()?)?;
        (document.id == id).then_some((position, inscription, document))
    });

    let Some((position, inscription, document)) = latest else {
        return ResolutionResult::failed(ERROR_NOT_FOUND, format!("no DID document inscribed on satoshi {}", did.satoshi()));
    };

    let previous_versions = inscriptions[..position]
        .iter()
        .filter_map(Inscription::content_text)
        .filter_map(deserialize_did_document)
        .filter(|d| d.id == id)
        .count();
    let deactivated = burned || document.is_deactivated();

    ResolutionResult {
        did_resolution_metadata: DidResolutionMetadata {
            content_type: Some(DID_LD_JSON.to_string()),
            ..Default::default()
        },
        did_document_metadata: DidDocumentMetadata {
            deactivated: deactivated.then_some(true),
            inscription_id: Some(inscription.inscription_id.clone()),
            block_height: inscription.block_height,
            previous_versions: Some(previous_versions),
        },
        did_document: Some(document),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::prepare_content;
    use crate::did::document::{create_did_document, serialize_did_document, DidDocumentOptions};
    use crate::provider::{CreateInscriptionRequest, MemoryOrdinalsProvider};

    const SAT: u64 = 1_066_296_127_976_657;

    fn setup() -> (Arc<MemoryOrdinalsProvider>, DidResolver) {
        let provider = Arc::new(MemoryOrdinalsProvider::new(Network::Mainnet));
        let resolver = DidResolver::new().with_provider(Network::Mainnet, provider.clone());
        (provider, resolver)
    }

    async fn inscribe(provider: &MemoryOrdinalsProvider, body: &str, content_type: &str) -> Inscription {
        provider
            .create_inscription(CreateInscriptionRequest {
                content: prepare_content(body, content_type, None, None).unwrap(),
                satoshi: SAT,
                destination: None,
            })
            .await
            .unwrap()
    }

    async fn inscribe_doc(provider: &MemoryOrdinalsProvider, options: DidDocumentOptions) -> DidDocument {
        let doc = create_did_document(SAT, Network::Mainnet, options).unwrap().document;
        inscribe(provider, &serialize_did_document(&doc).unwrap(), "application/json").await;
        doc
    }

    fn did() -> String {
        format!("did:btco:{SAT}")
    }

    #[tokio::test]
    async fn resolves_latest_valid_document() {
        let (provider, resolver) = setup();
        inscribe_doc(&provider, DidDocumentOptions::default()).await;
        inscribe(&provider, "just text", "text/plain").await;
        let latest = inscribe_doc(&provider, DidDocumentOptions::default()).await;

        let result = resolver.resolve(&did()).await.unwrap();
        assert_eq!(result.did_document.as_ref(), Some(&latest));
        assert_eq!(result.did_resolution_metadata.content_type.as_deref(), Some(DID_LD_JSON));
        assert_eq!(result.did_document_metadata.previous_versions, Some(1));
        assert!(!result.is_deactivated());
    }

    #[tokio::test]
    async fn burn_marker_deactivates() {
        let (provider, resolver) = setup();
        inscribe_doc(&provider, DidDocumentOptions::default()).await;
        inscribe(&provider, BURN_MARKER, "text/plain").await;
        let result = resolver.resolve(&did()).await.unwrap();
        assert!(result.is_deactivated());
        assert!(result.did_document.is_some());
    }

    #[tokio::test]
    async fn deactivated_flag_deactivates() {
        let (provider, resolver) = setup();
        inscribe_doc(
            &provider,
            DidDocumentOptions {
                deactivated: true,
                ..Default::default()
            },
        )
        .await;
        assert!(resolver.resolve(&did()).await.unwrap().is_deactivated());
    }

    #[tokio::test]
    async fn misses_are_metadata_errors() {
        let (provider, resolver) = setup();
        assert_eq!(resolver.resolve(&did()).await.unwrap().error(), Some(ERROR_NOT_FOUND));
        assert_eq!(resolver.resolve("did:btco:nope").await.unwrap().error(), Some(ERROR_INVALID_DID));

        // A document for another satoshi does not count.
        let foreign = create_did_document(1, Network::Mainnet, DidDocumentOptions::default()).unwrap().document;
        inscribe(&provider, &serialize_did_document(&foreign).unwrap(), "application/json").await;
        assert_eq!(resolver.resolve(&did()).await.unwrap().error(), Some(ERROR_NOT_FOUND));
    }

    #[tokio::test]
    async fn missing_provider_is_an_error() {
        let (_, resolver) = setup();
        let err = resolver.resolve("did:btco:test:5").await.unwrap_err();
        assert_eq!(err.code(), "ORD_PROVIDER_REQUIRED");
    }

    #[tokio::test]
    async fn resource_resolution_and_info() {
        let (provider, resolver) = setup();
        let first = inscribe(&provider, "hello", "text/plain").await;
        inscribe_doc(&provider, DidDocumentOptions::default()).await;

        let content = resolver.resolve_resource(&format!("{}/0", did())).await.unwrap();
        assert!(content.did_document.is_none());
        assert_eq!(content.content_type(), Some("text/plain"));
        assert_eq!(content.content.as_deref(), Some(b"hello".as_slice()));
        let info = content.did_resolution_metadata.resource_info.clone().unwrap();
        assert_eq!(info.inscription_id, first.inscription_id);
        assert_eq!(info.id, format!("{}/0", did()));

        for url in [format!("{}/0/info", did()), format!("{}/0?format=application/json", did())] {
            let meta = resolver.resolve_resource(&url).await.unwrap();
            assert_eq!(meta.content_type(), Some(APPLICATION_JSON), "{url}");
            let parsed: ResourceInfo = serde_json::from_slice(meta.content.as_deref().unwrap()).unwrap();
            assert_eq!(parsed, info);
        }

        let legacy = resolver.resolve_resource(&format!("{}/resources/1", did())).await.unwrap();
        assert_eq!(legacy.did_resolution_metadata.resource_info.unwrap().index, 1);

        let missing = resolver.resolve_resource(&format!("{}/7", did())).await.unwrap();
        assert_eq!(missing.error(), Some(ERROR_RESOURCE_NOT_FOUND));
    }

    #[tokio::test]
    async fn resources_are_listed_in_order() {
        let (provider, resolver) = setup();
        for body in ["a", "b", "c"] {
            inscribe(&provider, body, "text/plain").await;
        }
        let listed = resolver.list_resources(&did()).await.unwrap();
        assert_eq!(listed.iter().map(|r| r.index).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(listed[2].hash, sha256_hex(b"c"));
    }

    #[tokio::test]
    async fn cache_serves_until_invalidated() {
        let (provider, resolver) = setup();
        let first = inscribe_doc(&provider, DidDocumentOptions::default()).await;
        assert_eq!(resolver.resolve(&did()).await.unwrap().did_document, Some(first.clone()));

        let second = inscribe_doc(&provider, DidDocumentOptions::default()).await;
        assert_eq!(resolver.resolve(&did()).await.unwrap().did_document, Some(first));

        resolver.invalidate(&did());
        assert_eq!(resolver.resolve(&did()).await.unwrap().did_document, Some(second));
    }

    #[tokio::test]
    async fn unconfirmed_inscriptions_sort_last() {
        let (provider, _) = setup();
        let pending = Inscription {
            block_height: None,
            ..inscribe(&provider, "pending", "text/plain").await
        };
        let late = Inscription {
            block_height: Some(9),
            ..inscribe(&provider, "late", "text/plain").await
        };
        let early_a = Inscription {
            block_height: Some(3),
            ..inscribe(&provider, "early-a", "text/plain").await
        };
        let early_b = Inscription {
            block_height: Some(3),
            ..inscribe(&provider, "early-b", "text/plain").await
        };

        let mut ordered = vec![pending.clone(), late.clone(), early_a.clone(), early_b.clone()];
        sort_for_resources(&mut ordered);
        assert_eq!(ordered, vec![early_a, early_b, late, pending]);
    }
}
