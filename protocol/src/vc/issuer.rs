//! Issuing and verifying credentials.
//!
//! Signing and verification are delegated to the `eddsa-rdfc-2022`
//! cryptosuite; this module adds the credential-level rules on top:
//!
//! - the structure must be well formed (contexts, types, ids, dates);
//! - the credential must not have expired;
//! - every proof must be made with a verification method of the issuer,
//!   for the `assertionMethod` purpose.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::credential::{
    default_context, CredentialSubject, Issuer, VerifiableCredential, VERIFIABLE_COLLECTIBLE, VERIFIABLE_CREDENTIAL,
};
use crate::config::VC_CONTEXT_V1;
use crate::content::ContentInfo;
use crate::did::document::ValidationResult;
use crate::error::{BtcoError, BtcoResult};
use crate::proof::eddsa::{create_proof_with_signer, verify_proof};
use crate::proof::loader::DocumentLoader;
use crate::proof::signer::ProofSigner;
use crate::proof::types::{xsd_datetime, ProofOptions, VerificationResult, VerifyOptions, ASSERTION_METHOD};

/// Everything needed to issue a credential about a piece of content.
#[derive(Debug, Clone)]
pub struct CredentialRequest {
    pub subject_id: String,
    pub issuer_id: String,
    pub issuer_name: Option<String>,
    pub content: ContentInfo,
    pub id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub creator: Option<String>,
    /// Extra `type` entries after `VerifiableCredential`. Defaults to
    /// `VerifiableCollectible`.
    pub types: Vec<String>,
    pub expiration: Option<DateTime<Utc>>,
    pub claims: Map<String, Value>,
}

impl CredentialRequest {
    pub fn new(subject_id: impl Into<String>, issuer_id: impl Into<String>, content: ContentInfo) -> Self {
        Self {
            subject_id: subject_id.into(),
            issuer_id: issuer_id.into(),
            issuer_name: None,
            content,
            id: None,
            title: None,
            description: None,
            creator: None,
            types: vec![VERIFIABLE_COLLECTIBLE.to_string()],
            expiration: None,
            claims: Map::new(),
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn with_creator(mut self, creator: &str) -> Self {
        self.creator = Some(creator.to_string());
        self
    }

    pub fn with_expiration(mut self, at: DateTime<Utc>) -> Self {
        self.expiration = Some(at);
        self
    }

    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Build an unsigned credential. Dates are truncated to whole seconds.
pub fn create_credential(request: CredentialRequest) -> BtcoResult<VerifiableCredential> {
    if !request.subject_id.starts_with("did:") {
        return Err(BtcoError::InvalidInput(format!("subject '{}' is not a DID", request.subject_id)));
    }
    if !request.issuer_id.starts_with("did:") {
        return Err(BtcoError::InvalidInput(format!("issuer '{}' is not a DID", request.issuer_id)));
    }
    let now = Utc::now();
    if request.expiration.is_some_and(|at| at <= now) {
        return Err(BtcoError::InvalidInput("expiration must be in the future".into()));
    }

    let mut types = vec![VERIFIABLE_CREDENTIAL.to_string()];
    types.extend(request.types.into_iter().filter(|t| t != VERIFIABLE_CREDENTIAL));

    let credential = VerifiableCredential {
        context: default_context(),
        id: request.id,
        types,
        issuer: Issuer {
            id: request.issuer_id,
            name: request.issuer_name,
        },
        issuance_date: xsd_datetime(now),
        expiration_date: request.expiration.map(xsd_datetime),
        credential_subject: CredentialSubject {
            id: request.subject_id,
            type_: None,
            title: request.title,
            description: request.description,
            creator: request.creator,
            content_info: request.content,
            claims: request.claims,
        },
        proof: Vec::new(),
    };
    debug!(issuer = %credential.issuer.id, subject = %credential.credential_subject.id, "created credential");
    Ok(credential)
}

/// Structural checks. Every problem is reported.
pub fn validate_credential(credential: &VerifiableCredential) -> ValidationResult {
    let mut errors = Vec::new();

    if credential.context.first().map(String::as_str) != Some(VC_CONTEXT_V1) {
        errors.push(format!("@context must start with {VC_CONTEXT_V1}"));
    }
    if !credential.types.iter().any(|t| t == VERIFIABLE_CREDENTIAL) {
        errors.push(format!("type must include {VERIFIABLE_CREDENTIAL}"));
    }
    if !credential.issuer.id.starts_with("did:") {
        errors.push(format!("issuer '{}' is not a DID", credential.issuer.id));
    }
    if credential.credential_subject.id.trim().is_empty() {
        errors.push("credentialSubject.id is required".to_string());
    }
    if DateTime::parse_from_rfc3339(&credential.issuance_date).is_err() {
        errors.push(format!("issuanceDate '{}' is not a valid date", credential.issuance_date));
    }
    if credential.expires_at().is_err() {
        errors.push("expirationDate is not a valid date".to_string());
    }
    let info = &credential.credential_subject.content_info;
    if info.mime_type.trim().is_empty() {
        errors.push("contentInfo.mimeType is required".to_string());
    }
    if info.hash.len() != 64 || hex::decode(&info.hash).is_err() {
        errors.push("contentInfo.hash must be a hex SHA-256 digest".to_string());
    }

    ValidationResult {
        is_valid: errors.is_empty(),
        errors,
    }
}

/// Append an `assertionMethod` proof by `signer`.
pub async fn sign_credential(
    credential: &VerifiableCredential,
    signer: &dyn ProofSigner,
    loader: &dyn DocumentLoader,
) -> BtcoResult<VerifiableCredential> {
    let validation = validate_credential(credential);
    if !validation.is_valid {
        return Err(BtcoError::InvalidInput(validation.errors.join("; ")));
    }
    let verification_method = signer.verification_method_id();
    if !is_controlled_by(&verification_method, &credential.issuer.id) {
        return Err(BtcoError::InvalidInput(format!(
            "{verification_method} is not a verification method of issuer {}",
            credential.issuer.id
        )));
    }

    let document = credential.to_value()?;
    let options = ProofOptions::new(verification_method).with_purpose(ASSERTION_METHOD);
    let proof = create_proof_with_signer(&document, &options, signer, loader).await?;
    info!(issuer = %credential.issuer.id, verification_method = %proof.verification_method, "signed credential");

    let mut signed = credential.clone();
    signed.proof.push(proof);
    Ok(signed)
}

/// Check structure, expiry, issuer control and every proof. Never fails.
pub async fn verify_credential(credential: &VerifiableCredential, loader: &dyn DocumentLoader) -> VerificationResult {
    let mut errors = validate_credential(credential).errors;
    if credential.is_expired_at(Utc::now()) {
        errors.push("credential has expired".to_string());
    }
    if credential.proof.is_empty() {
        errors.push("credential carries no proof".to_string());
    }

    if errors.is_empty() {
        let options = VerifyOptions {
            expected_proof_purpose: Some(ASSERTION_METHOD.to_string()),
            ..VerifyOptions::default()
        };
        match credential.to_value() {
            Ok(document) => {
                for proof in &credential.proof {
                    if !is_controlled_by(&proof.verification_method, &credential.issuer.id) {
                        errors.push(format!(
                            "{} is not a verification method of issuer {}",
                            proof.verification_method, credential.issuer.id
                        ));
                        continue;
                    }
                    let result = verify_proof(&document, proof, &options, loader).await;
                    errors.extend(result.errors().iter().cloned());
                }
            }
            Err(e) => errors.push(e.to_string()),
        }
    }

    debug!(issuer = %credential.issuer.id, errors = errors.len(), "verified credential");
    if errors.is_empty() {
        VerificationResult::success()
    } else {
        VerificationResult {
            verified: false,
            errors: Some(errors),
        }
    }
}

/// A verification method belongs to the DID it is a fragment of.
fn is_controlled_by(verification_method: &str, issuer: &str) -> bool {
    verification_method
        .split_once('#')
        .is_some_and(|(did, _)| did == issuer)
}

// ---------------------------------------------------------------------------
// CredentialIssuer
// ---------------------------------------------------------------------------

/// A signer and a loader bundled for repeated issuance.
#[derive(Clone)]
pub struct CredentialIssuer {
    signer: Arc<dyn ProofSigner>,
    loader: Arc<dyn DocumentLoader>,
}

impl CredentialIssuer {
    pub fn new(signer: Arc<dyn ProofSigner>, loader: Arc<dyn DocumentLoader>) -> Self {
        Self { signer, loader }
    }

    /// The DID this issuer signs as.
    pub fn issuer_id(&self) -> String {
        let method = self.signer.verification_method_id();
        match method.split_once('#') {
            Some((did, _)) => did.to_string(),
            None => method,
        }
    }

    /// Create and sign a credential. `request.issuer_id` is replaced by
    /// [`Self::issuer_id`] when empty.
    pub async fn issue(&self, mut request: CredentialRequest) -> BtcoResult<VerifiableCredential> {
        if request.issuer_id.is_empty() {
            request.issuer_id = self.issuer_id();
        }
        let credential = create_credential(request)?;
        sign_credential(&credential, self.signer.as_ref(), self.loader.as_ref()).await
    }

    pub async fn verify(&self, credential: &VerifiableCredential) -> VerificationResult {
        verify_credential(credential, self.loader.as_ref()).await
    }
}

impl std::fmt::Debug for CredentialIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialIssuer")
            .field("verification_method", &self.signer.verification_method_id())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::content_info;
    use crate::crypto::keys::EdKeypair;
    use crate::proof::eddsa::PrivateKeyInput;
    use crate::proof::loader::StaticDocumentLoader;
    use crate::proof::signer::LocalSigner;
    use chrono::Duration;
    use serde_json::json;

    fn issuer() -> CredentialIssuer {
        let signer = LocalSigner::did_key(&PrivateKeyInput::from(&EdKeypair::generate())).unwrap();
        CredentialIssuer::new(Arc::new(signer), Arc::new(StaticDocumentLoader::new()))
    }

    fn request() -> CredentialRequest {
        CredentialRequest::new("did:btco:1066296127976657/0", "", content_info(b"\x89PNG", "image/png"))
            .with_title("Sunrise")
            .with_claim("edition", json!(1))
    }

    #[tokio::test]
    async fn issued_credentials_verify() {
        let issuer = issuer();
        let vc = issuer.issue(request()).await.unwrap();

        assert_eq!(vc.issuer_id(), issuer.issuer_id());
        assert_eq!(vc.types, vec![VERIFIABLE_CREDENTIAL.to_string(), VERIFIABLE_COLLECTIBLE.to_string()]);
        assert!(!vc.issuance_date.contains('.'));
        assert_eq!(vc.proof[0].proof_purpose, ASSERTION_METHOD);
        assert!(issuer.verify(&vc).await.verified);

        let json = serde_json::to_string(&vc).unwrap();
        let parsed = VerifiableCredential::from_json(&json).unwrap();
        assert!(issuer.verify(&parsed).await.verified);
    }

    #[tokio::test]
    async fn tampered_subject_fails() {
        let issuer = issuer();
        let mut vc = issuer.issue(request()).await.unwrap();
        vc.credential_subject.title = Some("Sunset".into());
        assert!(!issuer.verify(&vc).await.verified);
    }

    #[tokio::test]
    async fn proofs_must_come_from_the_issuer() {
        let issuer = issuer();
        let mut vc = issuer.issue(request()).await.unwrap();
        vc.issuer.id = "did:btco:42".into();
        let result = issuer.verify(&vc).await;
        assert!(result.errors().iter().any(|e| e.contains("not a verification method of issuer")));

        let unsigned = create_credential(CredentialRequest::new(
            "did:btco:1",
            "did:btco:42",
            content_info(b"x", "text/plain"),
        ))
        .unwrap();
        let loader = StaticDocumentLoader::new();
        let signer = LocalSigner::did_key(&PrivateKeyInput::from(&EdKeypair::generate())).unwrap();
        assert_eq!(sign_credential(&unsigned, &signer, &loader).await.unwrap_err().code(), "INVALID_INPUT");
    }

    #[tokio::test]
    async fn expired_and_unsigned_credentials_fail() {
        let loader = StaticDocumentLoader::new();
        let mut vc = create_credential(CredentialRequest::new(
            "did:btco:1",
            "did:btco:2",
            content_info(b"x", "text/plain"),
        ))
        .unwrap();
        let result = verify_credential(&vc, &loader).await;
        assert_eq!(result.errors(), ["credential carries no proof"]);

        vc.expiration_date = Some(xsd_datetime(Utc::now() - Duration::days(1)));
        let result = verify_credential(&vc, &loader).await;
        assert!(result.errors().iter().any(|e| e == "credential has expired"));
    }

    #[test]
    fn create_rejects_bad_input() {
        let content = content_info(b"x", "text/plain");
        assert!(create_credential(CredentialRequest::new("alice", "did:btco:1", content.clone())).is_err());
        assert!(create_credential(CredentialRequest::new("did:btco:1", "bob", content.clone())).is_err());
        let past = CredentialRequest::new("did:btco:1", "did:btco:2", content).with_expiration(Utc::now() - Duration::hours(1));
        assert!(create_credential(past).is_err());
    }

    #[test]
    fn validation_reports_every_problem() {
        let mut vc = create_credential(CredentialRequest::new(
            "did:btco:1",
            "did:btco:2",
            content_info(b"x", "text/plain"),
        ))
        .unwrap();
        assert!(validate_credential(&vc).is_valid);

        vc.context.clear();
        vc.types = vec!["Thing".into()];
        vc.credential_subject.content_info.hash = "abc".into();
        let result = validate_credential(&vc);
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 3);
    }
}
