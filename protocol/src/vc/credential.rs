//! Credential data model.
//!
//! A credential binds a subject DID to a description of inscribed content:
//!
//! ```text
//! {
//!   "@context": ["https://www.w3.org/2018/credentials/v1", "https://ordinals.plus/v1"],
//!   "type": ["VerifiableCredential", "VerifiableCollectible"],
//!   "issuer": {"id": "did:btco:1954913028215432"},
//!   "issuanceDate": "2026-03-01T12:00:00Z",
//!   "credentialSubject": {
//!     "id": "did:btco:1066296127976657/0",
//!     "contentInfo": {"mimeType": "image/png", "hash": "...", "size": 5120}
//!   },
//!   "proof": {...}
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::config::{BTCO_CONTEXT_V1, VC_CONTEXT_V1};
use crate::content::ContentInfo;
use crate::error::BtcoResult;
use crate::proof::types::DataIntegrityProof;

pub const VERIFIABLE_CREDENTIAL: &str = "VerifiableCredential";

/// Type added to credentials describing inscribed collectibles.
pub const VERIFIABLE_COLLECTIBLE: &str = "VerifiableCollectible";

/// The issuer, written either as a bare id or as an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "IssuerRepr")]
pub struct Issuer {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IssuerRepr {
    Id(String),
    Object {
        id: String,
        #[serde(default)]
        name: Option<String>,
    },
}

impl From<IssuerRepr> for Issuer {
    fn from(repr: IssuerRepr) -> Self {
        match repr {
            IssuerRepr::Id(id) => Self { id, name: None },
            IssuerRepr::Object { id, name } => Self { id, name },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSubject {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    pub content_info: ContentInfo,
    /// Any further claims.
    #[serde(flatten)]
    pub claims: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiableCredential {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub types: Vec<String>,
    pub issuer: Issuer,
    pub issuance_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<String>,
    pub credential_subject: CredentialSubject,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "proofs_out",
        deserialize_with = "proofs_in"
    )]
    pub proof: Vec<DataIntegrityProof>,
}

/// A single proof is written as an object, several as an array.
fn proofs_out<S: Serializer>(proofs: &[DataIntegrityProof], serializer: S) -> Result<S::Ok, S::Error> {
    match proofs {
        [single] => single.serialize(serializer),
        many => many.serialize(serializer),
    }
}

fn proofs_in<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<DataIntegrityProof>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<DataIntegrityProof>),
        One(Box<DataIntegrityProof>),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(proofs) => proofs,
        OneOrMany::One(proof) => vec![*proof],
    })
}

/// The contexts every credential starts with.
pub fn default_context() -> Vec<String> {
    vec![VC_CONTEXT_V1.to_string(), BTCO_CONTEXT_V1.to_string()]
}

impl VerifiableCredential {
    pub fn issuer_id(&self) -> &str {
        &self.issuer.id
    }

    pub fn is_signed(&self) -> bool {
        !self.proof.is_empty()
    }

    /// Parsed `expirationDate`; `Ok(None)` when the credential has none.
    pub fn expires_at(&self) -> Result<Option<DateTime<Utc>>, chrono::ParseError> {
        self.expiration_date
            .as_deref()
            .map(|date| DateTime::parse_from_rfc3339(date).map(|at| at.with_timezone(&Utc)))
            .transpose()
    }

    /// Whether the credential has expired at `now`. An unparseable date
    /// counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at() {
            Ok(Some(at)) => at <= now,
            Ok(None) => false,
            Err(_) => true,
        }
    }

    pub fn to_value(&self) -> BtcoResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_json(json: &str) -> BtcoResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::content_info;
    use serde_json::json;

    fn credential() -> VerifiableCredential {
        VerifiableCredential {
            context: default_context(),
            id: None,
            types: vec![VERIFIABLE_CREDENTIAL.into()],
            issuer: Issuer {
                id: "did:btco:1".into(),
                name: None,
            },
            issuance_date: "2026-03-01T12:00:00Z".into(),
            expiration_date: None,
            credential_subject: CredentialSubject {
                id: "did:btco:2/0".into(),
                type_: None,
                title: Some("Sunrise".into()),
                description: None,
                creator: None,
                content_info: content_info(b"png", "image/png"),
                claims: Map::new(),
            },
            proof: Vec::new(),
        }
    }

    #[test]
    fn issuer_accepts_string_or_object() {
        let mut value = credential().to_value().unwrap();
        assert_eq!(value["issuer"], json!({"id": "did:btco:1"}));

        value["issuer"] = json!("did:btco:9");
        let parsed: VerifiableCredential = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.issuer_id(), "did:btco:9");
    }

    #[test]
    fn extra_subject_claims_are_kept() {
        let mut value = credential().to_value().unwrap();
        value["credentialSubject"]["edition"] = json!(3);
        let parsed: VerifiableCredential = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(parsed.credential_subject.claims["edition"], json!(3));
        assert_eq!(parsed.to_value().unwrap(), value);
    }

    #[test]
    fn unsigned_credentials_omit_proof() {
        let value = credential().to_value().unwrap();
        assert!(value.get("proof").is_none());
        assert!(!credential().is_signed());
    }

    #[test]
    fn expiry() {
        let now = Utc::now();
        let mut vc = credential();
        assert!(!vc.is_expired_at(now));
        vc.expiration_date = Some("2000-01-01T00:00:00Z".into());
        assert!(vc.is_expired_at(now));
        vc.expiration_date = Some("2999-01-01T00:00:00Z".into());
        assert!(!vc.is_expired_at(now));
        vc.expiration_date = Some("soon".into());
        assert!(vc.is_expired_at(now));
    }
}
