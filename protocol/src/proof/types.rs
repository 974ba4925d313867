//! Data-Integrity proof model.

use std::fmt;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BtcoError, BtcoResult};

/// `type` of every proof this crate emits.
pub const DATA_INTEGRITY_PROOF: &str = "DataIntegrityProof";

/// Ed25519 over RDFC-1.0 canonical N-Quads.
pub const EDDSA_RDFC_2022: &str = "eddsa-rdfc-2022";

/// Ed25519 over JCS canonical JSON.
pub const EDDSA_JCS_2022: &str = "eddsa-jcs-2022";

pub const ASSERTION_METHOD: &str = "assertionMethod";
pub const AUTHENTICATION: &str = "authentication";

/// How a document and its proof configuration are canonicalized before
/// hashing. Both sign with Ed25519.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Cryptosuite {
    /// JSON-LD expanded through its contexts, then RDFC-1.0.
    #[default]
    EddsaRdfc2022,
    /// Sorted-key JSON. For documents that are not JSON-LD.
    EddsaJcs2022,
}

impl Cryptosuite {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EddsaRdfc2022 => EDDSA_RDFC_2022,
            Self::EddsaJcs2022 => EDDSA_JCS_2022,
        }
    }

    /// Fails with `VERIFICATION_FAILED` for suites this crate cannot check.
    pub fn parse(value: &str) -> BtcoResult<Self> {
        match value {
            EDDSA_RDFC_2022 => Ok(Self::EddsaRdfc2022),
            EDDSA_JCS_2022 => Ok(Self::EddsaJcs2022),
            other => Err(BtcoError::VerificationFailed(format!("unsupported cryptosuite '{other}'"))),
        }
    }
}

impl fmt::Display for Cryptosuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A Data-Integrity proof. Never modified once created; documents gain
/// new proofs by appending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataIntegrityProof {
    #[serde(rename = "type")]
    pub type_: String,
    pub cryptosuite: String,
    pub verification_method: String,
    pub proof_purpose: String,
    /// XML Schema dateTime, second precision.
    pub created: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Multibase base58btc signature. Absent only on a proof configuration
    /// that has not been signed yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_value: Option<String>,
}

impl DataIntegrityProof {
    /// The unsigned configuration described by `options`.
    pub fn configuration(options: &ProofOptions) -> Self {
        let created = options.created.unwrap_or_else(Utc::now);
        Self {
            type_: DATA_INTEGRITY_PROOF.to_string(),
            cryptosuite: options.cryptosuite.to_string(),
            verification_method: options.verification_method.clone(),
            proof_purpose: options
                .proof_purpose
                .clone()
                .unwrap_or_else(|| ASSERTION_METHOD.to_string()),
            created: xsd_datetime(created),
            challenge: options.challenge.clone(),
            domain: options.domain.clone(),
            proof_value: None,
        }
    }

    /// This proof without its `proofValue`.
    pub fn without_value(&self) -> Self {
        Self {
            proof_value: None,
            ..self.clone()
        }
    }
}

/// Options for creating a proof.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProofOptions {
    pub verification_method: String,
    pub cryptosuite: Cryptosuite,
    /// Defaults to `assertionMethod`.
    pub proof_purpose: Option<String>,
    /// Defaults to now.
    pub created: Option<DateTime<Utc>>,
    pub challenge: Option<String>,
    pub domain: Option<String>,
}

impl ProofOptions {
    pub fn new(verification_method: impl Into<String>) -> Self {
        Self {
            verification_method: verification_method.into(),
            ..Default::default()
        }
    }

    pub fn with_cryptosuite(mut self, cryptosuite: Cryptosuite) -> Self {
        self.cryptosuite = cryptosuite;
        self
    }

    pub fn with_purpose(mut self, purpose: &str) -> Self {
        self.proof_purpose = Some(purpose.to_string());
        self
    }

    pub fn with_challenge(mut self, challenge: &str) -> Self {
        self.challenge = Some(challenge.to_string());
        self
    }

    pub fn with_domain(mut self, domain: &str) -> Self {
        self.domain = Some(domain.to_string());
        self
    }
}

/// What a verifier expects of a proof, beyond a valid signature.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyOptions {
    pub expected_proof_purpose: Option<String>,
    pub challenge: Option<String>,
    pub domain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl VerificationResult {
    pub fn success() -> Self {
        Self {
            verified: true,
            errors: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            verified: false,
            errors: Some(vec![message.into()]),
        }
    }

    pub fn errors(&self) -> &[String] {
        self.errors.as_deref().unwrap_or_default()
    }
}

/// `2026-03-01T12:00:00Z`.
pub fn xsd_datetime(at: DateTime<Utc>) -> String {
    at.trunc_subsecs(0).to_rfc3339_opts(SecondsFormat::Secs, true)
}
