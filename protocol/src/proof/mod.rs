//! # Data-Integrity Proofs
//!
//! Signing and verification of JSON-LD documents (DID log entries,
//! verifiable credentials) with the `eddsa-rdfc-2022` cryptosuite, and
//! `eddsa-jcs-2022` for plain JSON.
//!
//! - **canonical** -- deterministic JSON serialization.
//! - **jsonld** -- context loading and expansion to RDF quads.
//! - **rdf** -- RDFC-1.0 dataset canonicalization.
//! - **types** -- the proof model and its options.
//! - **loader** -- dereferencing contexts and verification methods.
//! - **eddsa** -- proof creation and verification.
//! - **signer** -- the signing seam for external and managed keys.

pub mod canonical;
pub mod eddsa;
pub mod jsonld;
pub mod loader;
pub mod rdf;
pub mod signer;
pub mod types;

pub use canonical::{canonical_json, canonicalize};
pub use eddsa::{
    attach_proof, create_proof, create_proof_with_signer, hash_data, verify_document, verify_proof,
    PrivateKeyInput,
};
pub use jsonld::{to_rdf, ContextSet};
pub use loader::{
    did_key_verification_method, load_document, load_verification_method, DocumentLoader, RemoteDocument,
    ResolverDocumentLoader, StaticDocumentLoader,
};
pub use rdf::{Quad, Term};
pub use signer::{KeyManagerSigner, LocalSigner, ProofSigner, SignRequest};
pub use types::{
    Cryptosuite, DataIntegrityProof, ProofOptions, VerificationResult, VerifyOptions, ASSERTION_METHOD,
    AUTHENTICATION, DATA_INTEGRITY_PROOF, EDDSA_JCS_2022, EDDSA_RDFC_2022,
};
