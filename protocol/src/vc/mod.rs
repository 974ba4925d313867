//! # Verifiable Credentials
//!
//! W3C-shaped credentials describing inscribed content, signed with the
//! Data-Integrity cryptosuite.
//!
//! ```text
//!   CredentialRequest ──► create_credential ──► sign_credential ──► VerifiableCredential
//!                                                                        │
//!                                        verify_credential ◄─────────────┘
//! ```

pub mod credential;
pub mod issuer;

pub use credential::{
    default_context, CredentialSubject, Issuer, VerifiableCredential, VERIFIABLE_COLLECTIBLE, VERIFIABLE_CREDENTIAL,
};
pub use issuer::{
    create_credential, sign_credential, validate_credential, verify_credential, CredentialIssuer, CredentialRequest,
};
