//! # `did:btco` -- Satoshi-Anchored DIDs
//!
//! A DID names a single satoshi; whatever is inscribed on that satoshi is
//! the DID's history.
//!
//! ```text
//!   did:btco:[test:|sig:]<satoshi>[/<resource>][?query][#fragment]
//!
//!   sat 1066296127976657 ── inscription 0 ── DID document v1
//!                        ├─ inscription 1 ── image/png         (resource 1)
//!                        ├─ inscription 2 ── DID document v2   (latest)
//!                        └─ inscription 3 ── burn marker       (deactivated)
//! ```
//!
//! | Module       | Purpose                                               |
//! |--------------|-------------------------------------------------------|
//! | `identifier` | Parsing and building DIDs per network                 |
//! | `url`        | DID URLs addressing resources on the satoshi          |
//! | `document`   | DID document model, creation, validation              |
//! | `resolver`   | Resolution of documents and resources via a provider  |
//! | `log`        | Signed, hash-chained version history (JSONL)          |

pub mod document;
pub mod identifier;
pub mod log;
pub mod resolver;
pub mod url;

pub use document::{
    create_did_document, deserialize_did_document, document_for_key, serialize_did_document, validate_did_document,
    CreatedDidDocument, DidDocument, DidDocumentOptions, Service, ValidationResult, VerificationMethod,
    DEFAULT_KEY_FRAGMENT, ED25519_VERIFICATION_KEY_2020, MULTIKEY_TYPE,
};
pub use identifier::{build_did, is_valid_did, parse_did, parse_satoshi, BtcoDid};
pub use log::{DidLog, DidLogEntry, LogParameters, LOG_METHOD};
pub use resolver::{
    DidDocumentMetadata, DidResolutionMetadata, DidResolver, Resolved, ResolutionResult, ResourceInfo,
    ResourceResolution, DID_LD_JSON,
};
pub use url::{parse_did_url, DidUrl};
