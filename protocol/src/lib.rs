// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # BTCO Protocol -- Core Library
//!
//! Identity anchored to individual satoshis. A `did:btco` DID names one
//! satoshi; its DID documents, resources and deactivation marker are
//! inscriptions on that satoshi, written with Taproot commit/reveal
//! transactions and signed with Ed25519 Data-Integrity proofs.
//!
//! ## Architecture
//!
//! ```text
//!            KeyManager ─────────────┐
//!                │                   │
//!   content ──► inscription ──► OrdinalsProvider ◄── did::resolver
//!   pipeline    (commit/reveal,       (ledger index)        │
//!               orchestrator)                               ▼
//!                                                   proof loader ──► proof::eddsa ◄── vc
//! ```
//!
//! - **config** -- protocol constants, networks and runtime configuration.
//! - **error** -- the error taxonomy shared by every module.
//! - **logging** -- `tracing` subscriber setup for embedding applications.
//! - **crypto** -- hashing, Ed25519 keys and multikey encoding.
//! - **keys** -- key generation, import, storage and signing.
//! - **content** -- MIME detection, validation, preparation and chunking.
//! - **provider** -- the ledger-indexing provider seam and an in-memory one.
//! - **inscription** -- envelope scripts, Taproot commit/reveal, fees and
//!   the orchestrated inscription flow.
//! - **did** -- identifiers, documents, DID URLs, resolution and DID logs.
//! - **proof** -- JSON-LD expansion, RDFC-1.0 and the `eddsa-rdfc-2022` cryptosuite.
//! - **vc** -- verifiable credentials over inscribed content.
//!
//! ## Design Rules
//!
//! 1. No global mutable state: stores, caches and providers are injected.
//! 2. Secrets are zeroized on drop and never logged.
//! 3. Verification reports `{verified, errors}` instead of failing.
//! 4. Every broadcast output respects the dust limit.

pub mod config;
pub mod content;
pub mod crypto;
pub mod did;
pub mod error;
pub mod inscription;
pub mod keys;
pub mod logging;
pub mod proof;
pub mod provider;
pub mod vc;

pub use config::{Network, ProtocolConfig};
pub use did::{BtcoDid, DidDocument, DidResolver, DidUrl};
pub use error::{BtcoError, BtcoResult};
pub use inscription::{InscriptionOrchestrator, InscriptionRequest};
pub use keys::KeyManager;
pub use proof::{DataIntegrityProof, DocumentLoader, ProofSigner};
pub use provider::{Inscription, MemoryOrdinalsProvider, OrdinalsProvider};
pub use vc::{CredentialIssuer, VerifiableCredential};
