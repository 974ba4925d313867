//! # Key Management
//!
//! - **manager** -- [`KeyManager`]: create, import, sign, verify, derive.
//! - **record** -- what a stored key looks like, and its public view.
//! - **store** -- the persistence contract plus memory and sled backends.

pub mod manager;
pub mod record;
pub mod store;

pub use manager::KeyManager;
pub use record::{KeyInfo, KeyRecord};
pub use store::{KeyStore, MemoryKeyStore, SledKeyStore, StoreError};
