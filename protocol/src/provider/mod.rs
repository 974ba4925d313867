//! # Ledger-Indexing Provider
//!
//! The protocol never talks to a node directly. Everything it needs from the
//! ledger (inscriptions by id or by satoshi, broadcast, confirmation status,
//! fee estimates) comes through [`OrdinalsProvider`], so the same resolver
//! and orchestrator run against an ord indexer, a hosted API, or the
//! in-memory provider used by tests.
//!
//! Implementations must return a satoshi's inscriptions in creation order:
//! resource indices are derived from that order and never change once
//! assigned.

pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::content::InscriptionContent;
use crate::error::BtcoResult;

pub use memory::MemoryOrdinalsProvider;

/// One inscription as reported by the indexer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inscription {
    /// `<reveal txid>i<index>`.
    pub inscription_id: String,
    pub satoshi: u64,
    #[serde(with = "hex::serde")]
    pub content: Vec<u8>,
    pub content_type: String,
    pub txid: String,
    pub vout: u32,
    /// `None` while the reveal is unconfirmed.
    pub block_height: Option<u64>,
    /// Current owner, when the indexer knows it.
    pub address: Option<String>,
}

impl Inscription {
    pub fn content_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

/// What to inscribe, where.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInscriptionRequest {
    pub content: InscriptionContent,
    /// Satoshi the inscription should land on.
    pub satoshi: u64,
    /// Receiving address for the inscribed output.
    pub destination: Option<String>,
}

/// Ledger view of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatus {
    pub txid: String,
    pub confirmed: bool,
    pub block_height: Option<u64>,
    pub confirmations: u32,
}

/// Read/write access to an ordinals-aware ledger index.
#[async_trait]
pub trait OrdinalsProvider: Send + Sync {
    /// Inscribe content on a satoshi in one step (indexer-side wallets).
    async fn create_inscription(&self, request: CreateInscriptionRequest) -> BtcoResult<Inscription>;

    async fn get_inscription_by_id(&self, inscription_id: &str) -> BtcoResult<Option<Inscription>>;

    /// Move an inscription to `to_address`. Returns the transfer txid.
    async fn transfer_inscription(&self, inscription_id: &str, to_address: &str) -> BtcoResult<String>;

    /// Every inscription on `satoshi`, oldest first.
    async fn get_inscriptions_by_satoshi(&self, satoshi: u64) -> BtcoResult<Vec<Inscription>>;

    /// Broadcast a raw transaction (consensus hex). Returns its txid.
    async fn broadcast_transaction(&self, tx_hex: &str) -> BtcoResult<String>;

    async fn get_transaction_status(&self, txid: &str) -> BtcoResult<TransactionStatus>;

    /// Fee rate in sat/vB for confirmation within `target_blocks`.
    async fn estimate_fee(&self, target_blocks: u32) -> BtcoResult<u64>;
}
