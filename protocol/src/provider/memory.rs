//! # In-Memory Provider
//!
//! A self-contained ledger index for tests and local development. It keeps
//! enough of the ledger to run the full commit/reveal flow end to end:
//!
//! - **Funding** -- [`fund`](MemoryOrdinalsProvider::fund) mints a UTXO,
//!   optionally pinned to a known satoshi.
//! - **Sat tracking** -- the first sat of input 0 flows to output 0, which
//!   is exactly where ordinal theory puts it.
//! - **Indexing** -- broadcast transactions are scanned for inscription
//!   envelopes in their script-path witnesses.
//! - **Blocks** -- [`mine_block`](MemoryOrdinalsProvider::mine_block)
//!   confirms everything pending.
//!
//! State sits behind one `parking_lot::RwLock`; no lock is held across an
//! await point.

use std::collections::HashMap;

use async_trait::async_trait;
use bitcoin::hashes::Hash;
use bitcoin::{Address, OutPoint, Script, ScriptBuf, Transaction, Txid};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::{CreateInscriptionRequest, Inscription, OrdinalsProvider, TransactionStatus};
use crate::config::{Network, DEFAULT_FEE_RATE_SAT_VB};
use crate::crypto::hash::sha256;
use crate::error::{BtcoError, BtcoResult};
use crate::inscription::address::validate_address;
use crate::inscription::fees::Utxo;
use crate::inscription::script::parse_envelope;

#[derive(Debug, Default)]
struct LedgerState {
    inscriptions: HashMap<String, Inscription>,
    /// Inscription ids per satoshi, in creation order.
    by_satoshi: HashMap<u64, Vec<String>>,
    /// txid -> confirmation height (`None` while in the mempool).
    transactions: HashMap<String, Option<u64>>,
    broadcasts: Vec<String>,
    /// First sat of each output we know about.
    sat_locations: HashMap<OutPoint, u64>,
    tip_height: u64,
    nonce: u64,
}

impl LedgerState {
    fn synthetic_txid(&mut self, salt: &[u8]) -> Txid {
        self.nonce += 1;
        let mut preimage = self.nonce.to_le_bytes().to_vec();
        preimage.extend_from_slice(salt);
        Txid::from_byte_array(sha256(&preimage))
    }

    fn index(&mut self, inscription: Inscription) {
        self.by_satoshi
            .entry(inscription.satoshi)
            .or_default()
            .push(inscription.inscription_id.clone());
        self.inscriptions
            .insert(inscription.inscription_id.clone(), inscription);
    }
}

/// In-memory [`OrdinalsProvider`].
#[derive(Debug)]
pub struct MemoryOrdinalsProvider {
    network: Network,
    fee_rate: RwLock<u64>,
    fail_broadcasts: RwLock<bool>,
    state: RwLock<LedgerState>,
}

impl Default for MemoryOrdinalsProvider {
    fn default() -> Self {
        Self::new(Network::default())
    }
}

impl MemoryOrdinalsProvider {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            fee_rate: RwLock::new(DEFAULT_FEE_RATE_SAT_VB),
            fail_broadcasts: RwLock::new(false),
            state: RwLock::new(LedgerState {
                tip_height: 1,
                ..LedgerState::default()
            }),
        }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Fee rate returned by `estimate_fee`.
    pub fn set_fee_rate(&self, sat_per_vb: u64) {
        *self.fee_rate.write() = sat_per_vb;
    }

    /// Make every following broadcast fail, to exercise error paths.
    pub fn set_fail_broadcasts(&self, fail: bool) {
        *self.fail_broadcasts.write() = fail;
    }

    /// Mint a confirmed UTXO of `value` sats paying `script_pubkey`. If
    /// `satoshi` is given, it is the first sat of the new output.
    pub fn fund(&self, satoshi: Option<u64>, value: u64, script_pubkey: ScriptBuf) -> Utxo {
        let mut state = self.state.write();
        let txid = state.synthetic_txid(script_pubkey.as_bytes());
        let outpoint = OutPoint::new(txid, 0);
        let height = state.tip_height;
        state.transactions.insert(txid.to_string(), Some(height));
        if let Some(sat) = satoshi {
            state.sat_locations.insert(outpoint, sat);
        }
        debug!(%outpoint, value, ?satoshi, "funded utxo");
        Utxo {
            outpoint,
            value,
            script_pubkey,
        }
    }

    /// Confirm everything pending in a new block. Returns its height.
    pub fn mine_block(&self) -> u64 {
        let mut state = self.state.write();
        state.tip_height += 1;
        let height = state.tip_height;
        for confirmed_at in state.transactions.values_mut() {
            confirmed_at.get_or_insert(height);
        }
        for inscription in state.inscriptions.values_mut() {
            inscription.block_height.get_or_insert(height);
        }
        info!(height, "mined block");
        height
    }

    pub fn tip_height(&self) -> u64 {
        self.state.read().tip_height
    }

    /// Txids of every successful broadcast, in order.
    pub fn broadcasts(&self) -> Vec<String> {
        self.state.read().broadcasts.clone()
    }

    fn address_of(&self, script: &Script) -> Option<String> {
        Address::from_script(script, self.network.to_bitcoin())
            .ok()
            .map(|a| a.to_string())
    }
}

#[async_trait]
impl OrdinalsProvider for MemoryOrdinalsProvider {
    async fn create_inscription(&self, request: CreateInscriptionRequest) -> BtcoResult<Inscription> {
        let address = match &request.destination {
            Some(destination) => Some(validate_address(destination, self.network)?.to_string()),
            None => None,
        };
        let mut state = self.state.write();
        let txid = state.synthetic_txid(&request.content.body).to_string();
        let height = state.tip_height;
        let inscription = Inscription {
            inscription_id: format!("{txid}i0"),
            satoshi: request.satoshi,
            content: request.content.body,
            content_type: request.content.content_type,
            txid: txid.clone(),
            vout: 0,
            block_height: Some(height),
            address,
        };
        state.transactions.insert(txid, Some(height));
        state.index(inscription.clone());
        info!(inscription_id = %inscription.inscription_id, satoshi = request.satoshi, "inscription created");
        Ok(inscription)
    }

    async fn get_inscription_by_id(&self, inscription_id: &str) -> BtcoResult<Option<Inscription>> {
        Ok(self.state.read().inscriptions.get(inscription_id).cloned())
    }

    async fn transfer_inscription(&self, inscription_id: &str, to_address: &str) -> BtcoResult<String> {
        let to = validate_address(to_address, self.network)?.to_string();
        let mut state = self.state.write();
        if !state.inscriptions.contains_key(inscription_id) {
            return Err(BtcoError::InscriptionNotFound(inscription_id.to_string()));
        }
        let txid = state.synthetic_txid(inscription_id.as_bytes()).to_string();
        state.transactions.insert(txid.clone(), None);
        if let Some(inscription) = state.inscriptions.get_mut(inscription_id) {
            inscription.address = Some(to.clone());
        }
        info!(inscription_id, to = %to, %txid, "inscription transferred");
        Ok(txid)
    }

    async fn get_inscriptions_by_satoshi(&self, satoshi: u64) -> BtcoResult<Vec<Inscription>> {
        let state = self.state.read();
        Ok(state
            .by_satoshi
            .get(&satoshi)
            .map(|ids| ids.iter().filter_map(|id| state.inscriptions.get(id).cloned()).collect())
            .unwrap_or_default())
    }

    async fn broadcast_transaction(&self, tx_hex: &str) -> BtcoResult<String> {
        if *self.fail_broadcasts.read() {
            return Err(BtcoError::Provider("broadcast rejected".into()));
        }
        let bytes = hex::decode(tx_hex.trim())
            .map_err(|e| BtcoError::Provider(format!("transaction is not hex: {e}")))?;
        let tx: Transaction = bitcoin::consensus::deserialize(&bytes)
            .map_err(|e| BtcoError::Provider(format!("malformed transaction: {e}")))?;
        let txid = tx.compute_txid();
        let txid_hex = txid.to_string();

        let mut state = self.state.write();
        if state.transactions.contains_key(&txid_hex) {
            return Ok(txid_hex);
        }
        state.transactions.insert(txid_hex.clone(), None);
        state.broadcasts.push(txid_hex.clone());

        // First sat of input 0 lands on output 0.
        let inherited = tx
            .input
            .first()
            .and_then(|input| state.sat_locations.get(&input.previous_output).copied());
        if let (Some(sat), false) = (inherited, tx.output.is_empty()) {
            state.sat_locations.insert(OutPoint::new(txid, 0), sat);
        }

        let envelopes = tx
            .input
            .iter()
            .filter_map(|input| {
                // Script-path spend: [..., script, control block].
                let len = input.witness.len();
                (len >= 2).then(|| input.witness.nth(len - 2)).flatten()
            })
            .filter_map(|script| parse_envelope(Script::from_bytes(script)));

        let owner = tx.output.first().and_then(|out| self.address_of(&out.script_pubkey));
        for (index, envelope) in envelopes.enumerate() {
            let Some(satoshi) = inherited else {
                warn!(%txid_hex, "inscription on an untracked sat, not indexed");
                break;
            };
            let content = envelope.into_content();
            let inscription = Inscription {
                inscription_id: format!("{txid_hex}i{index}"),
                satoshi,
                content: content.body,
                content_type: content.content_type,
                txid: txid_hex.clone(),
                vout: 0,
                block_height: None,
                address: owner.clone(),
            };
            info!(inscription_id = %inscription.inscription_id, satoshi, "indexed inscription");
            state.index(inscription);
        }

        debug!(%txid_hex, inputs = tx.input.len(), outputs = tx.output.len(), "broadcast accepted");
        Ok(txid_hex)
    }

    async fn get_transaction_status(&self, txid: &str) -> BtcoResult<TransactionStatus> {
        let state = self.state.read();
        let confirmed_at = state
            .transactions
            .get(txid)
            .ok_or_else(|| BtcoError::Provider(format!("unknown transaction {txid}")))?;
        let confirmations = confirmed_at
            .map(|height| (state.tip_height.saturating_sub(height) + 1) as u32)
            .unwrap_or(0);
        Ok(TransactionStatus {
            txid: txid.to_string(),
            confirmed: confirmed_at.is_some(),
            block_height: *confirmed_at,
            confirmations,
        })
    }

    async fn estimate_fee(&self, _target_blocks: u32) -> BtcoResult<u64> {
        Ok(*self.fee_rate.read())
    }
}
