//! # Inscription Orchestrator
//!
//! Drives one inscription through the commit/reveal protocol as an explicit
//! state machine. Each successful step emits an [`InscriptionEvent`] on an
//! unbounded channel handed out at construction.
//!
//! ```text
//!  Idle ──prepare_content──> ContentPrepared ──select_utxos──> UtxoSelected
//!                                                                  │
//!      ┌──────────────────────calculate_fees───────────────────────┘
//!      v
//!  FeesCalculated ──send_commit──> CommitSent ──send_reveal──> RevealSent
//!                                                                  │
//!                                       check_confirmation ────────┴──> Confirmed
//!
//!  any step ──error──> Failed            reset() ──> Idle
//! ```
//!
//! Calling a step out of order fails with `INVALID_STATE` and leaves the
//! state untouched, as does a missing provider (`ORD_PROVIDER_REQUIRED`).
//! Any other error moves the flow to `Failed` and emits an `error` event.
//!
//! The reveal is only ever built after the provider has accepted the commit
//! and handed back its txid.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use bitcoin::consensus::encode::serialize_hex;
use bitcoin::{OutPoint, ScriptBuf, Transaction, TxOut, Txid};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::address::validate_address;
use super::fees::{select_utxos, FeeBreakdown, Utxo, UtxoSelection};
use super::signer::CommitSigner;
use super::status::{TransactionKind, TransactionState, TransactionStatusTracker};
use super::taproot::{build_commit_tx, CommitRevealPair, InscriptionBuilder, InscriptionCommitment};
use crate::config::{ProtocolConfig, DEFAULT_CONFIRMATION_TARGET};
use crate::content::pipeline::{prepare_content, validate_content_with_limit, ContentInput, InscriptionContent};
use crate::error::{BtcoError, BtcoResult};
use crate::provider::OrdinalsProvider;

// ---------------------------------------------------------------------------
// States & Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InscriptionState {
    Idle,
    ContentPrepared,
    UtxoSelected,
    FeesCalculated,
    CommitSent,
    RevealSent,
    Confirmed,
    Failed,
}

impl fmt::Display for InscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InscriptionState::Idle => "idle",
            InscriptionState::ContentPrepared => "content-prepared",
            InscriptionState::UtxoSelected => "utxo-selected",
            InscriptionState::FeesCalculated => "fees-calculated",
            InscriptionState::CommitSent => "commit-sent",
            InscriptionState::RevealSent => "reveal-sent",
            InscriptionState::Confirmed => "confirmed",
            InscriptionState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Emitted once per successful transition, or on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InscriptionEvent {
    #[serde(rename_all = "camelCase")]
    ContentPrepared {
        content_type: String,
        size: usize,
        commit_address: String,
    },
    #[serde(rename_all = "camelCase")]
    UtxoSelected {
        count: usize,
        total_input: u64,
        fee_rate: u64,
    },
    #[serde(rename_all = "camelCase")]
    FeesCalculated {
        fees: FeeBreakdown,
        commit_amount: u64,
    },
    CommitTransactionSent {
        txid: String,
    },
    #[serde(rename_all = "camelCase")]
    RevealTransactionSent {
        txid: String,
        inscription_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Confirmed {
        inscription_id: String,
        block_height: Option<u64>,
    },
    Error {
        code: String,
        message: String,
    },
}

/// Content plus where the inscribed output should go.
#[derive(Debug, Clone, PartialEq)]
pub struct InscriptionRequest {
    pub content: ContentInput,
    pub content_type: String,
    pub metadata: Option<Value>,
    pub pointer: Option<u64>,
    /// Receiving address for the inscription.
    pub destination: String,
}

impl InscriptionRequest {
    pub fn new(content: impl Into<ContentInput>, content_type: &str, destination: &str) -> Self {
        Self {
            content: content.into(),
            content_type: content_type.to_string(),
            metadata: None,
            pointer: None,
            destination: destination.to_string(),
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Per-flow progress. Cleared by `reset`.
#[derive(Default)]
struct Flow {
    commitment: Option<InscriptionCommitment>,
    destination: Option<ScriptBuf>,
    fee_rate: Option<u64>,
    selection: Option<UtxoSelection>,
    commit_tx: Option<Transaction>,
    fees: Option<FeeBreakdown>,
    commit_txid: Option<Txid>,
    reveal_tx: Option<Transaction>,
    inscription_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct InscriptionOrchestrator {
    config: ProtocolConfig,
    builder: InscriptionBuilder,
    provider: Option<Arc<dyn OrdinalsProvider>>,
    tracker: Arc<TransactionStatusTracker>,
    events: mpsc::UnboundedSender<InscriptionEvent>,
    state: InscriptionState,
    flow: Flow,
}

impl InscriptionOrchestrator {
    /// A new orchestrator in `Idle`, and the receiving end of its events.
    pub fn new(
        config: ProtocolConfig,
        provider: Option<Arc<dyn OrdinalsProvider>>,
    ) -> (Self, mpsc::UnboundedReceiver<InscriptionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let orchestrator = Self {
            builder: InscriptionBuilder::from_config(&config),
            config,
            provider,
            tracker: Arc::new(TransactionStatusTracker::default()),
            events,
            state: InscriptionState::Idle,
            flow: Flow::default(),
        };
        (orchestrator, rx)
    }

    /// Share a status tracker with other orchestrators.
    pub fn with_tracker(mut self, tracker: Arc<TransactionStatusTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn state(&self) -> InscriptionState {
        self.state
    }

    pub fn tracker(&self) -> &Arc<TransactionStatusTracker> {
        &self.tracker
    }

    pub fn content(&self) -> Option<&InscriptionContent> {
        self.flow.commitment.as_ref().map(InscriptionCommitment::content)
    }

    pub fn commit_address(&self) -> Option<String> {
        self.flow.commitment.as_ref().map(|c| c.address().to_string())
    }

    pub fn fees(&self) -> Option<FeeBreakdown> {
        self.flow.fees
    }

    pub fn inscription_id(&self) -> Option<&str> {
        self.flow.inscription_id.as_deref()
    }

    /// The full commit/reveal pair, once the reveal has been built.
    pub fn commit_reveal_pair(&self) -> Option<CommitRevealPair> {
        let commitment = self.flow.commitment.as_ref()?;
        Some(CommitRevealPair {
            internal_key: commitment.internal_key().to_string(),
            output_key: commitment.output_key().to_string(),
            taproot_address: commitment.address().to_string(),
            commit_tx: self.flow.commit_tx.clone()?,
            reveal_tx: self.flow.reveal_tx.clone()?,
            fees: self.flow.fees?,
        })
    }

    /// Back to `Idle`, dropping all progress (and the ephemeral key).
    pub fn reset(&mut self) {
        debug!(from = %self.state, "orchestrator reset");
        self.flow = Flow::default();
        self.state = InscriptionState::Idle;
    }

    // -- steps --------------------------------------------------------------

    /// `Idle -> ContentPrepared`. Returns the commit address.
    pub fn prepare_content(&mut self, request: InscriptionRequest) -> BtcoResult<String> {
        self.require_state(InscriptionState::Idle, "prepare content")?;
        let result = self.try_prepare_content(request);
        self.settle(result)
    }

    fn try_prepare_content(&mut self, request: InscriptionRequest) -> BtcoResult<String> {
        let destination = validate_address(&request.destination, self.config.network)?;
        validate_content_with_limit(
            request.content.as_bytes(),
            &request.content_type,
            self.config.max_content_size,
        )?;
        let content = prepare_content(
            request.content,
            &request.content_type,
            request.metadata,
            request.pointer,
        )?;
        let commitment = self.builder.commit(content)?;
        let commit_address = commitment.address().to_string();

        self.emit(InscriptionEvent::ContentPrepared {
            content_type: commitment.content().content_type.clone(),
            size: commitment.content().size(),
            commit_address: commit_address.clone(),
        });
        self.flow.destination = Some(destination.script_pubkey());
        self.flow.commitment = Some(commitment);
        self.advance(InscriptionState::ContentPrepared);
        Ok(commit_address)
    }

    /// `ContentPrepared -> UtxoSelected`.
    ///
    /// Without an explicit `fee_rate` the provider's estimate is used, and
    /// failing that the configured default.
    pub async fn select_utxos(&mut self, utxos: &[Utxo], fee_rate: Option<u64>) -> BtcoResult<UtxoSelection> {
        self.require_state(InscriptionState::ContentPrepared, "select utxos")?;
        let result = self.try_select_utxos(utxos, fee_rate).await;
        self.settle(result)
    }

    async fn try_select_utxos(&mut self, utxos: &[Utxo], fee_rate: Option<u64>) -> BtcoResult<UtxoSelection> {
        let fee_rate = match (fee_rate, &self.provider) {
            (Some(rate), _) => rate,
            (None, Some(provider)) => provider.estimate_fee(DEFAULT_CONFIRMATION_TARGET).await?,
            (None, None) => self.config.default_fee_rate,
        };
        let (commitment, destination) = self.commitment_and_destination()?;
        let commit_amount = self.builder.commit_amount(commitment, destination, fee_rate)?;
        let selection = select_utxos(utxos, commit_amount, fee_rate)?;

        self.emit(InscriptionEvent::UtxoSelected {
            count: selection.selected.len(),
            total_input: selection.total_input,
            fee_rate,
        });
        self.flow.fee_rate = Some(fee_rate);
        self.flow.selection = Some(selection.clone());
        self.advance(InscriptionState::UtxoSelected);
        Ok(selection)
    }

    /// `UtxoSelected -> FeesCalculated`. Builds the unsigned commit, with
    /// change returning to the largest selected UTXO's script.
    pub fn calculate_fees(&mut self) -> BtcoResult<FeeBreakdown> {
        self.require_state(InscriptionState::UtxoSelected, "calculate fees")?;
        let result = self.try_calculate_fees();
        self.settle(result)
    }

    fn try_calculate_fees(&mut self) -> BtcoResult<FeeBreakdown> {
        let (commitment, destination) = self.commitment_and_destination()?;
        let selection = self.flow.selection.as_ref().ok_or_else(missing("utxo selection"))?;
        let fee_rate = self.flow.fee_rate.ok_or_else(missing("fee rate"))?;
        let change_script = selection
            .selected
            .first()
            .map(|u| u.script_pubkey.clone())
            .ok_or_else(missing("selected utxo"))?;

        let commit_tx = build_commit_tx(selection, commitment.script_pubkey(), &change_script);
        let fees = FeeBreakdown::new(selection.fee, commitment.reveal_fee(destination, fee_rate))?;
        let commit_amount = selection.target;

        self.emit(InscriptionEvent::FeesCalculated { fees, commit_amount });
        self.flow.commit_tx = Some(commit_tx);
        self.flow.fees = Some(fees);
        self.advance(InscriptionState::FeesCalculated);
        Ok(fees)
    }

    /// `FeesCalculated -> CommitSent`. Signs and broadcasts the commit.
    pub async fn send_commit(&mut self, signer: &dyn CommitSigner) -> BtcoResult<String> {
        self.require_state(InscriptionState::FeesCalculated, "send commit")?;
        let provider = self.require_provider()?;
        let result = self.try_send_commit(signer, provider.as_ref()).await;
        self.settle(result)
    }

    async fn try_send_commit(&mut self, signer: &dyn CommitSigner, provider: &dyn OrdinalsProvider) -> BtcoResult<String> {
        let selection = self.flow.selection.as_ref().ok_or_else(missing("utxo selection"))?;
        let prevouts: Vec<TxOut> = selection
            .selected
            .iter()
            .map(|u| TxOut {
                value: bitcoin::Amount::from_sat(u.value),
                script_pubkey: u.script_pubkey.clone(),
            })
            .collect();
        let mut commit_tx = self.flow.commit_tx.clone().ok_or_else(missing("commit transaction"))?;
        signer.sign_commit(&mut commit_tx, &prevouts)?;

        let txid = self
            .broadcast(provider, &commit_tx, TransactionKind::Commit)
            .await?;
        let commit_txid = Txid::from_str(&txid)
            .map_err(|e| BtcoError::Provider(format!("provider returned a bad txid: {e}")))?;

        self.emit(InscriptionEvent::CommitTransactionSent { txid: txid.clone() });
        self.flow.commit_tx = Some(commit_tx);
        self.flow.commit_txid = Some(commit_txid);
        self.advance(InscriptionState::CommitSent);
        Ok(txid)
    }

    /// `CommitSent -> RevealSent`. Returns the inscription id.
    pub async fn send_reveal(&mut self) -> BtcoResult<String> {
        self.require_state(InscriptionState::CommitSent, "send reveal")?;
        let provider = self.require_provider()?;
        let result = self.try_send_reveal(provider.as_ref()).await;
        self.settle(result)
    }

    async fn try_send_reveal(&mut self, provider: &dyn OrdinalsProvider) -> BtcoResult<String> {
        let (commitment, destination) = self.commitment_and_destination()?;
        let commit_txid = self.flow.commit_txid.ok_or_else(missing("commit txid"))?;
        let commit_tx = self.flow.commit_tx.as_ref().ok_or_else(missing("commit transaction"))?;
        let commit_output = commit_tx.output.first().ok_or_else(missing("commit output"))?;

        let reveal_tx = commitment.build_reveal(
            OutPoint::new(commit_txid, 0),
            commit_output,
            destination.clone(),
            self.builder.postage(),
        )?;
        let txid = self
            .broadcast(provider, &reveal_tx, TransactionKind::Reveal)
            .await?;
        let inscription_id = format!("{txid}i0");

        self.emit(InscriptionEvent::RevealTransactionSent {
            txid,
            inscription_id: inscription_id.clone(),
        });
        self.flow.reveal_tx = Some(reveal_tx);
        self.flow.inscription_id = Some(inscription_id.clone());
        self.advance(InscriptionState::RevealSent);
        Ok(inscription_id)
    }

    /// Poll the reveal. `RevealSent -> Confirmed` once it is mined.
    pub async fn check_confirmation(&mut self) -> BtcoResult<bool> {
        if self.state == InscriptionState::Confirmed {
            return Ok(true);
        }
        self.require_state(InscriptionState::RevealSent, "check confirmation")?;
        let provider = self.require_provider()?;
        let result = self.try_check_confirmation(provider.as_ref()).await;
        self.settle(result)
    }

    async fn try_check_confirmation(&mut self, provider: &dyn OrdinalsProvider) -> BtcoResult<bool> {
        let inscription_id = self.flow.inscription_id.clone().ok_or_else(missing("inscription id"))?;
        let reveal_txid = self
            .flow
            .reveal_tx
            .as_ref()
            .map(|tx| tx.compute_txid().to_string())
            .ok_or_else(missing("reveal transaction"))?;

        let status = provider.get_transaction_status(&reveal_txid).await?;
        for txid in [self.flow.commit_txid.map(|t| t.to_string()), Some(reveal_txid)]
            .into_iter()
            .flatten()
        {
            self.tracker.refresh(&txid, provider).await?;
        }
        if !status.confirmed {
            return Ok(false);
        }

        self.emit(InscriptionEvent::Confirmed {
            inscription_id,
            block_height: status.block_height,
        });
        self.advance(InscriptionState::Confirmed);
        Ok(true)
    }

    /// Run every step up to `RevealSent`. Returns the inscription id.
    pub async fn inscribe(
        &mut self,
        request: InscriptionRequest,
        utxos: &[Utxo],
        fee_rate: Option<u64>,
        signer: &dyn CommitSigner,
    ) -> BtcoResult<String> {
        self.prepare_content(request)?;
        self.select_utxos(utxos, fee_rate).await?;
        self.calculate_fees()?;
        self.send_commit(signer).await?;
        self.send_reveal().await
    }

    // -- plumbing -----------------------------------------------------------

    fn require_state(&self, expected: InscriptionState, operation: &str) -> BtcoResult<()> {
        if self.state != expected {
            return Err(BtcoError::InvalidState {
                current: self.state.to_string(),
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    fn require_provider(&self) -> BtcoResult<Arc<dyn OrdinalsProvider>> {
        self.provider.clone().ok_or(BtcoError::OrdProviderRequired)
    }

    fn commitment_and_destination(&self) -> BtcoResult<(&InscriptionCommitment, &ScriptBuf)> {
        let commitment = self.flow.commitment.as_ref().ok_or_else(missing("commitment"))?;
        let destination = self.flow.destination.as_ref().ok_or_else(missing("destination"))?;
        Ok((commitment, destination))
    }

    async fn broadcast(
        &self,
        provider: &dyn OrdinalsProvider,
        tx: &Transaction,
        kind: TransactionKind,
    ) -> BtcoResult<String> {
        let local_txid = tx.compute_txid().to_string();
        self.tracker.track(&local_txid, kind);
        self.tracker.transition(&local_txid, TransactionState::Broadcasting)?;
        match provider.broadcast_transaction(&serialize_hex(tx)).await {
            Ok(txid) => {
                if txid != local_txid {
                    warn!(%local_txid, provider_txid = %txid, "provider reported a different txid");
                    self.tracker.track(&txid, kind);
                    self.tracker.transition(&txid, TransactionState::Broadcasting)?;
                }
                self.tracker.transition(&txid, TransactionState::Confirming)?;
                info!(%txid, ?kind, "transaction broadcast");
                Ok(txid)
            }
            Err(err) => {
                self.tracker.mark_failed(&local_txid, err.to_string());
                Err(err)
            }
        }
    }

    fn advance(&mut self, next: InscriptionState) {
        info!(from = %self.state, to = %next, "inscription state change");
        self.state = next;
    }

    fn emit(&self, event: InscriptionEvent) {
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    /// Route a step's error: precondition errors pass through, anything
    /// else fails the flow.
    fn settle<T>(&mut self, result: BtcoResult<T>) -> BtcoResult<T> {
        if let Err(err) = &result {
            if !matches!(err, BtcoError::InvalidState { .. } | BtcoError::OrdProviderRequired) {
                warn!(state = %self.state, code = err.code(), error = %err, "inscription flow failed");
                self.emit(InscriptionEvent::Error {
                    code: err.code().to_string(),
                    message: err.to_string(),
                });
                self.state = InscriptionState::Failed;
            }
        }
        result
    }
}

impl fmt::Debug for InscriptionOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InscriptionOrchestrator")
            .field("state", &self.state)
            .field("network", &self.config.network)
            .field("has_provider", &self.provider.is_some())
            .finish_non_exhaustive()
    }
}

fn missing(what: &'static str) -> impl FnOnce() -> BtcoError {
    move || BtcoError::InvalidState {
        current: "incomplete flow".into(),
        operation: format!("use {what}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Network, DUST_LIMIT_SATS};
    use crate::inscription::signer::KeypairCommitSigner;
    use crate::provider::MemoryOrdinalsProvider;

    struct Harness {
        provider: Arc<MemoryOrdinalsProvider>,
        wallet: KeypairCommitSigner,
        orchestrator: InscriptionOrchestrator,
        events: mpsc::UnboundedReceiver<InscriptionEvent>,
    }

    fn harness() -> Harness {
        let network = Network::Testnet;
        let provider = Arc::new(MemoryOrdinalsProvider::new(network));
        let wallet = KeypairCommitSigner::generate(network);
        let (orchestrator, events) = InscriptionOrchestrator::new(
            ProtocolConfig::for_network(network),
            Some(provider.clone() as Arc<dyn OrdinalsProvider>),
        );
        Harness {
            provider,
            wallet,
            orchestrator,
            events,
        }
    }

    fn hello(wallet: &KeypairCommitSigner) -> InscriptionRequest {
        InscriptionRequest::new("hello", "text/plain", &wallet.address().to_string())
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<InscriptionEvent>) -> Vec<InscriptionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn overflowing_fee_rate_fails_the_flow() {
        let mut h = harness();
        let utxo = h.provider.fund(Some(5_000_000), 200_000, h.wallet.change_script());
        h.orchestrator.prepare_content(hello(&h.wallet)).unwrap();

        let err = h.orchestrator.select_utxos(&[utxo], Some(u64::MAX)).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
        assert_eq!(h.orchestrator.state(), InscriptionState::Failed);
        assert!(drain(&mut h.events)
            .iter()
            .any(|e| matches!(e, InscriptionEvent::Error { code, .. } if code == "INVALID_INPUT")));
    }

    #[tokio::test]
    async fn full_flow_emits_every_event_in_order() {
        let mut h = harness();
        let utxo = h.provider.fund(Some(5_000_000), 200_000, h.wallet.change_script());

        h.orchestrator.prepare_content(hello(&h.wallet)).unwrap();
        assert_eq!(h.orchestrator.state(), InscriptionState::ContentPrepared);
        h.orchestrator.select_utxos(&[utxo], Some(2)).await.unwrap();
        let fees = h.orchestrator.calculate_fees().unwrap();
        assert_eq!(fees.total, fees.commit + fees.reveal);
        h.orchestrator.send_commit(&h.wallet).await.unwrap();
        let inscription_id = h.orchestrator.send_reveal().await.unwrap();
        assert_eq!(h.orchestrator.state(), InscriptionState::RevealSent);

        assert!(!h.orchestrator.check_confirmation().await.unwrap());
        h.provider.mine_block();
        assert!(h.orchestrator.check_confirmation().await.unwrap());
        assert_eq!(h.orchestrator.state(), InscriptionState::Confirmed);

        let kinds: Vec<&'static str> = drain(&mut h.events)
            .iter()
            .map(|e| match e {
                InscriptionEvent::ContentPrepared { .. } => "contentPrepared",
                InscriptionEvent::UtxoSelected { .. } => "utxoSelected",
                InscriptionEvent::FeesCalculated { .. } => "feesCalculated",
                InscriptionEvent::CommitTransactionSent { .. } => "commitTransactionSent",
                InscriptionEvent::RevealTransactionSent { .. } => "revealTransactionSent",
                InscriptionEvent::Confirmed { .. } => "confirmed",
                InscriptionEvent::Error { .. } => "error",
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "contentPrepared",
                "utxoSelected",
                "feesCalculated",
                "commitTransactionSent",
                "revealTransactionSent",
                "confirmed"
            ]
        );

        let on_sat = h.provider.get_inscriptions_by_satoshi(5_000_000).await.unwrap();
        assert_eq!(on_sat[0].inscription_id, inscription_id);

        let pair = h.orchestrator.commit_reveal_pair().unwrap();
        assert_eq!(pair.commit_tx.output[0].value, pair.reveal_tx.output[0].value + bitcoin::Amount::from_sat(fees.reveal));
        assert!(pair
            .commit_tx
            .output
            .iter()
            .chain(&pair.reveal_tx.output)
            .all(|o| o.value.to_sat() >= DUST_LIMIT_SATS));
    }

    #[tokio::test]
    async fn out_of_order_calls_fail_without_changing_state() {
        let mut h = harness();
        let err = h.orchestrator.calculate_fees().unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
        assert!(h.orchestrator.send_reveal().await.is_err());
        assert_eq!(h.orchestrator.state(), InscriptionState::Idle);

        h.orchestrator.prepare_content(hello(&h.wallet)).unwrap();
        assert_eq!(
            h.orchestrator.prepare_content(hello(&h.wallet)).unwrap_err().code(),
            "INVALID_STATE"
        );
        assert_eq!(h.orchestrator.state(), InscriptionState::ContentPrepared);
        assert!(drain(&mut h.events).iter().all(|e| !matches!(e, InscriptionEvent::Error { .. })));
    }

    #[tokio::test]
    async fn missing_provider_is_reported() {
        let wallet = KeypairCommitSigner::generate(Network::Testnet);
        let (mut orchestrator, _rx) =
            InscriptionOrchestrator::new(ProtocolConfig::for_network(Network::Testnet), None);
        let utxo = Utxo {
            outpoint: OutPoint::null(),
            value: 100_000,
            script_pubkey: wallet.change_script(),
        };
        orchestrator.prepare_content(hello(&wallet)).unwrap();
        // Without a provider the configured default fee rate is used.
        orchestrator.select_utxos(&[utxo], None).await.unwrap();
        orchestrator.calculate_fees().unwrap();
        let err = orchestrator.send_commit(&wallet).await.unwrap_err();
        assert_eq!(err.code(), "ORD_PROVIDER_REQUIRED");
        assert_eq!(orchestrator.state(), InscriptionState::FeesCalculated);
    }

    #[tokio::test]
    async fn broadcast_failure_fails_flow_and_reset_recovers() {
        let mut h = harness();
        let utxo = h.provider.fund(None, 200_000, h.wallet.change_script());
        h.provider.set_fail_broadcasts(true);

        h.orchestrator.prepare_content(hello(&h.wallet)).unwrap();
        h.orchestrator.select_utxos(&[utxo.clone()], Some(1)).await.unwrap();
        h.orchestrator.calculate_fees().unwrap();
        let err = h.orchestrator.send_commit(&h.wallet).await.unwrap_err();
        assert_eq!(err.code(), "PROVIDER_ERROR");
        assert_eq!(h.orchestrator.state(), InscriptionState::Failed);
        assert!(matches!(drain(&mut h.events).last(), Some(InscriptionEvent::Error { .. })));

        let failed: Vec<_> = h
            .orchestrator
            .tracker()
            .list()
            .into_iter()
            .filter(|t| t.state == TransactionState::Failed)
            .collect();
        assert_eq!(failed.len(), 1);

        h.orchestrator.reset();
        assert_eq!(h.orchestrator.state(), InscriptionState::Idle);
        assert!(h.orchestrator.content().is_none());
        h.provider.set_fail_broadcasts(false);
        let id = h
            .orchestrator
            .inscribe(hello(&h.wallet), &[utxo], Some(1), &h.wallet)
            .await
            .unwrap();
        assert!(id.ends_with("i0"));
    }

    #[tokio::test]
    async fn invalid_inputs_fail_the_flow() {
        let mut h = harness();
        let bad_destination = InscriptionRequest::new("hello", "text/plain", "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4");
        assert_eq!(
            h.orchestrator.prepare_content(bad_destination).unwrap_err().code(),
            "INVALID_ADDRESS"
        );
        assert_eq!(h.orchestrator.state(), InscriptionState::Failed);

        h.orchestrator.reset();
        h.orchestrator.prepare_content(hello(&h.wallet)).unwrap();
        let err = h.orchestrator.select_utxos(&[], Some(1)).await.unwrap_err();
        assert_eq!(err.code(), "INSUFFICIENT_FUNDS");
    }

    #[test]
    fn events_serialize_with_camel_case_tags() {
        let event = InscriptionEvent::CommitTransactionSent { txid: "ab".into() };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "commitTransactionSent");
        assert_eq!(InscriptionState::FeesCalculated.to_string(), "fees-calculated");
    }
}
