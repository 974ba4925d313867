//! # Taproot Inscription Builder
//!
//! Commit/reveal in three pieces:
//!
//! 1. **Commitment** -- a fresh x-only internal key plus the reveal script
//!    as the single tapscript leaf. The tweaked output key gives the commit
//!    address (`bc1p...` / `tb1p...`).
//! 2. **Commit transaction** -- pays `reveal fee + postage` to the commit
//!    address from the funding wallet, with change back to the wallet.
//! 3. **Reveal transaction** -- spends the commit output through the script
//!    path, signed with the internal key, and sends the postage to the
//!    destination. The inscription lands on the first sat of that output.
//!
//! ```text
//!  wallet UTXOs ──> [commit tx] ──(reveal fee + postage)──> P2TR(internal key, leaf)
//!                                                                  │
//!                                      [reveal tx] <── script path ┘
//!                                           │
//!                                           └──(postage)──> destination
//! ```
//!
//! Because every commit input is segwit, the commit txid is fixed before it
//! is signed, so a reveal can be prepared against an unsigned commit.

use bitcoin::absolute::LockTime;
use bitcoin::hashes::Hash;
use bitcoin::secp256k1::{Keypair, Message, Secp256k1, XOnlyPublicKey};
use bitcoin::sighash::{Prevouts, SighashCache, TapSighashType};
use bitcoin::taproot::{ControlBlock, LeafVersion, TapLeafHash, TaprootBuilder, TaprootSpendInfo};
use bitcoin::transaction::Version;
use bitcoin::{Address, Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::address::validate_address;
use super::fees::{checked_sats, clamp_to_dust, fee_for_vsize, select_utxos, FeeBreakdown, Utxo, UtxoSelection};
use super::script::build_reveal_script;
use crate::config::{Network, ProtocolConfig, DEFAULT_POSTAGE_SATS};
use crate::content::InscriptionContent;
use crate::error::{BtcoError, BtcoResult};

/// Schnorr signature size under the default sighash type.
const SCHNORR_SIGNATURE_SIZE: usize = 64;

// ---------------------------------------------------------------------------
// Commitment
// ---------------------------------------------------------------------------

/// The Taproot output that commits to one inscription.
///
/// Holds the ephemeral internal key until the reveal is signed; the secret
/// is erased when the commitment is dropped.
pub struct InscriptionCommitment {
    keypair: Keypair,
    content: InscriptionContent,
    reveal_script: ScriptBuf,
    spend_info: TaprootSpendInfo,
    control_block: ControlBlock,
    address: Address,
}

impl InscriptionCommitment {
    /// Commit to `content` under a freshly generated internal key.
    pub fn new(content: InscriptionContent, network: Network) -> BtcoResult<Self> {
        let secp = Secp256k1::new();
        let keypair = Keypair::new(&secp, &mut bitcoin::secp256k1::rand::thread_rng());
        Self::with_keypair(content, keypair, network)
    }

    /// Commit to `content` under a caller-supplied internal key.
    pub fn with_keypair(content: InscriptionContent, keypair: Keypair, network: Network) -> BtcoResult<Self> {
        let secp = Secp256k1::new();
        let (internal_key, _) = keypair.x_only_public_key();
        let reveal_script = build_reveal_script(&internal_key, &content)?;

        let spend_info = TaprootBuilder::new()
            .add_leaf(0, reveal_script.clone())
            .map_err(|e| BtcoError::Transaction(format!("taproot leaf: {e}")))?
            .finalize(&secp, internal_key)
            .map_err(|_| BtcoError::Transaction("taproot tree could not be finalized".into()))?;
        let control_block = spend_info
            .control_block(&(reveal_script.clone(), LeafVersion::TapScript))
            .ok_or_else(|| BtcoError::Transaction("reveal leaf missing from taproot tree".into()))?;
        let address = Address::p2tr_tweaked(spend_info.output_key(), network.to_bitcoin());

        debug!(%address, script_len = reveal_script.len(), "inscription commitment built");
        Ok(Self {
            keypair,
            content,
            reveal_script,
            spend_info,
            control_block,
            address,
        })
    }

    pub fn content(&self) -> &InscriptionContent {
        &self.content
    }

    pub fn internal_key(&self) -> XOnlyPublicKey {
        self.keypair.x_only_public_key().0
    }

    /// The tweaked key that appears on chain.
    pub fn output_key(&self) -> XOnlyPublicKey {
        self.spend_info.output_key().to_inner()
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn script_pubkey(&self) -> ScriptBuf {
        self.address.script_pubkey()
    }

    pub fn reveal_script(&self) -> &ScriptBuf {
        &self.reveal_script
    }

    pub fn control_block(&self) -> &ControlBlock {
        &self.control_block
    }

    fn witness(&self, signature: &[u8]) -> Witness {
        let mut witness = Witness::new();
        witness.push(signature);
        witness.push(self.reveal_script.as_bytes());
        witness.push(self.control_block.serialize());
        witness
    }

    /// Virtual size of the signed reveal paying to `destination`.
    pub fn reveal_vsize(&self, destination: &ScriptBuf) -> u64 {
        let mut tx = unsigned_reveal(OutPoint::null(), destination.clone(), 0);
        tx.input[0].witness = self.witness(&[0u8; SCHNORR_SIGNATURE_SIZE]);
        tx.vsize() as u64
    }

    pub fn reveal_fee(&self, destination: &ScriptBuf, fee_rate: u64) -> u64 {
        fee_for_vsize(self.reveal_vsize(destination), fee_rate)
    }

    /// Build and sign the reveal spending `commit_outpoint`.
    ///
    /// The reveal fee is whatever the commit output carries above `postage`.
    pub fn build_reveal(
        &self,
        commit_outpoint: OutPoint,
        commit_output: &TxOut,
        destination: ScriptBuf,
        postage: u64,
    ) -> BtcoResult<Transaction> {
        if commit_output.script_pubkey != self.script_pubkey() {
            return Err(BtcoError::Transaction(
                "commit output does not pay to this inscription's address".into(),
            ));
        }
        let postage = clamp_to_dust(postage);
        if commit_output.value.to_sat() < postage {
            return Err(BtcoError::InsufficientFunds {
                required: postage,
                available: commit_output.value.to_sat(),
            });
        }

        let mut tx = unsigned_reveal(commit_outpoint, destination, postage);
        let leaf_hash = TapLeafHash::from_script(&self.reveal_script, LeafVersion::TapScript);
        let prevouts = [commit_output.clone()];
        let sighash = SighashCache::new(&tx)
            .taproot_script_spend_signature_hash(
                0,
                &Prevouts::All(&prevouts),
                leaf_hash,
                TapSighashType::Default,
            )
            .map_err(|e| BtcoError::Transaction(format!("reveal sighash: {e}")))?;

        let secp = Secp256k1::new();
        let message = Message::from_digest(sighash.to_byte_array());
        let signature = secp.sign_schnorr(&message, &self.keypair);
        tx.input[0].witness = self.witness(&signature.serialize());
        Ok(tx)
    }
}

impl Drop for InscriptionCommitment {
    fn drop(&mut self) {
        self.keypair.non_secure_erase();
    }
}

impl std::fmt::Debug for InscriptionCommitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InscriptionCommitment")
            .field("address", &self.address.to_string())
            .field("internal_key", &self.internal_key().to_string())
            .field("content_type", &self.content.content_type)
            .finish_non_exhaustive()
    }
}

fn unsigned_reveal(commit_outpoint: OutPoint, destination: ScriptBuf, postage: u64) -> Transaction {
    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: commit_outpoint,
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(postage),
            script_pubkey: destination,
        }],
    }
}

/// Unsigned commit: the funded output at index 0, then change if any.
pub fn build_commit_tx(
    selection: &UtxoSelection,
    commit_script: ScriptBuf,
    change_script: &ScriptBuf,
) -> Transaction {
    let input = selection
        .selected
        .iter()
        .map(|utxo| TxIn {
            previous_output: utxo.outpoint,
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::new(),
        })
        .collect();

    let mut output = vec![TxOut {
        value: Amount::from_sat(selection.target),
        script_pubkey: commit_script,
    }];
    if selection.has_change() {
        output.push(TxOut {
            value: Amount::from_sat(selection.change),
            script_pubkey: change_script.clone(),
        });
    }

    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input,
        output,
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Everything needed to put one inscription on chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRevealPair {
    /// Hex x-only internal key.
    pub internal_key: String,
    /// Hex x-only tweaked output key.
    pub output_key: String,
    pub taproot_address: String,
    pub commit_tx: Transaction,
    pub reveal_tx: Transaction,
    pub fees: FeeBreakdown,
}

/// Commit address and costs for an inscription, before any funding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InscriptionPreview {
    pub commit_address: String,
    pub internal_key: String,
    pub output_key: String,
    pub reveal_script: ScriptBuf,
    pub reveal_vsize: u64,
    pub reveal_fee: u64,
    pub postage: u64,
    /// Value the commit output must carry.
    pub commit_amount: u64,
}

/// Builds commitments, previews and full commit/reveal pairs.
#[derive(Debug, Clone)]
pub struct InscriptionBuilder {
    network: Network,
    postage: u64,
}

impl InscriptionBuilder {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            postage: DEFAULT_POSTAGE_SATS,
        }
    }

    pub fn from_config(config: &ProtocolConfig) -> Self {
        Self::new(config.network).with_postage(config.postage_sats)
    }

    /// Set the inscribed output's value. Sub-dust values are raised.
    pub fn with_postage(mut self, postage: u64) -> Self {
        self.postage = clamp_to_dust(postage);
        self
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn postage(&self) -> u64 {
        self.postage
    }

    pub fn commit(&self, content: InscriptionContent) -> BtcoResult<InscriptionCommitment> {
        InscriptionCommitment::new(content, self.network)
    }

    /// Commit amount the reveal needs: its own fee plus postage. Fails with
    /// `INVALID_INPUT` when `fee_rate` pushes it past `u64::MAX`.
    pub fn commit_amount(
        &self,
        commitment: &InscriptionCommitment,
        destination: &ScriptBuf,
        fee_rate: u64,
    ) -> BtcoResult<u64> {
        let reveal_fee = commitment.reveal_fee(destination, fee_rate);
        Ok(clamp_to_dust(checked_sats(reveal_fee, self.postage, "commit amount")?))
    }

    /// Address and costs for `content`, assuming a Taproot destination.
    pub fn preview(&self, content: InscriptionContent, fee_rate: u64) -> BtcoResult<InscriptionPreview> {
        let commitment = self.commit(content)?;
        let destination = commitment.script_pubkey();
        let reveal_vsize = commitment.reveal_vsize(&destination);
        let reveal_fee = fee_for_vsize(reveal_vsize, fee_rate);
        Ok(InscriptionPreview {
            commit_address: commitment.address().to_string(),
            internal_key: commitment.internal_key().to_string(),
            output_key: commitment.output_key().to_string(),
            reveal_script: commitment.reveal_script().clone(),
            reveal_vsize,
            reveal_fee,
            postage: self.postage,
            commit_amount: self.commit_amount(&commitment, &destination, fee_rate)?,
        })
    }

    /// Fund, build and sign the reveal for `content` in one go.
    ///
    /// The commit comes back unsigned: it spends wallet UTXOs and is signed
    /// by a [`CommitSigner`](super::signer::CommitSigner).
    pub fn build_pair(
        &self,
        content: InscriptionContent,
        utxos: &[Utxo],
        destination: &str,
        change_script: &ScriptBuf,
        fee_rate: u64,
    ) -> BtcoResult<(CommitRevealPair, InscriptionCommitment)> {
        let destination = validate_address(destination, self.network)?.script_pubkey();
        let commitment = self.commit(content)?;
        let reveal_fee = commitment.reveal_fee(&destination, fee_rate);
        let commit_amount = self.commit_amount(&commitment, &destination, fee_rate)?;

        let selection = select_utxos(utxos, commit_amount, fee_rate)?;
        let commit_tx = build_commit_tx(&selection, commitment.script_pubkey(), change_script);
        let commit_outpoint = OutPoint::new(commit_tx.compute_txid(), 0);
        let reveal_tx = commitment.build_reveal(
            commit_outpoint,
            &commit_tx.output[0],
            destination,
            self.postage,
        )?;

        let pair = CommitRevealPair {
            internal_key: commitment.internal_key().to_string(),
            output_key: commitment.output_key().to_string(),
            taproot_address: commitment.address().to_string(),
            commit_tx,
            reveal_tx,
            fees: FeeBreakdown::new(selection.fee, reveal_fee)?,
        };
        Ok((pair, commitment))
    }
}

/// Preview an inscription of `content` on `network` at `fee_rate` sat/vB.
pub fn create_inscription(
    content: InscriptionContent,
    network: Network,
    fee_rate: u64,
) -> BtcoResult<InscriptionPreview> {
    InscriptionBuilder::new(network).preview(content, fee_rate)
}
