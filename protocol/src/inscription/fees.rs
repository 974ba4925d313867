//! # Fees, Dust and UTXO Selection
//!
//! Fee = virtual size x fee rate. The reveal's virtual size is measured on a
//! dummy-signed transaction (see [`super::taproot`]); the commit's is
//! estimated from its input and output script types before it is signed.
//!
//! ## Dust
//!
//! No output we build may fall below [`DUST_LIMIT_SATS`]. Postage and commit
//! values are raised to the floor; a change output that would be dust is
//! dropped and its value goes to the fee instead.
//!
//! ## Overflow
//!
//! Fees saturate at `u64::MAX`; sums of sats are checked. A fee rate too
//! large to pay surfaces as `INSUFFICIENT_FUNDS` or `INVALID_INPUT`, never
//! as wrapped arithmetic.

use bitcoin::{OutPoint, ScriptBuf};
use serde::{Deserialize, Serialize};

use crate::config::DUST_LIMIT_SATS;
use crate::error::{BtcoError, BtcoResult};

/// Version, locktime, counts and the segwit marker, rounded up.
const TX_OVERHEAD_VBYTES: u64 = 11;
/// A P2TR output: 8-byte value, length byte, 34-byte script.
const P2TR_OUTPUT_VBYTES: u64 = 43;

/// A spendable output owned by the funding wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Utxo {
    pub outpoint: OutPoint,
    pub value: u64,
    pub script_pubkey: ScriptBuf,
}

impl Utxo {
    /// Estimated virtual size of spending this output.
    pub fn input_vbytes(&self) -> u64 {
        if self.script_pubkey.is_p2tr() {
            58
        } else if self.script_pubkey.is_p2wpkh() {
            68
        } else {
            148
        }
    }
}

/// Outcome of funding a target amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoSelection {
    pub selected: Vec<Utxo>,
    pub total_input: u64,
    /// Amount the funded output receives.
    pub target: u64,
    pub fee: u64,
    /// Value returned to the wallet, `0` when folded into the fee.
    pub change: u64,
}

impl UtxoSelection {
    pub fn has_change(&self) -> bool {
        self.change > 0
    }
}

/// Commit and reveal fees, in sats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub commit: u64,
    pub reveal: u64,
    pub total: u64,
}

impl FeeBreakdown {
    pub fn new(commit: u64, reveal: u64) -> BtcoResult<Self> {
        Ok(Self {
            commit,
            reveal,
            total: checked_sats(commit, reveal, "total fee")?,
        })
    }
}

/// `a + b` sats, or `INVALID_INPUT` naming `what` on overflow.
pub fn checked_sats(a: u64, b: u64, what: &str) -> BtcoResult<u64> {
    a.checked_add(b)
        .ok_or_else(|| BtcoError::InvalidInput(format!("{what} overflows: {a} + {b} sats")))
}

/// Fee for a transaction of `vsize` virtual bytes.
pub fn fee_for_vsize(vsize: u64, fee_rate: u64) -> u64 {
    vsize.saturating_mul(fee_rate)
}

/// Raise `value` to the dust floor if it falls below it.
pub fn clamp_to_dust(value: u64) -> u64 {
    value.max(DUST_LIMIT_SATS)
}

pub fn is_dust(value: u64) -> bool {
    value < DUST_LIMIT_SATS
}

/// Estimated virtual size of a commit spending `inputs` with `outputs`
/// P2TR outputs.
pub fn estimate_commit_vsize(inputs: &[Utxo], outputs: u64) -> u64 {
    TX_OVERHEAD_VBYTES
        + inputs.iter().map(Utxo::input_vbytes).sum::<u64>()
        + outputs * P2TR_OUTPUT_VBYTES
}

/// Fund `target` sats, largest UTXOs first.
///
/// The commit has one funded output plus change. Change is only created
/// when it clears the dust floor; otherwise it is left to the miner.
pub fn select_utxos(utxos: &[Utxo], target: u64, fee_rate: u64) -> BtcoResult<UtxoSelection> {
    if fee_rate == 0 {
        return Err(BtcoError::InvalidInput("fee rate must be positive".into()));
    }
    let target = clamp_to_dust(target);

    let mut candidates: Vec<&Utxo> = utxos.iter().collect();
    candidates.sort_by(|a, b| b.value.cmp(&a.value));

    let mut selected: Vec<Utxo> = Vec::new();
    let mut total_input = 0u64;

    for utxo in candidates {
        selected.push(utxo.clone());
        total_input = checked_sats(total_input, utxo.value, "total input")?;

        let fee_with_change = fee_for_vsize(estimate_commit_vsize(&selected, 2), fee_rate);
        let change = target
            .checked_add(fee_with_change)
            .and_then(|needed| total_input.checked_sub(needed));
        if let Some(change) = change {
            if !is_dust(change) {
                return Ok(UtxoSelection {
                    selected,
                    total_input,
                    target,
                    fee: fee_with_change,
                    change,
                });
            }
        }

        let fee_without_change = fee_for_vsize(estimate_commit_vsize(&selected, 1), fee_rate);
        if target
            .checked_add(fee_without_change)
            .is_some_and(|needed| total_input >= needed)
        {
            return Ok(UtxoSelection {
                fee: total_input - target,
                selected,
                total_input,
                target,
                change: 0,
            });
        }
    }

    let inputs_for_estimate = if selected.is_empty() { 1 } else { selected.len() as u64 };
    let minimum_fee = fee_for_vsize(
        TX_OVERHEAD_VBYTES + inputs_for_estimate * 58 + P2TR_OUTPUT_VBYTES,
        fee_rate,
    );
    // A requirement past u64::MAX is reported as u64::MAX.
    Err(BtcoError::InsufficientFunds {
        required: target.saturating_add(minimum_fee),
        available: total_input,
    })
}
