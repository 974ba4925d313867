//! # Transaction Status Tracking
//!
//! Follows each broadcast transaction from submission to finality,
//! independently of whichever orchestrator submitted it.
//!
//! ```text
//! Pending ──> Broadcasting ──> Confirming ──> Completed
//!    │             │               │
//!    └─────────────┴───────────────┴────────> Failed
//! ```
//!
//! `Completed` and `Failed` are terminal: once a transaction reaches one,
//! its record is frozen. Transitions are serialized per txid (one DashMap
//! shard lock), never globally.

use std::fmt;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::DEFAULT_CONFIRMATION_TARGET;
use crate::error::{BtcoError, BtcoResult};
use crate::provider::OrdinalsProvider;

/// Lifecycle of a tracked transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionState {
    Pending,
    Broadcasting,
    Confirming,
    Completed,
    Failed,
}

impl TransactionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionState::Completed | TransactionState::Failed)
    }

    /// Whether moving from `self` to `next` is a legal step.
    pub fn can_transition_to(&self, next: TransactionState) -> bool {
        use TransactionState::*;
        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (_, Failed) => true,
            (Pending, Broadcasting) | (Broadcasting, Confirming) | (Confirming, Completed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionState::Pending => "pending",
            TransactionState::Broadcasting => "broadcasting",
            TransactionState::Confirming => "confirming",
            TransactionState::Completed => "completed",
            TransactionState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Role a transaction plays in the inscription flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Commit,
    Reveal,
    Transfer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedTransaction {
    pub txid: String,
    pub kind: TransactionKind,
    pub state: TransactionState,
    pub confirmations: u32,
    pub block_height: Option<u64>,
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Concurrent txid -> status map.
#[derive(Debug)]
pub struct TransactionStatusTracker {
    entries: DashMap<String, TrackedTransaction>,
    required_confirmations: u32,
}

impl Default for TransactionStatusTracker {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIRMATION_TARGET)
    }
}

impl TransactionStatusTracker {
    /// A tracker that calls a transaction completed after
    /// `required_confirmations` blocks.
    pub fn new(required_confirmations: u32) -> Self {
        Self {
            entries: DashMap::new(),
            required_confirmations: required_confirmations.max(1),
        }
    }

    /// Start tracking `txid` in `Pending`. Re-tracking a known txid is a
    /// no-op.
    pub fn track(&self, txid: &str, kind: TransactionKind) {
        self.entries.entry(txid.to_string()).or_insert_with(|| {
            debug!(txid, ?kind, "tracking transaction");
            TrackedTransaction {
                txid: txid.to_string(),
                kind,
                state: TransactionState::Pending,
                confirmations: 0,
                block_height: None,
                error: None,
                updated_at: Utc::now(),
            }
        });
    }

    pub fn get(&self, txid: &str) -> Option<TrackedTransaction> {
        self.entries.get(txid).map(|e| e.value().clone())
    }

    pub fn state(&self, txid: &str) -> Option<TransactionState> {
        self.entries.get(txid).map(|e| e.state)
    }

    pub fn list(&self) -> Vec<TrackedTransaction> {
        self.entries.iter().map(|e| e.value().clone()).collect()
    }

    /// Move `txid` to `next`, enforcing the state machine.
    pub fn transition(&self, txid: &str, next: TransactionState) -> BtcoResult<()> {
        let mut entry = self
            .entries
            .get_mut(txid)
            .ok_or_else(|| BtcoError::InvalidInput(format!("transaction {txid} is not tracked")))?;
        if !entry.state.can_transition_to(next) {
            return Err(BtcoError::InvalidState {
                current: entry.state.to_string(),
                operation: format!("move {txid} to {next}"),
            });
        }
        debug!(txid, from = %entry.state, to = %next, "transaction state change");
        entry.state = next;
        entry.updated_at = Utc::now();
        Ok(())
    }

    /// Mark `txid` failed with a reason. Ignored for terminal records.
    pub fn mark_failed(&self, txid: &str, reason: impl Into<String>) {
        if let Some(mut entry) = self.entries.get_mut(txid) {
            if entry.state.is_terminal() {
                return;
            }
            let reason = reason.into();
            warn!(txid, %reason, "transaction failed");
            entry.state = TransactionState::Failed;
            entry.error = Some(reason);
            entry.updated_at = Utc::now();
        }
    }

    /// Ask the provider about `txid` and advance its record.
    ///
    /// A `Confirming` record becomes `Completed` once it has the required
    /// confirmations. Returns the updated state.
    pub async fn refresh(&self, txid: &str, provider: &dyn OrdinalsProvider) -> BtcoResult<TransactionState> {
        let current = self
            .state(txid)
            .ok_or_else(|| BtcoError::InvalidInput(format!("transaction {txid} is not tracked")))?;
        if current.is_terminal() {
            return Ok(current);
        }

        let status = provider.get_transaction_status(txid).await?;
        let mut entry = self
            .entries
            .get_mut(txid)
            .ok_or_else(|| BtcoError::InvalidInput(format!("transaction {txid} is not tracked")))?;
        if entry.state.is_terminal() {
            return Ok(entry.state);
        }
        entry.confirmations = status.confirmations;
        entry.block_height = status.block_height;
        entry.updated_at = Utc::now();
        if entry.state == TransactionState::Confirming
            && status.confirmed
            && status.confirmations >= self.required_confirmations
        {
            info!(txid, confirmations = status.confirmations, "transaction completed");
            entry.state = TransactionState::Completed;
        }
        Ok(entry.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions() {
        let tracker = TransactionStatusTracker::new(1);
        tracker.track("aa", TransactionKind::Commit);
        assert_eq!(tracker.state("aa"), Some(TransactionState::Pending));
        tracker.transition("aa", TransactionState::Broadcasting).unwrap();
        tracker.transition("aa", TransactionState::Confirming).unwrap();
        tracker.transition("aa", TransactionState::Completed).unwrap();
        assert_eq!(tracker.state("aa"), Some(TransactionState::Completed));
    }

    #[test]
    fn skipping_states_is_rejected() {
        let tracker = TransactionStatusTracker::default();
        tracker.track("bb", TransactionKind::Reveal);
        let err = tracker.transition("bb", TransactionState::Completed).unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
    }

    #[test]
    fn terminal_states_are_frozen() {
        let tracker = TransactionStatusTracker::default();
        tracker.track("cc", TransactionKind::Commit);
        tracker.mark_failed("cc", "rejected by mempool");
        assert!(tracker.transition("cc", TransactionState::Broadcasting).is_err());

        // A later failure does not overwrite the first reason.
        tracker.mark_failed("cc", "something else");
        assert_eq!(tracker.get("cc").unwrap().error.as_deref(), Some("rejected by mempool"));
    }

    #[test]
    fn retracking_keeps_existing_state() {
        let tracker = TransactionStatusTracker::default();
        tracker.track("dd", TransactionKind::Commit);
        tracker.transition("dd", TransactionState::Broadcasting).unwrap();
        tracker.track("dd", TransactionKind::Commit);
        assert_eq!(tracker.state("dd"), Some(TransactionState::Broadcasting));
        assert_eq!(tracker.list().len(), 1);
    }

    #[test]
    fn unknown_txid_is_an_error() {
        let tracker = TransactionStatusTracker::default();
        assert!(tracker.transition("nope", TransactionState::Failed).is_err());
    }
}
