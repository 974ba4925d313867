//! Crate-wide error taxonomy.
//!
//! Every public operation that can fail returns a [`BtcoError`]. Each variant
//! maps to a stable, SCREAMING_SNAKE_CASE code via [`BtcoError::code`] so
//! callers (and anything serializing errors over a wire) can branch on the
//! kind without string-matching messages.
//!
//! Two failure classes deliberately do *not* surface as `BtcoError`:
//! proof verification (returns `VerificationResult { verified: false, .. }`)
//! and resolution misses (returned as resolution metadata).

use thiserror::Error;

use crate::crypto::keys::KeyError;
use crate::crypto::multikey::MultikeyError;
use crate::keys::store::StoreError;

/// Errors produced by the protocol library.
#[derive(Debug, Error)]
pub enum BtcoError {
    /// Malformed request (empty document fields, unparsable DID, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Non-numeric or out-of-range satoshi identifier.
    #[error("invalid satoshi: {0}")]
    InvalidSatoshi(String),

    /// Destination address fails the network-specific format check.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Key material of the wrong type for the requested operation.
    #[error("invalid key type: {0}")]
    InvalidKeyType(String),

    /// Raw private key of an unsupported length.
    #[error("invalid private key length: expected {expected}, got {got} bytes")]
    InvalidPrivateKeyLength {
        /// Accepted lengths, human readable.
        expected: &'static str,
        /// Length actually supplied.
        got: usize,
    },

    /// An operation needing ledger access ran without a provider.
    #[error("an ordinals provider is required for this operation")]
    OrdProviderRequired,

    #[error("inscription not found: {0}")]
    InscriptionNotFound(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// More than one inscription claims the same satoshi.
    #[error("front-running detected: satoshi {satoshi} carries {count} inscriptions, cannot proceed")]
    FrontRunningDetected {
        satoshi: u64,
        count: usize,
    },

    /// An output below the network's minimum spendable value.
    #[error("output of {value} sats is below the dust limit of {limit} sats")]
    DustLimitViolation {
        value: u64,
        limit: u64,
    },

    #[error("verification failed: {0}")]
    VerificationFailed(String),

    #[error("content too large: {size} bytes exceeds the {max} byte limit")]
    ContentTooLarge {
        size: usize,
        max: usize,
    },

    #[error("invalid JSON content: {0}")]
    InvalidJson(String),

    /// The selected UTXOs cannot cover the required outputs plus fees.
    #[error("insufficient funds: required {required} sats, available {available} sats")]
    InsufficientFunds {
        required: u64,
        available: u64,
    },

    /// A state machine transition was requested out of order.
    #[error("invalid state: cannot {operation} while {current}")]
    InvalidState {
        /// The state we are currently in.
        current: String,
        /// The operation that was attempted.
        operation: String,
    },

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("storage error: {0}")]
    Storage(String),

    /// The ledger-indexing provider reported a failure.
    #[error("provider error: {0}")]
    Provider(String),

    /// A document loader failed or timed out dereferencing an IRI.
    #[error("document loader error: {0}")]
    Loader(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Shorthand used across the crate.
pub type BtcoResult<T> = Result<T, BtcoError>;

impl BtcoError {
    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            BtcoError::InvalidInput(_) => "INVALID_INPUT",
            BtcoError::InvalidSatoshi(_) => "INVALID_SATOSHI",
            BtcoError::InvalidAddress(_) => "INVALID_ADDRESS",
            BtcoError::InvalidKeyType(_) => "INVALID_KEY_TYPE",
            BtcoError::InvalidPrivateKeyLength { .. } => "INVALID_PRIVATE_KEY_LENGTH",
            BtcoError::OrdProviderRequired => "ORD_PROVIDER_REQUIRED",
            BtcoError::InscriptionNotFound(_) => "INSCRIPTION_NOT_FOUND",
            BtcoError::ResourceNotFound(_) => "RESOURCE_NOT_FOUND",
            BtcoError::FrontRunningDetected { .. } => "FRONT_RUNNING_DETECTED",
            BtcoError::DustLimitViolation { .. } => "DUST_LIMIT_VIOLATION",
            BtcoError::VerificationFailed(_) => "VERIFICATION_FAILED",
            BtcoError::ContentTooLarge { .. } => "CONTENT_TOO_LARGE",
            BtcoError::InvalidJson(_) => "INVALID_JSON",
            BtcoError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            BtcoError::InvalidState { .. } => "INVALID_STATE",
            BtcoError::KeyNotFound(_) => "KEY_NOT_FOUND",
            BtcoError::Storage(_) => "STORAGE_ERROR",
            BtcoError::Provider(_) => "PROVIDER_ERROR",
            BtcoError::Loader(_) => "LOADER_ERROR",
            BtcoError::Transaction(_) => "TRANSACTION_ERROR",
            BtcoError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

impl From<KeyError> for BtcoError {
    fn from(err: KeyError) -> Self {
        match err {
            KeyError::InvalidLength { expected, got } => {
                BtcoError::InvalidPrivateKeyLength { expected, got }
            }
            KeyError::WrongKeyType(msg) => BtcoError::InvalidKeyType(msg),
            other => BtcoError::InvalidInput(other.to_string()),
        }
    }
}

impl From<MultikeyError> for BtcoError {
    fn from(err: MultikeyError) -> Self {
        match err {
            MultikeyError::UnsupportedCodec(_) => BtcoError::InvalidKeyType(err.to_string()),
            other => BtcoError::InvalidInput(other.to_string()),
        }
    }
}

impl From<StoreError> for BtcoError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => BtcoError::KeyNotFound(id),
            StoreError::DuplicateAlias(alias) => {
                BtcoError::InvalidInput(format!("alias '{alias}' is already in use"))
            }
            other => BtcoError::Storage(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for BtcoError {
    fn from(err: serde_json::Error) -> Self {
        BtcoError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(BtcoError::OrdProviderRequired.code(), "ORD_PROVIDER_REQUIRED");
        assert_eq!(
            BtcoError::FrontRunningDetected { satoshi: 1, count: 2 }.code(),
            "FRONT_RUNNING_DETECTED"
        );
        assert_eq!(
            BtcoError::InvalidPrivateKeyLength { expected: "32", got: 16 }.code(),
            "INVALID_PRIVATE_KEY_LENGTH"
        );
    }

    #[test]
    fn front_running_message_mentions_refusal() {
        let err = BtcoError::FrontRunningDetected { satoshi: 42, count: 3 };
        assert!(err.to_string().contains("cannot proceed"));
    }

    #[test]
    fn key_errors_map_to_taxonomy() {
        let err: BtcoError = KeyError::InvalidLength { expected: "32", got: 31 }.into();
        assert_eq!(err.code(), "INVALID_PRIVATE_KEY_LENGTH");
        let err: BtcoError = KeyError::WrongKeyType("secp256k1".into()).into();
        assert_eq!(err.code(), "INVALID_KEY_TYPE");
    }

    #[test]
    fn store_not_found_maps_to_key_not_found() {
        let err: BtcoError = StoreError::NotFound("abc".into()).into();
        assert_eq!(err.code(), "KEY_NOT_FOUND");
    }
}
