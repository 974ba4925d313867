//! # Protocol Configuration & Constants
//!
//! Every magic number in the protocol lives here: the DID method name, the
//! network prefixes, the dust floor, the content ceiling, the JSON-LD context
//! URIs. If you're hardcoding one of these somewhere else, move it here.
//!
//! Runtime-tunable knobs (fee rate, postage, cache TTL, loader timeout) live
//! in [`ProtocolConfig`], which deserializes from JSON and falls back to the
//! defaults below for any missing field.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BtcoError, BtcoResult};

// ---------------------------------------------------------------------------
// DID Method
// ---------------------------------------------------------------------------

/// The DID method name. Identifiers look like `did:btco:<satoshi>`.
pub const DID_METHOD: &str = "btco";

/// DID prefix segment for testnet identifiers (`did:btco:test:<sat>`).
pub const TESTNET_DID_PREFIX: &str = "test";

/// DID prefix segment for signet identifiers (`did:btco:sig:<sat>`).
pub const SIGNET_DID_PREFIX: &str = "sig";

/// Highest satoshi ordinal that will ever exist (21M BTC minus the sats lost
/// to the subsidy halving rounding).
pub const MAX_SATOSHI: u64 = 2_099_999_997_689_999;

/// Inscription body that marks a DID as permanently deactivated.
pub const BURN_MARKER: &str = "\u{1F525}";

// ---------------------------------------------------------------------------
// Ledger Parameters
// ---------------------------------------------------------------------------

/// Minimum spendable output value. Outputs below this are non-standard and
/// will not relay, so every output we build is clamped up to it.
pub const DUST_LIMIT_SATS: u64 = 546;

/// Value carried by the inscribed output of a reveal transaction.
pub const DEFAULT_POSTAGE_SATS: u64 = 10_000;

/// Fee rate used when no estimator is wired in, in sat/vB.
pub const DEFAULT_FEE_RATE_SAT_VB: u64 = 5;

/// Tapscript stack elements are capped at 520 bytes, so inscription bodies
/// are pushed in slices of at most this size.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;

/// Confirmation target passed to the fee estimator by default.
pub const DEFAULT_CONFIRMATION_TARGET: u32 = 6;

// ---------------------------------------------------------------------------
// Content Limits
// ---------------------------------------------------------------------------

/// Hard ceiling on inscription content: 350 KiB.
pub const MAX_CONTENT_SIZE_BYTES: usize = 350 * 1024;

/// Default chunk size when a payload must be split across inscriptions.
pub const DEFAULT_CHUNK_SIZE_BYTES: usize = 100 * 1024;

// ---------------------------------------------------------------------------
// JSON-LD Contexts
// ---------------------------------------------------------------------------

/// W3C DID Core v1 context. Always the first `@context` entry of a document.
pub const DID_CONTEXT_V1: &str = "https://www.w3.org/ns/did/v1";

/// Multikey verification method context.
pub const MULTIKEY_CONTEXT_V1: &str = "https://w3id.org/security/multikey/v1";

/// Data Integrity v2 context (defines `DataIntegrityProof`).
pub const DATA_INTEGRITY_CONTEXT_V2: &str = "https://w3id.org/security/data-integrity/v2";

/// W3C Verifiable Credentials core context.
pub const VC_CONTEXT_V1: &str = "https://www.w3.org/2018/credentials/v1";

/// Domain extension context for satoshi-anchored content credentials.
pub const BTCO_CONTEXT_V1: &str = "https://ordinals.plus/v1";

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// How long a document loader may take to dereference one IRI.
pub const DEFAULT_LOADER_TIMEOUT: Duration = Duration::from_secs(10);

/// How long a whole-document resolution stays cached.
pub const DEFAULT_RESOLVER_CACHE_TTL: Duration = Duration::from_secs(300);

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// The ledger network an identifier, key or transaction belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
    Signet,
}

impl Network {
    /// Segment inserted between the method and the satoshi in a DID.
    /// Mainnet identifiers carry no prefix.
    pub fn did_prefix(&self) -> Option<&'static str> {
        match self {
            Network::Mainnet => None,
            Network::Testnet => Some(TESTNET_DID_PREFIX),
            Network::Signet => Some(SIGNET_DID_PREFIX),
        }
    }

    /// Inverse of [`did_prefix`](Self::did_prefix).
    pub fn from_did_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            TESTNET_DID_PREFIX => Some(Network::Testnet),
            SIGNET_DID_PREFIX => Some(Network::Signet),
            _ => None,
        }
    }

    /// The matching `bitcoin` crate network.
    pub fn to_bitcoin(&self) -> bitcoin::Network {
        match self {
            Network::Mainnet => bitcoin::Network::Bitcoin,
            Network::Testnet => bitcoin::Network::Testnet,
            Network::Signet => bitcoin::Network::Signet,
        }
    }

    /// Bech32 human-readable prefix of segwit addresses on this network.
    pub fn bech32_hrp(&self) -> &'static str {
        match self {
            Network::Mainnet => "bc",
            Network::Testnet | Network::Signet => "tb",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Signet => "signet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = BtcoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "main" | "bitcoin" => Ok(Network::Mainnet),
            "testnet" | "test" => Ok(Network::Testnet),
            "signet" | "sig" => Ok(Network::Signet),
            other => Err(BtcoError::InvalidInput(format!("unknown network '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Runtime Configuration
// ---------------------------------------------------------------------------

/// Tunable parameters shared by the builder, orchestrator and resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProtocolConfig {
    /// Network used when a call does not name one explicitly.
    pub network: Network,
    /// Fee rate (sat/vB) used when no estimator is available.
    pub default_fee_rate: u64,
    /// Value of the inscribed output.
    pub postage_sats: u64,
    /// Content ceiling enforced by the content pipeline.
    pub max_content_size: usize,
    /// Seconds a whole-document resolution stays cached.
    pub resolver_cache_ttl_secs: u64,
    /// Milliseconds a document loader may spend on one IRI.
    pub loader_timeout_ms: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            default_fee_rate: DEFAULT_FEE_RATE_SAT_VB,
            postage_sats: DEFAULT_POSTAGE_SATS,
            max_content_size: MAX_CONTENT_SIZE_BYTES,
            resolver_cache_ttl_secs: DEFAULT_RESOLVER_CACHE_TTL.as_secs(),
            loader_timeout_ms: DEFAULT_LOADER_TIMEOUT.as_millis() as u64,
        }
    }
}

impl ProtocolConfig {
    /// Defaults for the given network.
    pub fn for_network(network: Network) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    /// Parse a JSON config document. Missing fields take their defaults;
    /// values that would produce invalid transactions are rejected.
    pub fn from_json(json: &str) -> BtcoResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| BtcoError::InvalidInput(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings no transaction could honour.
    pub fn validate(&self) -> BtcoResult<()> {
        if self.postage_sats < DUST_LIMIT_SATS {
            return Err(BtcoError::DustLimitViolation {
                value: self.postage_sats,
                limit: DUST_LIMIT_SATS,
            });
        }
        if self.default_fee_rate == 0 {
            return Err(BtcoError::InvalidInput("default fee rate must be positive".into()));
        }
        if self.max_content_size == 0 || self.max_content_size > MAX_CONTENT_SIZE_BYTES {
            return Err(BtcoError::InvalidInput(format!(
                "max content size must be within 1..={MAX_CONTENT_SIZE_BYTES}"
            )));
        }
        Ok(())
    }

    pub fn resolver_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.resolver_cache_ttl_secs)
    }

    pub fn loader_timeout(&self) -> Duration {
        Duration::from_millis(self.loader_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn did_prefixes_round_trip() {
        for network in [Network::Testnet, Network::Signet] {
            let prefix = network.did_prefix().unwrap();
            assert_eq!(Network::from_did_prefix(prefix), Some(network));
        }
        assert_eq!(Network::Mainnet.did_prefix(), None);
        assert_eq!(Network::from_did_prefix("main"), None);
    }

    #[test]
    fn network_parsing_accepts_aliases() {
        assert_eq!("bitcoin".parse::<Network>().unwrap(), Network::Mainnet);
        assert_eq!("TESTNET".parse::<Network>().unwrap(), Network::Testnet);
        assert_eq!("sig".parse::<Network>().unwrap(), Network::Signet);
        assert!("regtest-ish".parse::<Network>().is_err());
    }

    #[test]
    fn bech32_prefixes_differ_between_main_and_test() {
        assert_eq!(Network::Mainnet.bech32_hrp(), "bc");
        assert_eq!(Network::Testnet.bech32_hrp(), "tb");
        assert_eq!(Network::Signet.to_bitcoin(), bitcoin::Network::Signet);
    }

    #[test]
    fn config_from_partial_json_uses_defaults() {
        let config = ProtocolConfig::from_json(r#"{"network":"testnet","postageSats":600}"#).unwrap();
        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.postage_sats, 600);
        assert_eq!(config.default_fee_rate, DEFAULT_FEE_RATE_SAT_VB);
        assert_eq!(config.loader_timeout(), DEFAULT_LOADER_TIMEOUT);
    }

    #[test]
    fn config_rejects_sub_dust_postage() {
        let err = ProtocolConfig::from_json(r#"{"postageSats":100}"#).unwrap_err();
        assert_eq!(err.code(), "DUST_LIMIT_VIOLATION");
    }

    #[test]
    fn constants_sanity() {
        assert!(DUST_LIMIT_SATS < DEFAULT_POSTAGE_SATS);
        assert_eq!(MAX_CONTENT_SIZE_BYTES, 358_400);
        assert!(DEFAULT_CHUNK_SIZE_BYTES < MAX_CONTENT_SIZE_BYTES);
    }
}
