//! # `did:btco` Identifiers
//!
//! A `did:btco` identifier names a single satoshi. The network is encoded as
//! an optional segment between the method and the satoshi number:
//!
//! ```text
//! did:btco:<sat>          mainnet
//! did:btco:test:<sat>     testnet
//! did:btco:sig:<sat>      signet
//! ```
//!
//! The satoshi must be a canonical decimal (no sign, no leading zeros) in
//! `0..=MAX_SATOSHI`, so every valid identifier has exactly one spelling.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::{Network, DID_METHOD, MAX_SATOSHI};
use crate::error::{BtcoError, BtcoResult};

/// A parsed `did:btco` identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BtcoDid {
    satoshi: u64,
    network: Network,
}

impl BtcoDid {
    /// Identifier for `satoshi` on `network`. Fails with `INVALID_SATOSHI`
    /// above [`MAX_SATOSHI`].
    pub fn new(satoshi: u64, network: Network) -> BtcoResult<Self> {
        if satoshi > MAX_SATOSHI {
            return Err(BtcoError::InvalidSatoshi(format!(
                "{satoshi} exceeds the maximum satoshi {MAX_SATOSHI}"
            )));
        }
        Ok(Self { satoshi, network })
    }

    pub fn satoshi(&self) -> u64 {
        self.satoshi
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// `<did>#<fragment>`.
    pub fn fragment_url(&self, fragment: &str) -> String {
        format!("{self}#{fragment}")
    }

    /// `<did>/<index>`.
    pub fn resource_url(&self, index: usize) -> String {
        format!("{self}/{index}")
    }
}

impl fmt::Display for BtcoDid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.network.did_prefix() {
            Some(prefix) => write!(f, "did:{DID_METHOD}:{prefix}:{}", self.satoshi),
            None => write!(f, "did:{DID_METHOD}:{}", self.satoshi),
        }
    }
}

impl FromStr for BtcoDid {
    type Err = BtcoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("did:")
            .ok_or_else(|| BtcoError::InvalidInput(format!("'{s}' is not a DID")))?;
        let rest = rest
            .strip_prefix(DID_METHOD)
            .and_then(|r| r.strip_prefix(':'))
            .ok_or_else(|| BtcoError::InvalidInput(format!("'{s}' is not a did:{DID_METHOD} identifier")))?;

        let (network, sat) = match rest.split_once(':') {
            None => (Network::Mainnet, rest),
            Some((prefix, sat)) => {
                let network = Network::from_did_prefix(prefix).ok_or_else(|| {
                    BtcoError::InvalidInput(format!("unknown network prefix '{prefix}' in '{s}'"))
                })?;
                (network, sat)
            }
        };
        BtcoDid::new(parse_satoshi(sat)?, network)
    }
}

impl Serialize for BtcoDid {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BtcoDid {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Parse a canonical decimal satoshi number.
pub fn parse_satoshi(value: &str) -> BtcoResult<u64> {
    let canonical = !value.is_empty()
        && value.bytes().all(|b| b.is_ascii_digit())
        && (value == "0" || !value.starts_with('0'));
    if !canonical {
        return Err(BtcoError::InvalidSatoshi(format!("'{value}' is not a satoshi number")));
    }
    let satoshi: u64 = value
        .parse()
        .map_err(|_| BtcoError::InvalidSatoshi(format!("'{value}' is out of range")))?;
    if satoshi > MAX_SATOSHI {
        return Err(BtcoError::InvalidSatoshi(format!(
            "{satoshi} exceeds the maximum satoshi {MAX_SATOSHI}"
        )));
    }
    Ok(satoshi)
}

/// `did:btco[:prefix]:<satoshi>` for `satoshi` on `network`.
pub fn build_did(satoshi: u64, network: Network) -> BtcoResult<String> {
    Ok(BtcoDid::new(satoshi, network)?.to_string())
}

pub fn parse_did(did: &str) -> BtcoResult<BtcoDid> {
    did.parse()
}

pub fn is_valid_did(did: &str) -> bool {
    did.parse::<BtcoDid>().is_ok()
}
