//! Address validation for destinations and transfers.

use std::str::FromStr;

use bitcoin::Address;

use crate::config::Network;
use crate::error::{BtcoError, BtcoResult};

/// Parse `address` and check it belongs to `network`.
///
/// Testnet and signet share the `tb` prefix, so an address valid on one is
/// accepted on the other.
pub fn validate_address(address: &str, network: Network) -> BtcoResult<Address> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(BtcoError::InvalidAddress("address is empty".into()));
    }
    let unchecked = Address::from_str(trimmed)
        .map_err(|e| BtcoError::InvalidAddress(format!("{trimmed}: {e}")))?;
    unchecked
        .require_network(network.to_bitcoin())
        .map_err(|_| BtcoError::InvalidAddress(format!("{trimmed} is not a {network} address")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAINNET_P2WPKH: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";
    const TESTNET_P2WPKH: &str = "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx";

    #[test]
    fn accepts_matching_network() {
        assert!(validate_address(MAINNET_P2WPKH, Network::Mainnet).is_ok());
        assert!(validate_address(TESTNET_P2WPKH, Network::Testnet).is_ok());
        assert!(validate_address(TESTNET_P2WPKH, Network::Signet).is_ok());
    }

    #[test]
    fn rejects_wrong_network_and_garbage() {
        let err = validate_address(MAINNET_P2WPKH, Network::Testnet).unwrap_err();
        assert_eq!(err.code(), "INVALID_ADDRESS");
        assert!(validate_address("not-an-address", Network::Mainnet).is_err());
        assert!(validate_address("  ", Network::Mainnet).is_err());
    }
}
