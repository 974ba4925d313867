//! # Commit Signing
//!
//! The commit spends wallet funds, so signing it is the wallet's job, not
//! the inscription builder's. [`CommitSigner`] is that seam. The reveal is
//! signed by the commitment itself with its ephemeral internal key.
//!
//! [`KeypairCommitSigner`] is the simplest possible wallet: one secp256k1
//! key, spending BIP-86 key-path Taproot outputs.

use bitcoin::hashes::Hash;
use bitcoin::key::TapTweak;
use bitcoin::secp256k1::{Keypair, Message, Secp256k1};
use bitcoin::sighash::{Prevouts, SighashCache, TapSighashType};
use bitcoin::{taproot, Address, ScriptBuf, Transaction, TxOut, Witness};
use zeroize::Zeroizing;

use crate::config::Network;
use crate::error::{BtcoError, BtcoResult};

/// Signs every input of a commit transaction.
pub trait CommitSigner: Send + Sync {
    /// Sign `tx` in place. `prevouts[i]` is the output spent by input `i`.
    fn sign_commit(&self, tx: &mut Transaction, prevouts: &[TxOut]) -> BtcoResult<()>;

    /// Where change should go.
    fn change_script(&self) -> ScriptBuf;
}

/// Single-key BIP-86 Taproot wallet.
pub struct KeypairCommitSigner {
    keypair: Keypair,
    network: Network,
}

impl KeypairCommitSigner {
    pub fn from_secret(secret: &[u8], network: Network) -> BtcoResult<Self> {
        let secret = Zeroizing::new(secret.to_vec());
        let secp = Secp256k1::new();
        let keypair = Keypair::from_seckey_slice(&secp, &secret)
            .map_err(|e| BtcoError::InvalidInput(format!("wallet key: {e}")))?;
        Ok(Self { keypair, network })
    }

    pub fn generate(network: Network) -> Self {
        let secp = Secp256k1::new();
        Self {
            keypair: Keypair::new(&secp, &mut bitcoin::secp256k1::rand::thread_rng()),
            network,
        }
    }

    /// Key-path-only P2TR address of this wallet.
    pub fn address(&self) -> Address {
        let secp = Secp256k1::verification_only();
        Address::p2tr(&secp, self.keypair.x_only_public_key().0, None, self.network.to_bitcoin())
    }
}

impl CommitSigner for KeypairCommitSigner {
    fn sign_commit(&self, tx: &mut Transaction, prevouts: &[TxOut]) -> BtcoResult<()> {
        if prevouts.len() != tx.input.len() {
            return Err(BtcoError::Transaction(format!(
                "{} prevouts supplied for {} inputs",
                prevouts.len(),
                tx.input.len()
            )));
        }
        let own_script = self.change_script();
        if let Some(foreign) = prevouts.iter().position(|p| p.script_pubkey != own_script) {
            return Err(BtcoError::Transaction(format!(
                "input {foreign} is not owned by this wallet"
            )));
        }

        let secp = Secp256k1::new();
        let tweaked = self.keypair.tap_tweak(&secp, None).to_inner();

        let mut signatures = Vec::with_capacity(tx.input.len());
        {
            let mut cache = SighashCache::new(&*tx);
            for index in 0..prevouts.len() {
                let sighash = cache
                    .taproot_key_spend_signature_hash(index, &Prevouts::All(prevouts), TapSighashType::Default)
                    .map_err(|e| BtcoError::Transaction(format!("commit sighash: {e}")))?;
                let message = Message::from_digest(sighash.to_byte_array());
                signatures.push(taproot::Signature {
                    signature: secp.sign_schnorr(&message, &tweaked),
                    sighash_type: TapSighashType::Default,
                });
            }
        }
        for (input, signature) in tx.input.iter_mut().zip(signatures) {
            input.witness = Witness::p2tr_key_spend(&signature);
        }
        Ok(())
    }

    fn change_script(&self) -> ScriptBuf {
        self.address().script_pubkey()
    }
}

impl Drop for KeypairCommitSigner {
    fn drop(&mut self) {
        self.keypair.non_secure_erase();
    }
}

impl std::fmt::Debug for KeypairCommitSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeypairCommitSigner")
            .field("address", &self.address().to_string())
            .finish_non_exhaustive()
    }
}
