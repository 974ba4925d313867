//! # Inscriptions
//!
//! Putting content on a satoshi takes two transactions:
//!
//! ```text
//!   wallet UTXOs ──commit──> P2TR(internal_key, reveal leaf)
//!                                  │
//!                                reveal (script path, envelope in witness)
//!                                  v
//!                             destination (postage)
//! ```
//!
//! | Module         | Concern                                         |
//! |----------------|-------------------------------------------------|
//! | `script`       | Envelope encoding / parsing                     |
//! | `taproot`      | Commitment, commit & reveal transactions        |
//! | `fees`         | Fee estimation and UTXO selection               |
//! | `address`      | Destination address validation                  |
//! | `signer`       | Wallet seam for signing the commit              |
//! | `status`       | Per-txid lifecycle tracking                     |
//! | `guard`        | Front-running check on a target sat             |
//! | `orchestrator` | The commit/reveal state machine                 |

pub mod address;
pub mod fees;
pub mod guard;
pub mod orchestrator;
pub mod script;
pub mod signer;
pub mod status;
pub mod taproot;

pub use address::validate_address;
pub use fees::{select_utxos, FeeBreakdown, Utxo, UtxoSelection};
pub use guard::{ensure_no_front_running, prevent_front_running};
pub use orchestrator::{InscriptionEvent, InscriptionOrchestrator, InscriptionRequest, InscriptionState};
pub use script::{build_reveal_script, parse_envelope, ParsedEnvelope};
pub use signer::{CommitSigner, KeypairCommitSigner};
pub use status::{TrackedTransaction, TransactionKind, TransactionState, TransactionStatusTracker};
pub use taproot::{
    build_commit_tx, create_inscription, CommitRevealPair, InscriptionBuilder, InscriptionCommitment,
    InscriptionPreview,
};
