//! Front-running guard.
//!
//! A DID is bound to a satoshi by being the first thing inscribed on it. If
//! someone else has already put an inscription on the same sat, binding is
//! ambiguous and must be refused.

use tracing::warn;

use crate::error::{BtcoError, BtcoResult};
use crate::provider::OrdinalsProvider;

/// `true` when `satoshi` carries at most one inscription and binding to it
/// is safe; `false` when several compete for it.
pub async fn prevent_front_running(provider: &dyn OrdinalsProvider, satoshi: u64) -> BtcoResult<bool> {
    let count = provider.get_inscriptions_by_satoshi(satoshi).await?.len();
    if count > 1 {
        warn!(satoshi, count, "multiple inscriptions on satoshi");
        return Ok(false);
    }
    Ok(true)
}

/// Like [`prevent_front_running`], but fails with `FRONT_RUNNING_DETECTED`.
pub async fn ensure_no_front_running(provider: &dyn OrdinalsProvider, satoshi: u64) -> BtcoResult<()> {
    let count = provider.get_inscriptions_by_satoshi(satoshi).await?.len();
    if count > 1 {
        return Err(BtcoError::FrontRunningDetected { satoshi, count });
    }
    Ok(())
}
