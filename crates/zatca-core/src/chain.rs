//! # Invoice Hash Chain
//!
//! Per-seller invoice counter value (ICV) and previous invoice hash (PIH).
//!
//! ## Design
//!
//! Each seller owns one chain. Invoice `n` carries counter `n` and the hash
//! of invoice `n - 1`; the first invoice carries counter 1 and the genesis
//! hash. [`ChainState`] is the persisted record (last counter, last hash)
//! and is a plain value: callers load it from their store, hand it to the
//! tracker, and persist whatever [`HashChainTracker::record_hash`] returns.
//!
//! ## Integrity Model
//!
//! 1. Before building, the caller takes a [`ChainLink`] from the current
//!    state and writes it into the invoice.
//! 2. After hashing, the caller records the hash against that same link.
//! 3. Recording is a compare-and-swap under the seller's lock: if another
//!    invoice advanced the chain in between, the link is stale and the call
//!    fails with [`ChainIntegrityError`]. Nothing is renumbered silently.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::digest::{is_base64, GENESIS_PREVIOUS_HASH};
use crate::error::ChainIntegrityError;

/// The chain position an invoice is built for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainLink {
    /// Counter value of the invoice being built (ICV).
    pub invoice_counter_value: u64,
    /// Hash of the seller's previous invoice (PIH).
    pub previous_invoice_hash: String,
}

/// Persisted chain state of one seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainState {
    /// Counter value of the last recorded invoice; 0 before the first.
    pub last_counter_value: u64,
    /// Hash of the last recorded invoice, or the genesis hash.
    pub last_hash: String,
}

impl ChainState {
    /// State of a seller with no invoices, using the default genesis hash.
    pub fn genesis() -> Self {
        Self::with_genesis_hash(GENESIS_PREVIOUS_HASH)
    }

    /// State of a seller with no invoices, using a custom genesis hash.
    pub fn with_genesis_hash(genesis_hash: impl Into<String>) -> Self {
        Self {
            last_counter_value: 0,
            last_hash: genesis_hash.into(),
        }
    }

    /// The link the next invoice must carry.
    pub fn next_link(&self) -> ChainLink {
        ChainLink {
            invoice_counter_value: self.last_counter_value.saturating_add(1),
            previous_invoice_hash: self.last_hash.clone(),
        }
    }

    /// Advance the chain by one invoice built for `link` with hash `new_hash`.
    ///
    /// # Errors
    ///
    /// - [`ChainIntegrityError::CounterMismatch`] if `link` skips or repeats
    ///   a counter value.
    /// - [`ChainIntegrityError::PreviousHashMismatch`] if `link` was built
    ///   against a hash other than the last recorded one.
    /// - [`ChainIntegrityError::InvalidHash`] if `new_hash` is not Base64.
    pub fn advance(
        &self,
        seller_id: &str,
        link: &ChainLink,
        new_hash: &str,
    ) -> Result<ChainState, ChainIntegrityError> {
        let expected = self.last_counter_value.saturating_add(1);
        if link.invoice_counter_value != expected {
            return Err(ChainIntegrityError::CounterMismatch {
                seller_id: seller_id.to_string(),
                expected,
                actual: link.invoice_counter_value,
            });
        }
        if link.previous_invoice_hash != self.last_hash {
            return Err(ChainIntegrityError::PreviousHashMismatch {
                seller_id: seller_id.to_string(),
                counter: link.invoice_counter_value,
                expected: self.last_hash.clone(),
                actual: link.previous_invoice_hash.clone(),
            });
        }
        if !is_base64(new_hash) {
            return Err(ChainIntegrityError::InvalidHash {
                seller_id: seller_id.to_string(),
                hash: new_hash.to_string(),
            });
        }
        Ok(ChainState {
            last_counter_value: link.invoice_counter_value,
            last_hash: new_hash.to_string(),
        })
    }
}

/// Verify a recorded sequence of invoices for one seller.
///
/// `entries` pairs each invoice's link with its computed hash, in issue
/// order, starting from `start`.
pub fn verify_chain<'a, I>(
    seller_id: &str,
    start: &ChainState,
    entries: I,
) -> Result<ChainState, ChainIntegrityError>
where
    I: IntoIterator<Item = (&'a ChainLink, &'a str)>,
{
    entries
        .into_iter()
        .try_fold(start.clone(), |state, (link, hash)| {
            state.advance(seller_id, link, hash)
        })
}

/// In-process view of every seller's chain.
///
/// The tracker is an ordinary value owned by its caller. It starts empty;
/// sellers it has not seen begin at the genesis state unless hydrated from
/// persistence with [`HashChainTracker::load`].
#[derive(Debug)]
pub struct HashChainTracker {
    genesis_hash: String,
    chains: Mutex<HashMap<String, ChainState>>,
}

impl HashChainTracker {
    /// Create a tracker using the default genesis hash.
    pub fn new() -> Self {
        Self::with_genesis_hash(GENESIS_PREVIOUS_HASH)
    }

    /// Create a tracker using a custom genesis hash.
    pub fn with_genesis_hash(genesis_hash: impl Into<String>) -> Self {
        Self {
            genesis_hash: genesis_hash.into(),
            chains: Mutex::new(HashMap::new()),
        }
    }

    /// The genesis hash used for new sellers.
    pub fn genesis_hash(&self) -> &str {
        &self.genesis_hash
    }

    /// Replace a seller's state with one loaded from persistence.
    pub fn load(&self, seller_id: &str, state: ChainState) {
        tracing::debug!(
            seller_id,
            last_counter = state.last_counter_value,
            "chain state loaded"
        );
        self.chains.lock().insert(seller_id.to_string(), state);
    }

    /// Current state of a seller's chain.
    pub fn state(&self, seller_id: &str) -> ChainState {
        self.chains
            .lock()
            .get(seller_id)
            .cloned()
            .unwrap_or_else(|| ChainState::with_genesis_hash(self.genesis_hash.clone()))
    }

    /// Counter value the seller's next invoice must carry.
    pub fn next_counter_value(&self, seller_id: &str) -> u64 {
        self.state(seller_id).last_counter_value.saturating_add(1)
    }

    /// Hash the seller's next invoice must carry as PIH.
    pub fn previous_hash(&self, seller_id: &str) -> String {
        self.state(seller_id).last_hash
    }

    /// Counter and PIH for the seller's next invoice, read atomically.
    pub fn next_link(&self, seller_id: &str) -> ChainLink {
        self.state(seller_id).next_link()
    }

    /// Record the hash of an invoice built for `link`.
    ///
    /// Returns the updated state for the caller to persist.
    ///
    /// # Errors
    ///
    /// Returns [`ChainIntegrityError`] when `link` no longer matches the
    /// seller's chain; the tracked state is left unchanged.
    pub fn record_hash(
        &self,
        seller_id: &str,
        link: &ChainLink,
        new_hash: &str,
    ) -> Result<ChainState, ChainIntegrityError> {
        let mut chains = self.chains.lock();
        let current = chains
            .get(seller_id)
            .cloned()
            .unwrap_or_else(|| ChainState::with_genesis_hash(self.genesis_hash.clone()));
        match current.advance(seller_id, link, new_hash) {
            Ok(next) => {
                chains.insert(seller_id.to_string(), next.clone());
                tracing::info!(
                    seller_id,
                    counter = next.last_counter_value,
                    "invoice hash recorded"
                );
                Ok(next)
            }
            Err(e) => {
                tracing::warn!(seller_id, error = %e, "chain integrity violation");
                Err(e)
            }
        }
    }
}

impl Default for HashChainTracker {
    fn default() -> Self {
        Self::new()
    }
}
