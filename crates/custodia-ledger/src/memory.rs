//! In-memory implementation of `LedgerStore`.
//!
//! `InMemoryLedgerStore` is the reference implementation of the store
//! contract: it preserves insertion order, rejects any append that does not
//! extend the current tip (duplicate or gapped sequence, broken prev-hash
//! link), and stamps the authority timestamp on the stored copy.  All
//! events live in a `Vec` behind a `Mutex`, so the store can be shared
//! across threads.
//!
//! Use `verify_integrity()` at any time to confirm the stored chain has not
//! been broken, and `events()` to obtain an ordered snapshot.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::debug;

use custodia_contracts::{
    error::{CustodiaError, CustodiaResult},
    event::LedgerEvent,
};
use custodia_core::traits::LedgerStore;

use crate::chain::{verify_chain, GENESIS_HASH};

/// An in-memory, append-only ledger store.
///
/// # Thread safety
///
/// Every method acquires the internal `Mutex`; clones of the `Arc` observe
/// the same chain.
#[derive(Clone, Default)]
pub struct InMemoryLedgerStore {
    events: Arc<Mutex<Vec<LedgerEvent>>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ordered snapshot of every stored event.
    pub fn events(&self) -> CustodiaResult<Vec<LedgerEvent>> {
        Ok(self.lock()?.clone())
    }

    /// Verify that the stored chain has not been broken.
    pub fn verify_integrity(&self) -> CustodiaResult<()> {
        verify_chain(&self.lock()?)
    }

    fn lock(&self) -> CustodiaResult<std::sync::MutexGuard<'_, Vec<LedgerEvent>>> {
        self.events.lock().map_err(|e| CustodiaError::Storage {
            reason: format!("ledger store lock poisoned: {}", e),
        })
    }
}

impl LedgerStore for InMemoryLedgerStore {
    /// Append one event to the chain tip.
    ///
    /// Rejects the append with `CustodiaError::Integrity` when the event's
    /// sequence is not exactly tip + 1 or its `prev_hash` does not match the
    /// tip's `content_hash` (genesis sentinel for an empty store).
    fn append(&self, event: &LedgerEvent) -> CustodiaResult<()> {
        let mut events = self.lock()?;

        let (expected_seq, expected_prev) = match events.last() {
            Some(tip) => (tip.sequence() + 1, tip.content_hash().to_string()),
            None => (1, GENESIS_HASH.to_string()),
        };

        if event.sequence() != expected_seq {
            return Err(CustodiaError::Integrity {
                sequence: event.sequence(),
                expected: format!("sequence {}", expected_seq),
                actual: format!("sequence {}", event.sequence()),
            });
        }
        if event.prev_hash() != expected_prev {
            return Err(CustodiaError::Integrity {
                sequence: event.sequence(),
                expected: expected_prev,
                actual: event.prev_hash().to_string(),
            });
        }

        // The store is the authority timestamp assigner; the stamp is
        // excluded from the content hash, so linkage is unaffected.
        let stored = event.with_authority_timestamp(Utc::now());

        debug!(
            sequence = stored.sequence(),
            event_type = %stored.event_type(),
            content_hash = %stored.content_hash(),
            "ledger event appended"
        );

        events.push(stored);
        Ok(())
    }

    fn events_by_type(&self, event_type: &str, limit: usize) -> CustodiaResult<Vec<LedgerEvent>> {
        let events = self.lock()?;
        Ok(events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .take(limit)
            .cloned()
            .collect())
    }

    fn events_by_payload_field(
        &self,
        field: &str,
        value: &serde_json::Value,
        limit: usize,
    ) -> CustodiaResult<Vec<LedgerEvent>> {
        let events = self.lock()?;
        Ok(events
            .iter()
            .filter(|e| e.payload().get(field) == Some(value))
            .take(limit)
            .cloned()
            .collect())
    }

    fn latest_event(&self) -> CustodiaResult<Option<LedgerEvent>> {
        Ok(self.lock()?.last().cloned())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
