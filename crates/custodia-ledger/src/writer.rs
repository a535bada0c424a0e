//! The gated ledger writer: the mandatory check order for every append.
//!
//! The ordering invariant is absolute and enforced structurally — the code
//! path to the factory and the store is only reachable after both checks
//! pass, in this order:
//!
//!   Termination → Halt → (writer-external preconditions) → Append
//!
//! Termination is checked strictly before halt: cessation is permanent and
//! halt is not, so a terminated-and-halted system must always answer with
//! the termination error, even to a caller holding a halt override.

use std::sync::Arc;

use tracing::{debug, info};

use custodia_contracts::{error::CustodiaResult, event::LedgerEvent};
use custodia_core::traits::{Clock, HaltCheck, LedgerStore, TerminationCheck};

use crate::factory::{create_event, CreateEvent};

/// The writer-supplied portion of an event; sequence, hashes, and the local
/// timestamp are derived by the gate.
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub event_type: String,
    pub payload: serde_json::Value,
    pub signature: String,
    pub witness_id: String,
    pub witness_signature: String,
    pub agent_id: Option<String>,
    pub signing_key_id: Option<String>,
}

/// A ledger writer that applies the termination and halt gates before every
/// append.
pub struct GatedLedgerWriter {
    store: Arc<dyn LedgerStore>,
    termination: Arc<dyn TerminationCheck>,
    halt: Arc<dyn HaltCheck>,
    clock: Arc<dyn Clock>,
}

impl GatedLedgerWriter {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        termination: Arc<dyn TerminationCheck>,
        halt: Arc<dyn HaltCheck>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            termination,
            halt,
            clock,
        }
    }

    /// Check whether a write may proceed right now, without performing one.
    ///
    /// Applies the same fixed order as `append`: termination first, halt
    /// second.
    pub fn clear_for_write(&self) -> CustodiaResult<()> {
        self.termination.check_terminated()?;
        self.halt.check_halted()?;
        Ok(())
    }

    /// Append one event through the full gate sequence.
    ///
    /// Derives the next sequence number and the required prev-hash from the
    /// store tip, mints the event via the factory, and appends it.  The
    /// returned record is the minted event (the store's copy additionally
    /// carries the authority timestamp).
    pub fn append(&self, draft: EventDraft) -> CustodiaResult<LedgerEvent> {
        // Gate 1: termination.  Permanent — wins over everything.
        self.termination.check_terminated()?;

        // Gate 2: halt.  Resolvable only by an external unhalt.
        self.halt.check_halted()?;

        // Gate 3 (writer-external preconditions such as single-writer locks
        // or startup verification) belongs to the caller.

        let tip = self.store.latest_event()?;
        let (sequence, previous) = match &tip {
            Some(tip) => (tip.sequence() + 1, Some(tip.content_hash().to_string())),
            None => (1, None),
        };

        debug!(
            sequence,
            event_type = %draft.event_type,
            "write gate clear, minting event"
        );

        let event = create_event(CreateEvent {
            sequence,
            event_type: draft.event_type,
            payload: draft.payload,
            signature: draft.signature,
            witness_id: draft.witness_id,
            witness_signature: draft.witness_signature,
            local_timestamp: self.clock.now(),
            previous_content_hash: previous,
            agent_id: draft.agent_id,
            signing_key_id: draft.signing_key_id,
            event_id: None,
        })?;

        self.store.append(&event)?;

        info!(
            sequence = event.sequence(),
            event_type = %event.event_type(),
            content_hash = %event.content_hash(),
            "event appended through write gate"
        );

        Ok(event)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
