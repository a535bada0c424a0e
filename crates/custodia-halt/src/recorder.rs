//! Durable halt recording — the circuit's tertiary channel.
//!
//! `LedgerHaltRecorder` writes the halt status as a regular hash-chained
//! event.  It deliberately goes straight to the store rather than through
//! the gated writer: by the time channel 3 runs the system is already
//! halted, and the write gate would (correctly) refuse the append.

use std::sync::Arc;

use tracing::debug;

use custodia_contracts::{
    error::{CustodiaError, CustodiaResult},
    halt::HaltStatus,
};
use custodia_core::traits::{Clock, LedgerStore};
use custodia_ledger::{create_event, CreateEvent};

/// Event type under which halts are recorded on the ledger.
pub const HALT_EVENT_TYPE: &str = "system_halt";

/// The circuit's durable recording seam.
pub trait HaltRecorder: Send + Sync {
    /// Persist the halt status.  Best-effort from the circuit's point of
    /// view — the caller logs and swallows any error.
    fn record_halt(&self, status: &HaltStatus) -> CustodiaResult<()>;
}

/// Producer identity used to sign and witness recorded halt events.
#[derive(Debug, Clone)]
pub struct RecorderIdentity {
    pub signature: String,
    pub witness_id: String,
    pub witness_signature: String,
    pub agent_id: Option<String>,
}

/// Records halts as `system_halt` events on the chain.
pub struct LedgerHaltRecorder {
    store: Arc<dyn LedgerStore>,
    identity: RecorderIdentity,
    clock: Arc<dyn Clock>,
}

impl LedgerHaltRecorder {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        identity: RecorderIdentity,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            identity,
            clock,
        }
    }
}

impl HaltRecorder for LedgerHaltRecorder {
    fn record_halt(&self, status: &HaltStatus) -> CustodiaResult<()> {
        let payload = serde_json::to_value(status).map_err(|e| CustodiaError::Validation {
            reason: format!("halt status not serializable: {}", e),
        })?;

        let tip = self.store.latest_event()?;
        let (sequence, previous) = match &tip {
            Some(tip) => (tip.sequence() + 1, Some(tip.content_hash().to_string())),
            None => (1, None),
        };

        let event = create_event(CreateEvent {
            sequence,
            event_type: HALT_EVENT_TYPE.to_string(),
            payload,
            signature: self.identity.signature.clone(),
            witness_id: self.identity.witness_id.clone(),
            witness_signature: self.identity.witness_signature.clone(),
            local_timestamp: self.clock.now(),
            previous_content_hash: previous,
            agent_id: self.identity.agent_id.clone(),
            signing_key_id: None,
            event_id: None,
        })?;

        self.store.append(&event)?;
        debug!(sequence, "halt recorded on ledger");
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use custodia_contracts::halt::HaltReason;
    use custodia_core::traits::SystemClock;
    use custodia_ledger::InMemoryLedgerStore;

    use super::*;

    fn identity() -> RecorderIdentity {
        RecorderIdentity {
            signature: "system-sig".to_string(),
            witness_id: "halt-witness".to_string(),
            witness_signature: "halt-wsig".to_string(),
            agent_id: None,
        }
    }

    #[test]
    fn records_halt_as_chained_event() {
        let store = InMemoryLedgerStore::new();
        let recorder =
            LedgerHaltRecorder::new(Arc::new(store.clone()), identity(), Arc::new(SystemClock));

        let status = HaltStatus::halted(
            HaltReason::OperatorRequest,
            "manual stop",
            Some("op-1".to_string()),
            None,
            Utc::now(),
        )
        .unwrap();
        recorder.record_halt(&status).unwrap();

        let events = store.events_by_type(HALT_EVENT_TYPE, 10).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].sequence(), 1);
        assert_eq!(events[0].payload()["reason"], "operator_request");
        assert_eq!(events[0].payload()["message"], "manual stop");
        assert!(store.verify_integrity().is_ok());
    }

    #[test]
    fn recorded_halt_extends_existing_chain() {
        let store = InMemoryLedgerStore::new();
        let prior = create_event(CreateEvent {
            sequence: 1,
            event_type: "vote_cast".to_string(),
            payload: serde_json::json!({ "choice": "aye" }),
            signature: "sig".to_string(),
            witness_id: "witness-01".to_string(),
            witness_signature: "wsig".to_string(),
            local_timestamp: Utc::now(),
            previous_content_hash: None,
            agent_id: None,
            signing_key_id: None,
            event_id: None,
        })
        .unwrap();
        store.append(&prior).unwrap();

        let recorder =
            LedgerHaltRecorder::new(Arc::new(store.clone()), identity(), Arc::new(SystemClock));
        let status =
            HaltStatus::halted(HaltReason::SystemFault, "fault", None, None, Utc::now()).unwrap();
        recorder.record_halt(&status).unwrap();

        let halt_event = store.latest_event().unwrap().unwrap();
        assert_eq!(halt_event.sequence(), 2);
        assert_eq!(halt_event.prev_hash(), prior.content_hash());
        assert!(store.verify_integrity().is_ok());
    }
}
