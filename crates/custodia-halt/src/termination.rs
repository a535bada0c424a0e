//! The permanent-termination (cessation) gate.
//!
//! Termination is derived from the hash-chained events themselves: a single
//! sentinel event whose payload carries `is_terminal: true`.  Once observed,
//! the answer is `true` forever — the gate caches the terminal record and
//! never consults the store again.  The answer `false` is never cached: it
//! can still transition to `true`, so every negative check re-queries.
//!
//! A store failure on the query propagates as an error.  "Could not check"
//! is never interpreted as "not terminated".

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::warn;

use custodia_contracts::{
    error::{CustodiaError, CustodiaResult},
    event::LedgerEvent,
};
use custodia_core::traits::{LedgerStore, TerminationCheck};

/// Payload field marking the cessation sentinel event.
pub const TERMINAL_FLAG_FIELD: &str = "is_terminal";

/// Payload field carrying the cessation execution timestamp.
pub const EXECUTED_AT_FIELD: &str = "executed_at";

#[derive(Debug, Clone)]
struct TerminalRecord {
    event: LedgerEvent,
    executed_at: DateTime<Utc>,
}

/// Detects whether a cessation event has ever been recorded.
///
/// One instance per process; the cached `true` answer is monotonic for the
/// instance's lifetime even if the underlying store is later mutated.
pub struct TerminationGate {
    store: Arc<dyn LedgerStore>,
    terminal: OnceLock<TerminalRecord>,
}

impl TerminationGate {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            terminal: OnceLock::new(),
        }
    }

    /// True when a terminal event exists.
    ///
    /// Cached-true fast path, no lookup.  Otherwise queries the store;
    /// query errors propagate.
    pub fn is_system_terminated(&self) -> CustodiaResult<bool> {
        if self.terminal.get().is_some() {
            return Ok(true);
        }

        let found = self
            .store
            .events_by_payload_field(TERMINAL_FLAG_FIELD, &json!(true), 1)?;

        match found.into_iter().next() {
            Some(event) => {
                warn!(
                    sequence = event.sequence(),
                    "terminal cessation event detected; system is permanently terminated"
                );
                let executed_at = embedded_execution_timestamp(&event);
                // Concurrent detections race on the same terminal event and
                // converge; a lost set is identical to the winning one.
                let _ = self.terminal.set(TerminalRecord { event, executed_at });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The cessation sentinel event, lazily warming the cache.
    pub fn terminal_event(&self) -> CustodiaResult<Option<LedgerEvent>> {
        self.is_system_terminated()?;
        Ok(self.terminal.get().map(|r| r.event.clone()))
    }

    /// The cessation execution timestamp, lazily warming the cache.
    pub fn termination_timestamp(&self) -> CustodiaResult<Option<DateTime<Utc>>> {
        self.is_system_terminated()?;
        Ok(self.terminal.get().map(|r| r.executed_at))
    }
}

impl TerminationCheck for TerminationGate {
    fn check_terminated(&self) -> CustodiaResult<()> {
        self.is_system_terminated()?;
        if let Some(record) = self.terminal.get() {
            return Err(CustodiaError::Terminated {
                terminal_sequence: record.event.sequence(),
            });
        }
        Ok(())
    }
}

/// The execution timestamp embedded in the sentinel's payload, falling back
/// to the event's local timestamp when absent or unparseable.
fn embedded_execution_timestamp(event: &LedgerEvent) -> DateTime<Utc> {
    event
        .payload()
        .get(EXECUTED_AT_FIELD)
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| event.local_timestamp())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Mutex;

    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use custodia_ledger::{create_event, CreateEvent};

    use super::*;

    /// A store whose payload-field query results can be swapped and whose
    /// failures can be switched on, to exercise cache and error semantics.
    struct ScriptedStore {
        terminal_events: Mutex<Vec<LedgerEvent>>,
        failing: AtomicBool,
        query_count: AtomicU32,
    }

    impl ScriptedStore {
        fn empty() -> Self {
            Self {
                terminal_events: Mutex::new(vec![]),
                failing: AtomicBool::new(false),
                query_count: AtomicU32::new(0),
            }
        }

        fn with_terminal(event: LedgerEvent) -> Self {
            let store = Self::empty();
            store.terminal_events.lock().unwrap().push(event);
            store
        }
    }

    impl LedgerStore for ScriptedStore {
        fn append(&self, _event: &LedgerEvent) -> CustodiaResult<()> {
            Ok(())
        }

        fn events_by_type(
            &self,
            _event_type: &str,
            _limit: usize,
        ) -> CustodiaResult<Vec<LedgerEvent>> {
            Ok(vec![])
        }

        fn events_by_payload_field(
            &self,
            field: &str,
            value: &serde_json::Value,
            limit: usize,
        ) -> CustodiaResult<Vec<LedgerEvent>> {
            self.query_count.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(CustodiaError::Storage {
                    reason: "database unreachable".to_string(),
                });
            }
            assert_eq!(field, TERMINAL_FLAG_FIELD);
            assert_eq!(value, &json!(true));
            Ok(self
                .terminal_events
                .lock()
                .unwrap()
                .iter()
                .take(limit)
                .cloned()
                .collect())
        }

        fn latest_event(&self) -> CustodiaResult<Option<LedgerEvent>> {
            Ok(None)
        }
    }

    fn terminal_event(sequence: u64, executed_at: Option<&str>) -> LedgerEvent {
        let mut payload = json!({ TERMINAL_FLAG_FIELD: true, "directive": "cease operations" });
        if let Some(ts) = executed_at {
            payload[EXECUTED_AT_FIELD] = json!(ts);
        }
        let previous = if sequence > 1 {
            Some("ab".repeat(32))
        } else {
            None
        };
        create_event(CreateEvent {
            sequence,
            event_type: "cessation".to_string(),
            payload,
            signature: "sig".to_string(),
            witness_id: "witness-01".to_string(),
            witness_signature: "wsig".to_string(),
            local_timestamp: Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap(),
            previous_content_hash: previous,
            agent_id: None,
            signing_key_id: None,
            event_id: None,
        })
        .unwrap()
    }

    #[test]
    fn not_terminated_when_no_sentinel_exists() {
        let store = Arc::new(ScriptedStore::empty());
        let gate = TerminationGate::new(store.clone());

        assert!(!gate.is_system_terminated().unwrap());
        assert!(gate.terminal_event().unwrap().is_none());
        assert!(gate.termination_timestamp().unwrap().is_none());
        assert!(gate.check_terminated().is_ok());
    }

    #[test]
    fn false_is_never_cached() {
        let store = Arc::new(ScriptedStore::empty());
        let gate = TerminationGate::new(store.clone());

        assert!(!gate.is_system_terminated().unwrap());
        assert!(!gate.is_system_terminated().unwrap());
        assert_eq!(
            store.query_count.load(Ordering::SeqCst),
            2,
            "every negative check must re-query the store"
        );
    }

    #[test]
    fn terminated_when_sentinel_exists() {
        let store = Arc::new(ScriptedStore::with_terminal(terminal_event(9, None)));
        let gate = TerminationGate::new(store);

        assert!(gate.is_system_terminated().unwrap());
        let event = gate.terminal_event().unwrap().unwrap();
        assert_eq!(event.sequence(), 9);

        let err = gate.check_terminated().unwrap_err();
        assert!(matches!(
            err,
            CustodiaError::Terminated {
                terminal_sequence: 9
            }
        ));
    }

    /// Termination monotonicity: once true, true forever — even if the
    /// store is mutated to remove the terminal event.
    #[test]
    fn true_is_cached_permanently() {
        let store = Arc::new(ScriptedStore::with_terminal(terminal_event(3, None)));
        let gate = TerminationGate::new(store.clone());

        assert!(gate.is_system_terminated().unwrap());
        let queries_after_detection = store.query_count.load(Ordering::SeqCst);

        // Simulate the terminal event vanishing from the store.
        store.terminal_events.lock().unwrap().clear();

        assert!(gate.is_system_terminated().unwrap());
        assert!(gate.terminal_event().unwrap().is_some());
        assert_eq!(
            store.query_count.load(Ordering::SeqCst),
            queries_after_detection,
            "cached-true answers must not touch the store"
        );
    }

    #[test]
    fn embedded_execution_timestamp_is_preferred() {
        let store = Arc::new(ScriptedStore::with_terminal(terminal_event(
            1,
            Some("2026-05-30T08:15:00+00:00"),
        )));
        let gate = TerminationGate::new(store);

        let ts = gate.termination_timestamp().unwrap().unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2026, 5, 30, 8, 15, 0).unwrap());
    }

    #[test]
    fn falls_back_to_local_timestamp() {
        let store = Arc::new(ScriptedStore::with_terminal(terminal_event(1, None)));
        let gate = TerminationGate::new(store);

        let ts = gate.termination_timestamp().unwrap().unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap());
    }

    /// A query failure propagates — it is never read as "not terminated".
    #[test]
    fn query_failure_propagates() {
        let store = Arc::new(ScriptedStore::empty());
        store.failing.store(true, Ordering::SeqCst);
        let gate = TerminationGate::new(store.clone());

        let err = gate.is_system_terminated().unwrap_err();
        assert!(matches!(err, CustodiaError::Storage { .. }));

        let err = gate.check_terminated().unwrap_err();
        assert!(matches!(err, CustodiaError::Storage { .. }));

        // Once the store recovers, detection proceeds normally.
        store.failing.store(false, Ordering::SeqCst);
        store
            .terminal_events
            .lock()
            .unwrap()
            .push(terminal_event(5, None));
        assert!(gate.is_system_terminated().unwrap());
    }
}
