//! Core trait definitions for the Custodia ledger core.
//!
//! These traits define the complete trust boundary of the core:
//!
//! - `LedgerStore`       — external persistence (append-only, order-preserving)
//! - `HaltTransport`     — best-effort cross-process halt propagation
//! - `PermissionGate`    — authorization for operator-initiated halts
//! - `Clock`             — wall-clock and monotonic time sources
//! - `HaltCheck`         — the sub-millisecond "may I write?" read path
//! - `TerminationCheck`  — the permanent-cessation read path
//! - `HaltNotifier`      — observer sink for halt intent/outcome notifications
//!
//! The write gate wires `TerminationCheck` and `HaltCheck` together in the
//! mandatory order; everything external to the core depends only on these
//! interfaces, never on concrete implementations.

use std::time::Instant;

use chrono::{DateTime, Utc};

use custodia_contracts::{
    error::{CustodiaError, CustodiaResult},
    event::LedgerEvent,
    halt::HaltNotification,
};

/// External persistence for the event chain.
///
/// Implementations must preserve insertion order and reject appends whose
/// sequence does not extend the current tip.  The runtime never modifies or
/// deletes records through this trait.
pub trait LedgerStore: Send + Sync {
    /// Append one event to the store.
    ///
    /// Implementations reject duplicate or out-of-order sequence numbers
    /// with `CustodiaError::Integrity`.
    fn append(&self, event: &LedgerEvent) -> CustodiaResult<()>;

    /// Return up to `limit` events of the given type, in insertion order.
    fn events_by_type(&self, event_type: &str, limit: usize) -> CustodiaResult<Vec<LedgerEvent>>;

    /// Return up to `limit` events whose payload has `field` equal to
    /// `value`, in insertion order.
    fn events_by_payload_field(
        &self,
        field: &str,
        value: &serde_json::Value,
        limit: usize,
    ) -> CustodiaResult<Vec<LedgerEvent>>;

    /// Return the event at the current chain tip, if any.
    fn latest_event(&self) -> CustodiaResult<Option<LedgerEvent>>;

    /// Delete is a prohibited operation on an append-only ledger.
    ///
    /// Provided so every store fails loudly and identically; implementations
    /// must not override this with anything that succeeds.
    fn delete(&self, _sequence: u64) -> CustodiaResult<()> {
        Err(CustodiaError::DeleteProhibited)
    }
}

/// Best-effort cross-process halt propagation (pub/sub).
///
/// `publish` is fire-and-forget: it may fail, and the halt circuit logs and
/// swallows that failure.  Subscription delivery is the transport's concern;
/// received messages are handed to the circuit's remote-ingestion path.
pub trait HaltTransport: Send + Sync {
    /// Publish raw bytes on the named channel.
    fn publish(&self, channel: &str, payload: &[u8]) -> CustodiaResult<()>;
}

/// Authorization check for operator-initiated halts.
pub trait PermissionGate: Send + Sync {
    /// Return true when `actor_id` may perform `action`.
    fn is_authorized(&self, actor_id: &str, action: &str) -> bool;
}

/// Wall-clock and monotonic time sources.
///
/// Elapsed-time measurement uses `monotonic()` so the halt latency budget is
/// unaffected by wall-clock adjustments.
pub trait Clock: Send + Sync {
    /// Current wall-clock time (UTC).
    fn now(&self) -> DateTime<Utc>;

    /// A monotonic instant for elapsed-time measurement.
    fn monotonic(&self) -> Instant;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn monotonic(&self) -> Instant {
        Instant::now()
    }
}

/// The halt read path every gated writer consults.
///
/// `is_halted` must touch only in-process state — no lock, no I/O — so the
/// check stays sub-millisecond.
pub trait HaltCheck: Send + Sync {
    /// True when the system is halted.
    fn is_halted(&self) -> bool;

    /// Return `Err(CustodiaError::Halted)` carrying the full status when the
    /// system is halted.
    fn check_halted(&self) -> CustodiaResult<()>;
}

/// The permanent-cessation read path.
///
/// A query failure propagates as an error — it is never interpreted as
/// "not terminated".
pub trait TerminationCheck: Send + Sync {
    /// Return `Err(CustodiaError::Terminated)` carrying the terminal
    /// sequence number when a cessation event has been recorded.
    fn check_terminated(&self) -> CustodiaResult<()>;
}

/// Observer sink for halt trigger notifications.
///
/// The orchestrator emits `Intent` strictly before `Executed`; notifier
/// failures are logged and never mask the trigger outcome.
pub trait HaltNotifier: Send + Sync {
    /// Deliver one notification.
    fn notify(&self, notification: &HaltNotification) -> CustodiaResult<()>;
}
