//! The three-channel emergency halt circuit.
//!
//! Channel 1 is the in-process flag: an atomic bool read on the hot path and
//! a mutex-guarded check-and-set on the trigger path.  Setting it alone
//! satisfies "the system is halted" — it has no external dependency and
//! cannot fail.  Channels 2 (pub/sub propagation) and 3 (durable ledger
//! recording) are best-effort: their failures are logged and swallowed,
//! never undoing or blocking channel 1.
//!
//! State machine: NOT_HALTED → HALTED, terminal for the process lifetime.
//! First trigger wins; later triggers and remote messages cannot overwrite
//! the recorded status.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, warn};

use custodia_contracts::{
    error::{CustodiaError, CustodiaResult},
    halt::{ChannelsReached, HaltExecution, HaltReason, HaltStatus},
};
use custodia_core::traits::{Clock, HaltCheck, HaltTransport};

use crate::recorder::HaltRecorder;

/// Pub/sub channel name for cross-process halt propagation.
pub const HALT_CHANNEL: &str = "custodia.halt";

/// Monitored latency budget for a complete halt trigger.  An overrun is
/// logged as a performance violation, not treated as a failure.
pub const HALT_LATENCY_BUDGET: Duration = Duration::from_millis(100);

/// The halt circuit.  One instance per process, passed by shared reference;
/// everything that performs I/O consults `is_halted` before the operation.
pub struct HaltCircuit {
    halted: AtomicBool,
    status: Mutex<HaltStatus>,
    transport: Option<Arc<dyn HaltTransport>>,
    recorder: Option<Arc<dyn HaltRecorder>>,
    clock: Arc<dyn Clock>,
}

impl HaltCircuit {
    /// Create a circuit with no external channels configured.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            halted: AtomicBool::new(false),
            status: Mutex::new(HaltStatus::not_halted()),
            transport: None,
            recorder: None,
            clock,
        }
    }

    /// Attach the cross-process propagation channel.
    pub fn with_transport(mut self, transport: Arc<dyn HaltTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Attach the durable ledger recording channel.
    pub fn with_recorder(mut self, recorder: Arc<dyn HaltRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    /// The sub-millisecond read path: one atomic load, no lock, no I/O.
    ///
    /// This is the only channel other components may depend on for
    /// correctness.
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    /// The full status currently in force.
    pub fn status(&self) -> HaltStatus {
        self.lock_status().clone()
    }

    /// Fail fast when halted; the error carries the full status.
    pub fn check_or_halted(&self) -> CustodiaResult<()> {
        if self.is_halted() {
            return Err(CustodiaError::Halted {
                status: self.status(),
            });
        }
        Ok(())
    }

    /// Run `op` only if the system is not halted.
    ///
    /// The automatic pre-I/O check for synchronous operations: wrap the
    /// operation and the halt check cannot be forgotten.
    pub fn guarded<T>(&self, op: impl FnOnce() -> CustodiaResult<T>) -> CustodiaResult<T> {
        self.check_or_halted()?;
        op()
    }

    /// The trigger path.
    ///
    /// Under one lock, check-and-set the local flag (first writer wins; a
    /// repeat trigger returns the original status unchanged).  Then, outside
    /// the lock, best-effort propagate on the transport and record to the
    /// ledger.  The returned telemetry carries real per-channel outcomes and
    /// the monotonic elapsed time for the whole path.
    pub fn trigger_halt(
        &self,
        reason: HaltReason,
        message: impl Into<String>,
        operator_id: Option<String>,
        trace_id: Option<String>,
    ) -> CustodiaResult<HaltExecution> {
        let start = self.clock.monotonic();
        let triggered_at = self.clock.now();

        let (status, already_halted) = {
            let mut guard = self.lock_status();
            if self.halted.load(Ordering::Acquire) {
                (guard.clone(), true)
            } else {
                // A blank message fails here, before the flag is touched.
                let status =
                    HaltStatus::halted(reason, message, operator_id, trace_id, triggered_at)?;
                *guard = status.clone();
                self.halted.store(true, Ordering::Release);
                (status, false)
            }
        };

        if already_halted {
            debug!(
                existing = %status,
                "halt trigger ignored: circuit already halted, first writer wins"
            );
            return Ok(HaltExecution {
                status,
                already_halted: true,
                triggered_at,
                completed_at: self.clock.now(),
                elapsed_ms: elapsed_ms(self.clock.monotonic(), start),
                channels_reached: ChannelsReached {
                    local: true,
                    transport: false,
                    ledger: false,
                },
            });
        }

        // Channel 2: cross-process propagation.  Failure is logged and
        // swallowed by design: the local halt is already in force.
        let transport_reached = match &self.transport {
            Some(transport) => match serde_json::to_vec(&status) {
                Ok(wire) => match transport.publish(HALT_CHANNEL, &wire) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(error = %e, "halt transport publish failed; local halt unaffected");
                        false
                    }
                },
                Err(e) => {
                    warn!(error = %e, "halt status serialization failed; transport skipped");
                    false
                }
            },
            None => false,
        };

        // Channel 3: durable ledger recording.  Same policy as channel 2.
        let ledger_reached = match &self.recorder {
            Some(recorder) => match recorder.record_halt(&status) {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "halt ledger recording failed; local halt unaffected");
                    false
                }
            },
            None => false,
        };

        let elapsed = self
            .clock
            .monotonic()
            .saturating_duration_since(start);
        if elapsed > HALT_LATENCY_BUDGET {
            warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = HALT_LATENCY_BUDGET.as_millis() as u64,
                "halt trigger exceeded latency budget"
            );
        }

        Ok(HaltExecution {
            status,
            already_halted: false,
            triggered_at,
            completed_at: self.clock.now(),
            elapsed_ms: elapsed.as_millis() as u64,
            channels_reached: ChannelsReached {
                local: true,
                transport: transport_reached,
                ledger: ledger_reached,
            },
        })
    }

    /// Adopt a halt observed on the transport.
    ///
    /// A local halt always wins: if the flag is already set, the remote
    /// status is ignored — no downgrade, no overwrite of the earlier local
    /// reason.  A remote status that is not actually halted is ignored too.
    pub fn adopt_remote(&self, remote: HaltStatus) {
        if !remote.is_halted() {
            debug!("ignoring non-halted status received on halt channel");
            return;
        }

        let mut guard = self.lock_status();
        if self.halted.load(Ordering::Acquire) {
            debug!(
                local = %guard,
                "remote halt ignored: local halt already in force"
            );
            return;
        }
        *guard = remote;
        self.halted.store(true, Ordering::Release);
    }

    /// Decode and adopt a raw transport message.
    pub fn handle_transport_message(&self, payload: &[u8]) -> CustodiaResult<()> {
        let remote: HaltStatus =
            serde_json::from_slice(payload).map_err(|e| CustodiaError::Validation {
                reason: format!("malformed halt message: {}", e),
            })?;
        self.adopt_remote(remote);
        Ok(())
    }

    /// Reset to NOT_HALTED.  Test harnesses only — production code has no
    /// unhalt path through the circuit.
    #[doc(hidden)]
    pub fn reset_for_test(&self) {
        let mut guard = self.lock_status();
        *guard = HaltStatus::not_halted();
        self.halted.store(false, Ordering::Release);
    }

    fn lock_status(&self) -> MutexGuard<'_, HaltStatus> {
        // A poisoned status lock must not be able to mask or fail a halt;
        // the status value is always left consistent by this module.
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HaltCheck for HaltCircuit {
    fn is_halted(&self) -> bool {
        HaltCircuit::is_halted(self)
    }

    fn check_halted(&self) -> CustodiaResult<()> {
        self.check_or_halted()
    }
}

fn elapsed_ms(now: std::time::Instant, start: std::time::Instant) -> u64 {
    now.saturating_duration_since(start).as_millis() as u64
}

// ── Tests ─────────────────────────────────────────────────────────────────────
