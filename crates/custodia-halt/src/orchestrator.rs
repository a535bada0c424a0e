//! Halt trigger orchestration: authorization, intent/outcome notifications,
//! and the call into the circuit.
//!
//! Two entry points: `trigger_halt_authorized` for operator-initiated halts
//! (authorization enforced) and `trigger_halt_system` for internally
//! detected faults (no authorization — a fault handler must never be blocked
//! by a permission lookup).  Both emit an `Intent` notification strictly
//! before calling the circuit, so observers see the attempt even when the
//! circuit call fails.

use std::sync::Arc;

use tracing::{info, warn};

use custodia_contracts::{
    error::{CustodiaError, CustodiaResult},
    halt::{HaltExecution, HaltNotification, HaltReason},
};
use custodia_core::traits::{Clock, HaltNotifier, PermissionGate};

use crate::circuit::HaltCircuit;

/// Permission action name checked for operator-initiated halts.
pub const HALT_ACTION: &str = "trigger_halt";

/// Coordinates halt triggers: permission check, notifications, circuit call.
pub struct HaltOrchestrator {
    circuit: Arc<HaltCircuit>,
    permissions: Arc<dyn PermissionGate>,
    notifier: Arc<dyn HaltNotifier>,
    clock: Arc<dyn Clock>,
}

impl HaltOrchestrator {
    pub fn new(
        circuit: Arc<HaltCircuit>,
        permissions: Arc<dyn PermissionGate>,
        notifier: Arc<dyn HaltNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            circuit,
            permissions,
            notifier,
            clock,
        }
    }

    /// Trigger an operator-initiated halt.
    ///
    /// The operator must be authorized for `trigger_halt`.  An unauthorized
    /// attempt emits an `UnauthorizedAttempt` notification and returns
    /// `Err(Unauthorized)` without touching the circuit.
    pub fn trigger_halt_authorized(
        &self,
        operator_id: &str,
        reason: HaltReason,
        message: impl Into<String>,
        trace_id: Option<String>,
    ) -> CustodiaResult<HaltExecution> {
        let message = require_message(message)?;

        if !self.permissions.is_authorized(operator_id, HALT_ACTION) {
            warn!(
                operator_id,
                reason = %reason,
                "unauthorized halt attempt rejected"
            );
            self.emit(&HaltNotification::UnauthorizedAttempt {
                actor_id: operator_id.to_string(),
                reason,
                at: self.clock.now(),
            });
            return Err(CustodiaError::Unauthorized {
                actor_id: operator_id.to_string(),
                reason: format!("not authorized for action '{}'", HALT_ACTION),
            });
        }

        info!(operator_id, reason = %reason, "operator halt authorized");
        self.execute(reason, message, Some(operator_id.to_string()), trace_id)
    }

    /// Trigger a system-initiated halt.
    ///
    /// No authorization: internal fault detection must always be able to
    /// halt the system.
    pub fn trigger_halt_system(
        &self,
        reason: HaltReason,
        message: impl Into<String>,
        trace_id: Option<String>,
    ) -> CustodiaResult<HaltExecution> {
        let message = require_message(message)?;
        info!(reason = %reason, "system halt requested");
        self.execute(reason, message, None, trace_id)
    }

    fn execute(
        &self,
        reason: HaltReason,
        message: String,
        operator_id: Option<String>,
        trace_id: Option<String>,
    ) -> CustodiaResult<HaltExecution> {
        self.emit(&HaltNotification::Intent {
            reason,
            message: message.clone(),
            operator_id: operator_id.clone(),
            trace_id: trace_id.clone(),
            at: self.clock.now(),
        });

        match self
            .circuit
            .trigger_halt(reason, message, operator_id, trace_id)
        {
            Ok(execution) => {
                self.emit(&HaltNotification::Executed {
                    execution: execution.clone(),
                });
                Ok(execution)
            }
            Err(e) => {
                self.emit(&HaltNotification::Failed {
                    reason,
                    error: e.to_string(),
                    at: self.clock.now(),
                });
                Err(e)
            }
        }
    }

    fn emit(&self, notification: &HaltNotification) {
        // Notifier failures are logged and discarded: a broken observer
        // must never change the outcome of a halt trigger.
        if let Err(e) = self.notifier.notify(notification) {
            warn!(error = %e, "halt notification delivery failed");
        }
    }
}

/// Reject blank messages before any notification is emitted.
fn require_message(message: impl Into<String>) -> CustodiaResult<String> {
    let message = message.into();
    if message.trim().is_empty() {
        return Err(CustodiaError::MessageRequired);
    }
    Ok(message)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use custodia_core::traits::SystemClock;

    use super::*;

    struct AllowAll;

    impl PermissionGate for AllowAll {
        fn is_authorized(&self, _actor_id: &str, _action: &str) -> bool {
            true
        }
    }

    struct DenyAll;

    impl PermissionGate for DenyAll {
        fn is_authorized(&self, _actor_id: &str, _action: &str) -> bool {
            false
        }
    }

    struct CollectingNotifier {
        seen: Mutex<Vec<HaltNotification>>,
    }

    impl CollectingNotifier {
        fn new() -> Self {
            Self {
                seen: Mutex::new(vec![]),
            }
        }

        fn kinds(&self) -> Vec<&'static str> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .map(|n| match n {
                    HaltNotification::Intent { .. } => "intent",
                    HaltNotification::Executed { .. } => "executed",
                    HaltNotification::Failed { .. } => "failed",
                    HaltNotification::UnauthorizedAttempt { .. } => "unauthorized_attempt",
                })
                .collect()
        }
    }

    impl HaltNotifier for CollectingNotifier {
        fn notify(&self, notification: &HaltNotification) -> CustodiaResult<()> {
            self.seen.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    struct BrokenNotifier;

    impl HaltNotifier for BrokenNotifier {
        fn notify(&self, _notification: &HaltNotification) -> CustodiaResult<()> {
            Err(CustodiaError::Channel {
                channel: "notifications".to_string(),
                reason: "sink unavailable".to_string(),
            })
        }
    }

    fn orchestrator(
        permissions: Arc<dyn PermissionGate>,
        notifier: Arc<dyn HaltNotifier>,
    ) -> (HaltOrchestrator, Arc<HaltCircuit>) {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let circuit = Arc::new(HaltCircuit::new(clock.clone()));
        (
            HaltOrchestrator::new(circuit.clone(), permissions, notifier, clock),
            circuit,
        )
    }

    #[test]
    fn authorized_operator_halt_emits_intent_then_executed() {
        let notifier = Arc::new(CollectingNotifier::new());
        let (orchestrator, circuit) = orchestrator(Arc::new(AllowAll), notifier.clone());

        let execution = orchestrator
            .trigger_halt_authorized(
                "op-1",
                HaltReason::OperatorRequest,
                "manual stop",
                Some("trace-7".to_string()),
            )
            .unwrap();

        assert!(circuit.is_halted());
        assert!(!execution.already_halted);
        assert_eq!(execution.status.operator_id(), Some("op-1"));
        assert_eq!(notifier.kinds(), vec!["intent", "executed"]);

        let seen = notifier.seen.lock().unwrap();
        match &seen[0] {
            HaltNotification::Intent {
                reason,
                message,
                operator_id,
                trace_id,
                ..
            } => {
                assert_eq!(*reason, HaltReason::OperatorRequest);
                assert_eq!(message, "manual stop");
                assert_eq!(operator_id.as_deref(), Some("op-1"));
                assert_eq!(trace_id.as_deref(), Some("trace-7"));
            }
            other => panic!("expected Intent first, got {:?}", other),
        }
    }

    /// An unauthorized attempt never reaches the circuit and is reported to
    /// observers.
    #[test]
    fn unauthorized_operator_is_rejected_before_the_circuit() {
        let notifier = Arc::new(CollectingNotifier::new());
        let (orchestrator, circuit) = orchestrator(Arc::new(DenyAll), notifier.clone());

        let err = orchestrator
            .trigger_halt_authorized("intruder", HaltReason::OperatorRequest, "stop now", None)
            .unwrap_err();

        assert!(matches!(
            err,
            CustodiaError::Unauthorized { ref actor_id, .. } if actor_id == "intruder"
        ));
        assert!(!circuit.is_halted(), "circuit must stay not-halted");
        assert_eq!(notifier.kinds(), vec!["unauthorized_attempt"]);
    }

    /// System halts bypass the permission gate entirely.
    #[test]
    fn system_halt_needs_no_authorization() {
        let notifier = Arc::new(CollectingNotifier::new());
        let (orchestrator, circuit) = orchestrator(Arc::new(DenyAll), notifier.clone());

        let execution = orchestrator
            .trigger_halt_system(HaltReason::IntegrityViolation, "chain break at seq 42", None)
            .unwrap();

        assert!(circuit.is_halted());
        assert!(execution.status.operator_id().is_none());
        assert_eq!(notifier.kinds(), vec!["intent", "executed"]);
    }

    #[test]
    fn blank_message_is_rejected_with_no_notifications() {
        let notifier = Arc::new(CollectingNotifier::new());
        let (orchestrator, circuit) = orchestrator(Arc::new(AllowAll), notifier.clone());

        let err = orchestrator
            .trigger_halt_authorized("op-1", HaltReason::OperatorRequest, "   ", None)
            .unwrap_err();
        assert!(matches!(err, CustodiaError::MessageRequired));

        let err = orchestrator
            .trigger_halt_system(HaltReason::SystemFault, "", None)
            .unwrap_err();
        assert!(matches!(err, CustodiaError::MessageRequired));

        assert!(!circuit.is_halted());
        assert!(notifier.kinds().is_empty(), "no intent may be emitted");
    }

    #[test]
    fn repeat_trigger_reports_original_status() {
        let notifier = Arc::new(CollectingNotifier::new());
        let (orchestrator, _circuit) = orchestrator(Arc::new(AllowAll), notifier);

        let first = orchestrator
            .trigger_halt_authorized("op-1", HaltReason::OperatorRequest, "manual stop", None)
            .unwrap();
        let second = orchestrator
            .trigger_halt_system(HaltReason::SystemFault, "later fault", None)
            .unwrap();

        assert!(second.already_halted);
        assert_eq!(second.status, first.status);
        assert_eq!(
            second.status.reason(),
            Some(HaltReason::OperatorRequest),
            "first trigger's reason must stand"
        );
    }

    /// A broken notifier never changes the trigger outcome.
    #[test]
    fn notifier_failure_does_not_affect_the_halt() {
        let (orchestrator, circuit) = orchestrator(Arc::new(AllowAll), Arc::new(BrokenNotifier));

        let execution = orchestrator
            .trigger_halt_system(HaltReason::SystemFault, "fault", None)
            .unwrap();

        assert!(circuit.is_halted());
        assert!(execution.channels_reached.local);
    }
}
