//! Halt state value objects and trigger telemetry.
//!
//! `HaltStatus` is the single value object describing whether the system is
//! halted.  It is replaced wholesale on transition, never mutated
//! field-by-field — the fields are private and only the two constructors can
//! produce a value, which keeps the "present iff halted" invariant impossible
//! to violate from outside this module.
//!
//! The serde representation doubles as the wire format published on the
//! cross-process halt channel: a flat object with nulls for absent optionals
//! and RFC 3339 timestamps.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CustodiaError, CustodiaResult};

/// Why the system was halted.  Closed enumeration — there is no free-form
/// "other" reason; anything else is a `SystemFault`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaltReason {
    /// A human operator requested the halt.
    OperatorRequest,
    /// An internal fault (panic, invariant breach in supporting code).
    SystemFault,
    /// Hash-chain or event integrity violation detected.
    IntegrityViolation,
    /// Deliberation/consensus machinery failed.
    ConsensusFailure,
    /// A constitutional or policy rule was breached.
    ConstitutionalBreach,
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HaltReason::OperatorRequest => "operator_request",
            HaltReason::SystemFault => "system_fault",
            HaltReason::IntegrityViolation => "integrity_violation",
            HaltReason::ConsensusFailure => "consensus_failure",
            HaltReason::ConstitutionalBreach => "constitutional_breach",
        };
        f.write_str(s)
    }
}

/// The halt state of the system at a point in time.
///
/// Invariant: `halted_at`, `reason`, and `message` are all present iff
/// `is_halted` is true; `operator_id` is present only for operator-triggered
/// halts.  Enforced by the constructors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HaltStatus {
    is_halted: bool,
    halted_at: Option<DateTime<Utc>>,
    reason: Option<HaltReason>,
    operator_id: Option<String>,
    message: Option<String>,
    trace_id: Option<String>,
}

impl HaltStatus {
    /// The initial, not-halted state every process starts in.
    pub fn not_halted() -> Self {
        Self {
            is_halted: false,
            halted_at: None,
            reason: None,
            operator_id: None,
            message: None,
            trace_id: None,
        }
    }

    /// Construct a halted status.
    ///
    /// Returns `Err(MessageRequired)` if `message` is empty or
    /// whitespace-only — a halt with no explanation is not a valid halt.
    pub fn halted(
        reason: HaltReason,
        message: impl Into<String>,
        operator_id: Option<String>,
        trace_id: Option<String>,
        halted_at: DateTime<Utc>,
    ) -> CustodiaResult<Self> {
        let message = message.into();
        if message.trim().is_empty() {
            return Err(CustodiaError::MessageRequired);
        }

        Ok(Self {
            is_halted: true,
            halted_at: Some(halted_at),
            reason: Some(reason),
            operator_id,
            message: Some(message),
            trace_id,
        })
    }

    pub fn is_halted(&self) -> bool {
        self.is_halted
    }

    pub fn halted_at(&self) -> Option<DateTime<Utc>> {
        self.halted_at
    }

    pub fn reason(&self) -> Option<HaltReason> {
        self.reason
    }

    pub fn operator_id(&self) -> Option<&str> {
        self.operator_id.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn trace_id(&self) -> Option<&str> {
        self.trace_id.as_deref()
    }
}

impl fmt::Display for HaltStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_halted {
            return f.write_str("not halted");
        }
        write!(
            f,
            "halted at {} (reason: {}): {}",
            self.halted_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "<unknown>".to_string()),
            self.reason
                .map(|r| r.to_string())
                .unwrap_or_else(|| "<unknown>".to_string()),
            self.message.as_deref().unwrap_or("<no message>"),
        )
    }
}

/// Which of the three halt channels were actually reached by a trigger.
///
/// `local` is the only channel the halted/not-halted answer depends on;
/// `transport` and `ledger` reflect the real outcome of the best-effort
/// channels rather than an optimistic assumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelsReached {
    /// In-process atomic flag.  True whenever the trigger succeeded.
    pub local: bool,
    /// Cross-process pub/sub propagation.  False when no transport is
    /// configured or the publish failed.
    pub transport: bool,
    /// Durable ledger recording.  False when no recorder is configured or
    /// the append failed.
    pub ledger: bool,
}

/// Execution telemetry returned by a halt trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HaltExecution {
    /// The status in force after the trigger — the new status for a first
    /// trigger, the original status for a repeat trigger.
    pub status: HaltStatus,
    /// True when the circuit was already halted and this trigger was a no-op.
    pub already_halted: bool,
    /// Wall-clock time the trigger entered the circuit.
    pub triggered_at: DateTime<Utc>,
    /// Wall-clock time the trigger (including best-effort channels) returned.
    pub completed_at: DateTime<Utc>,
    /// Monotonic elapsed time for the whole trigger path, in milliseconds.
    pub elapsed_ms: u64,
    /// Per-channel outcome report.
    pub channels_reached: ChannelsReached,
}

/// Notifications emitted by the halt trigger orchestrator.
///
/// `Intent` is always emitted strictly before `Executed` for the same
/// trigger, so observers can detect an attempt even when execution fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HaltNotification {
    /// A halt is about to be triggered.
    Intent {
        reason: HaltReason,
        message: String,
        operator_id: Option<String>,
        trace_id: Option<String>,
        at: DateTime<Utc>,
    },
    /// The halt circuit call succeeded.
    Executed { execution: HaltExecution },
    /// The halt circuit call failed.  The original error is re-raised to the
    /// caller after this notification.
    Failed {
        reason: HaltReason,
        error: String,
        at: DateTime<Utc>,
    },
    /// An actor attempted an operator halt without authorization.
    UnauthorizedAttempt {
        actor_id: String,
        reason: HaltReason,
        at: DateTime<Utc>,
    },
}
