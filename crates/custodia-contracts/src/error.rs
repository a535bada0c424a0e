//! Error taxonomy for the Custodia ledger core.
//!
//! All fallible operations in the core return `CustodiaResult<T>`.  The
//! variants are deliberately coarse-grained so callers can branch on the
//! *class* of failure: a `Halted` write may be retried after an external
//! unhalt, a `Terminated` write may never be retried, and `Channel` failures
//! are the only class the core itself absorbs (after logging).

use thiserror::Error;

use crate::halt::HaltStatus;

/// The unified error type for the Custodia core.
#[derive(Debug, Error)]
pub enum CustodiaError {
    /// An event field violated a construction invariant (missing witness,
    /// blank signature, malformed hash, non-canonical payload, ...).
    ///
    /// Always raised synchronously at construction, never deferred.
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    /// The hash chain is broken: a stored or supplied hash does not match
    /// what the chain engine recomputes.
    #[error("chain integrity violation at sequence {sequence}: expected {expected}, actual {actual}")]
    Integrity {
        sequence: u64,
        expected: String,
        actual: String,
    },

    /// An actor attempted an operation it is not permitted to perform.
    ///
    /// Always accompanied by a best-effort security notification before the
    /// error is returned.
    #[error("actor '{actor_id}' is not authorized: {reason}")]
    Unauthorized { actor_id: String, reason: String },

    /// A halt was requested with an empty or whitespace-only message.
    ///
    /// Applies to operator- and system-initiated halts alike.
    #[error("halt message is required and must not be blank")]
    MessageRequired,

    /// The system is halted; the gated operation was refused.
    ///
    /// Carries the full status so callers can surface reason, message, and
    /// timestamp. Resolves only through an explicit external unhalt.
    #[error("system is halted: {status}")]
    Halted { status: HaltStatus },

    /// The system has been permanently terminated; the gated operation was
    /// refused and can never succeed.
    ///
    /// This is the irreversibility violation: unlike `Halted`, there is no
    /// external action that resolves it.
    #[error("system permanently terminated (terminal event at sequence {terminal_sequence}); writes can never resume")]
    Terminated { terminal_sequence: u64 },

    /// An attempt was made to delete a ledger event.
    ///
    /// The ledger is append-only; delete always fails loudly rather than
    /// being silently ignored.
    #[error("ledger events are append-only; delete is a prohibited operation")]
    DeleteProhibited,

    /// The ledger store failed an operation (append, query, tip read).
    ///
    /// On the termination-gate query path this always propagates — a store
    /// failure is never interpreted as "not terminated".
    #[error("ledger store failure: {reason}")]
    Storage { reason: String },

    /// A best-effort halt propagation channel failed.
    ///
    /// Logged and swallowed by the halt circuit; surfaced only where a
    /// caller invokes a channel directly.
    #[error("halt channel '{channel}' failure: {reason}")]
    Channel { channel: String, reason: String },
}

/// Convenience alias used throughout the Custodia crates.
pub type CustodiaResult<T> = Result<T, CustodiaError>;
