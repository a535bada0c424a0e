//! # custodia-halt
//!
//! The emergency halt circuit, trigger orchestrator, and permanent
//! termination gate for the Custodia ledger core.
//!
//! ## Overview
//!
//! A halt is propagated over three independent channels: the in-process
//! atomic flag (authoritative, cannot fail), best-effort pub/sub
//! propagation, and best-effort durable ledger recording.  Termination is a
//! separate, permanent condition derived from a cessation event on the
//! chain; it outranks halt at the write gate and cannot be cleared within
//! a process once observed.
//!
//! ## Wiring
//!
//! ```rust,ignore
//! let circuit = Arc::new(
//!     HaltCircuit::new(clock.clone())
//!         .with_transport(transport)
//!         .with_recorder(Arc::new(LedgerHaltRecorder::new(store.clone(), identity, clock.clone()))),
//! );
//! let gate = Arc::new(TerminationGate::new(store.clone()));
//! let writer = GatedLedgerWriter::new(store, gate, circuit.clone(), clock);
//! ```

pub mod circuit;
pub mod orchestrator;
pub mod recorder;
pub mod termination;

pub use circuit::{HaltCircuit, HALT_CHANNEL, HALT_LATENCY_BUDGET};
pub use orchestrator::{HaltOrchestrator, HALT_ACTION};
pub use recorder::{HaltRecorder, LedgerHaltRecorder, RecorderIdentity, HALT_EVENT_TYPE};
pub use termination::{TerminationGate, EXECUTED_AT_FIELD, TERMINAL_FLAG_FIELD};

// ── Tests ─────────────────────────────────────────────────────────────────────
