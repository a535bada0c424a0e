//! # custodia-ledger
//!
//! Canonical codec, SHA-256 hash chain engine, event factory, and gated
//! writer for the Custodia ledger core.
//!
//! ## Overview
//!
//! Every governance state change is minted as a `LedgerEvent` whose content
//! hash commits to the canonical serialization of its content and whose
//! `prev_hash` links it to its predecessor.  Tampering with any event —
//! even a single byte — breaks the chain and is detected by `verify_chain`.
//! The `GatedLedgerWriter` enforces the mandatory termination-then-halt
//! check order in front of every append.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use custodia_ledger::{create_event, CreateEvent, InMemoryLedgerStore};
//!
//! let event = create_event(CreateEvent { /* ... */ })?;
//! store.append(&event)?;
//! store.verify_integrity()?;
//! ```

pub mod canonical;
pub mod chain;
pub mod factory;
pub mod memory;
pub mod writer;

pub use canonical::{canonical_bytes, canonical_string};
pub use chain::{
    compute_content_hash, prev_hash_for, verify_chain, EventContent, GENESIS_HASH,
    HASH_ALGORITHM_VERSION, SIGNATURE_ALGORITHM_VERSION,
};
pub use factory::{create_event, CreateEvent};
pub use memory::InMemoryLedgerStore;
pub use writer::{EventDraft, GatedLedgerWriter};

// ── Tests ─────────────────────────────────────────────────────────────────────
