//! # custodia-contracts
//!
//! Shared types, halt/termination state objects, and the error taxonomy for
//! the Custodia ledger core.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate — only data definitions, construction invariants, and error
//! types.

pub mod error;
pub mod event;
pub mod halt;
