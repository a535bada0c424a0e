//! # custodia-core
//!
//! Trait seams for the Custodia ledger core.
//!
//! This crate provides:
//! - The external-collaborator traits (`LedgerStore`, `HaltTransport`,
//!   `PermissionGate`, `Clock`)
//! - The in-core check seams (`HaltCheck`, `TerminationCheck`, `HaltNotifier`)
//! - `SystemClock`, the default `Clock` implementation
//!
//! ## Usage
//!
//! ```rust,ignore
//! use custodia_core::traits::{Clock, HaltCheck, LedgerStore, SystemClock};
//! ```

pub mod traits;

pub use traits::SystemClock;

#[cfg(test)]
mod tests {
    use custodia_contracts::error::CustodiaError;

    use crate::traits::{Clock, LedgerStore, SystemClock};

    use custodia_contracts::{error::CustodiaResult, event::LedgerEvent};

    /// A store that implements only the required methods, to exercise the
    /// provided `delete`.
    struct NullStore;

    impl LedgerStore for NullStore {
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
            _field: &str,
            _value: &serde_json::Value,
            _limit: usize,
        ) -> CustodiaResult<Vec<LedgerEvent>> {
            Ok(vec![])
        }

        fn latest_event(&self) -> CustodiaResult<Option<LedgerEvent>> {
            Ok(None)
        }
    }

    #[test]
    fn delete_always_fails_loudly() {
        let store = NullStore;
        let result = store.delete(1);
        assert!(matches!(result, Err(CustodiaError::DeleteProhibited)));
    }

    #[test]
    fn system_clock_monotonic_never_goes_backwards() {
        let clock = SystemClock;
        let a = clock.monotonic();
        let b = clock.monotonic();
        assert!(b >= a);
    }
}
