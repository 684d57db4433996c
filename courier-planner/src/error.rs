//! Errors raised by planning cycles and the dispatcher.

use courier_core::LedgerError;
use thiserror::Error;

use crate::lookup::LookupError;

/// Failure of a whole planning cycle.
///
/// Per-order lookup failures never surface here; they are reported as
/// skipped or rejected orders in the cycle report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// The warehouse address did not resolve, so nothing can be scored.
    #[error("warehouse address {address:?} could not be resolved")]
    WarehouseUnresolvable {
        /// Configured warehouse address.
        address: String,
        /// Underlying lookup failure.
        #[source]
        source: LookupError,
    },
    /// The ledger changed while the cycle was running.
    #[error("cycle cancelled because the order ledger changed")]
    Cancelled,
}

/// Failure of a [`crate::Dispatcher`] operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The ledger refused the mutation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    /// The geocoder has no match for a submitted address.
    #[error("address {address:?} could not be geocoded")]
    Unresolvable {
        /// Address as submitted.
        address: String,
        /// Underlying lookup failure.
        #[source]
        source: LookupError,
    },
    /// The planning cycle failed.
    #[error(transparent)]
    Plan(#[from] PlanError),
}
