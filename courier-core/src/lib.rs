//! Core domain types for the courier engine.
//!
//! Responsibilities:
//! - Model orders, slots and the [`Ledger`] that tracks their lifecycle.
//! - Provide the greedy [`assign`] heuristic and the [`geodesic_miles`] metric
//!   it scores with.
//! - Define the [`Geocoder`] and [`TravelTimeEstimator`] boundaries that
//!   adapter crates implement.
//!
//! Boundaries:
//! - No I/O. Lookups, caching and concurrency live in `courier-planner`;
//!   HTTP adapters live in `courier-data`.
//!
//! Mutating constructors and ledger operations return `Result` so invalid
//! input is surfaced early rather than silently dropped.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod assign;
pub mod distance;
pub mod geocode;
pub mod ledger;
pub mod order;
pub mod slot;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod travel_time;

pub use assign::{
    Assignment, AssignmentParams, Candidate, SkipReason, SkippedOrder, SlotAssignment, assign,
};
pub use distance::{METRES_PER_MILE, geodesic_miles, is_valid_coordinate};
pub use geocode::{GeocodeError, Geocoder};
pub use ledger::{Ledger, LedgerError, OrderStatus, RejectionReason};
pub use order::{Order, OrderId};
pub use slot::{LayoutError, ParseSlotKindError, SlotKind, SlotLayout, SlotName};
pub use travel_time::{TravelTimeError, TravelTimeEstimator};
