//! Facade crate for the courier dispatch engine.
//!
//! This crate re-exports the core domain types and exposes the async planner
//! and the Google Maps adapters behind feature flags.

#![forbid(unsafe_code)]

pub use courier_core::{
    Assignment, AssignmentParams, Candidate, GeocodeError, Geocoder, Ledger, LedgerError, Order,
    OrderId, OrderStatus, RejectionReason, SkipReason, SkippedOrder, SlotAssignment, SlotKind,
    SlotLayout, SlotName, TravelTimeError, TravelTimeEstimator, assign, geodesic_miles,
};

#[cfg(feature = "planner")]
pub use courier_planner::{
    CycleReport, DepotSettings, DispatchError, Dispatcher, GreedyPlanner, PendingCycle,
    PlanError, PlannerConfig, RejectedOrder,
};

#[cfg(feature = "google-maps")]
pub use courier_data::{ClientBuildError, GoogleDirections, GoogleGeocoder, GoogleMapsConfig};
