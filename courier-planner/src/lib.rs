//! Cycle driver for the courier engine.
//!
//! The planner turns the ledger's pending orders into a [`CycleReport`]:
//! it resolves coordinates and travel times concurrently, defers or rejects
//! orders whose lookups fail, and hands the rest to
//! [`courier_core::assign`]. The [`Dispatcher`] wraps a planner and a
//! [`courier_core::Ledger`] behind a single async mutex and cancels any
//! in-flight cycle whenever the ledger changes.
//!
//! ```no_run
//! use std::time::Duration;
//! use courier_core::test_support::{StaticGeocoder, StaticTravelTimes};
//! use courier_core::{SlotKind, SlotLayout};
//! use courier_planner::{DepotSettings, Dispatcher, GreedyPlanner, PlannerConfig};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let depot = DepotSettings::new(
//!     "198 Morris Rd, Schenectady, NY",
//!     SlotLayout::new(SlotKind::Driver, 11)?,
//!     Duration::from_secs(2 * 60 * 60),
//! );
//! let planner = GreedyPlanner::new(
//!     StaticGeocoder::new(),
//!     StaticTravelTimes::new(),
//!     depot,
//!     PlannerConfig::default(),
//! );
//! let dispatcher = Dispatcher::new(planner);
//! dispatcher.submit("1 State St, Albany, NY").await?;
//! let report = dispatcher.run_cycle().await?;
//! println!("{} orders assigned", report.assignment.assigned_count());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

mod breaker;
mod cache;
mod config;
mod dispatcher;
mod error;
mod lookup;
mod planner;

pub use breaker::{BreakerState, CircuitBreaker};
pub use cache::{CoordinateCache, normalise_address};
pub use config::{
    DEFAULT_BREAKER_COOLDOWN, DEFAULT_BREAKER_THRESHOLD, DEFAULT_LOOKUP_TIMEOUT,
    DEFAULT_MAX_CONCURRENCY, DEFAULT_MAX_DEFERRALS, PlannerConfig,
};
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, PlanError};
pub use lookup::{LookupError, LookupService, Service};
pub use planner::{CycleReport, DepotSettings, GreedyPlanner, PendingCycle, RejectedOrder};
