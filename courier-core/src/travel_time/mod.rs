//! Estimate driving time between two addresses.
//!
//! The [`TravelTimeEstimator`] trait abstracts the directions service. The
//! planner queries it once per pending order per cycle, from the warehouse to
//! the order's address, at the cycle's departure instant.

mod error;
mod estimator;

pub use error::TravelTimeError;
pub use estimator::TravelTimeEstimator;
