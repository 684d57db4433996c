//! Service adapters for the courier engine.
//!
//! Responsibilities:
//! - Implement the [`courier_core::Geocoder`] and
//!   [`courier_core::TravelTimeEstimator`] boundaries over HTTP.
//! - Decode service payloads and map failures onto the core error enums.
//!
//! Boundaries:
//! - Do not encode dispatch rules (live in `courier-core`).
//! - Caching, retries and concurrency limits belong to `courier-planner`;
//!   adapters make exactly one request per call.
//!
//! Invariants:
//! - API keys never appear in error messages or logs.
//! - No global mutable state.

pub mod google;

pub use google::{
    ClientBuildError, DEFAULT_USER_AGENT, GoogleDirections, GoogleGeocoder, GoogleMapsConfig,
};
