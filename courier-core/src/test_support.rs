//! Deterministic in-memory adapters used by unit and behaviour tests.
//!
//! These stand in for the geocoding and directions services so tests can fix
//! coordinates and travel times, inject failures, and count calls.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use geo::Coord;

use crate::{GeocodeError, Geocoder, TravelTimeError, TravelTimeEstimator};

/// `Geocoder` answering from a fixed table.
///
/// Unknown addresses resolve to [`GeocodeError::NotFound`]; addresses
/// registered with [`StaticGeocoder::with_failure`] return that error.
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    entries: HashMap<String, Result<Coord<f64>, GeocodeError>>,
    calls: Arc<AtomicUsize>,
}

impl StaticGeocoder {
    /// Create a geocoder with no known addresses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `address` to `coordinate`.
    #[must_use]
    pub fn with_address(mut self, address: &str, coordinate: Coord<f64>) -> Self {
        self.entries.insert(address.to_owned(), Ok(coordinate));
        self
    }

    /// Fail every lookup of `address` with `error`.
    #[must_use]
    pub fn with_failure(mut self, address: &str, error: GeocodeError) -> Self {
        self.entries.insert(address.to_owned(), Err(error));
        self
    }

    /// Number of `resolve` calls made so far, across clones.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn resolve(&self, address: &str) -> Result<Coord<f64>, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if address.trim().is_empty() {
            return Err(GeocodeError::EmptyAddress);
        }
        self.entries
            .get(address)
            .cloned()
            .unwrap_or_else(|| {
                Err(GeocodeError::NotFound {
                    address: address.to_owned(),
                })
            })
    }
}

/// `TravelTimeEstimator` answering from a fixed table keyed by
/// `(origin, destination)`.
///
/// Unknown pairs return [`TravelTimeError::NoRoute`].
#[derive(Debug, Clone, Default)]
pub struct StaticTravelTimes {
    entries: HashMap<(String, String), Result<Duration, TravelTimeError>>,
    calls: Arc<AtomicUsize>,
}

impl StaticTravelTimes {
    /// Create an estimator with no known routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `minutes` of driving from `origin` to `destination`.
    #[must_use]
    pub fn with_minutes(self, origin: &str, destination: &str, minutes: u64) -> Self {
        self.with_duration(origin, destination, Duration::from_secs(minutes * 60))
    }

    /// Report `duration` of driving from `origin` to `destination`.
    #[must_use]
    pub fn with_duration(mut self, origin: &str, destination: &str, duration: Duration) -> Self {
        self.entries
            .insert((origin.to_owned(), destination.to_owned()), Ok(duration));
        self
    }

    /// Fail every estimate from `origin` to `destination` with `error`.
    #[must_use]
    pub fn with_failure(mut self, origin: &str, destination: &str, error: TravelTimeError) -> Self {
        self.entries
            .insert((origin.to_owned(), destination.to_owned()), Err(error));
        self
    }

    /// Number of `estimate` calls made so far, across clones.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TravelTimeEstimator for StaticTravelTimes {
    async fn estimate(
        &self,
        origin: &str,
        destination: &str,
        _departure: SystemTime,
    ) -> Result<Duration, TravelTimeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if origin.trim().is_empty() || destination.trim().is_empty() {
            return Err(TravelTimeError::EmptyInput);
        }
        self.entries
            .get(&(origin.to_owned(), destination.to_owned()))
            .cloned()
            .unwrap_or_else(|| {
                Err(TravelTimeError::NoRoute {
                    origin: origin.to_owned(),
                    destination: destination.to_owned(),
                })
            })
    }
}
