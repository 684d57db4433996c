//! Guarded access to the geocoder and travel-time estimator.
//!
//! Each call is bounded by the configured timeout and passes through the
//! service's [`CircuitBreaker`]. Geocoding results are cached by normalised
//! address. Permanent "no result" answers count as the service being
//! healthy; only transient failures feed the breaker.

use std::fmt;
use std::future::Future;
use std::time::{Duration, SystemTime};

use courier_core::{GeocodeError, Geocoder, TravelTimeError, TravelTimeEstimator};
use geo::Coord;
use thiserror::Error;

use crate::breaker::{BreakerState, CircuitBreaker};
use crate::cache::CoordinateCache;
use crate::config::PlannerConfig;

/// External service a lookup was addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// Address to coordinate resolution.
    Geocoder,
    /// Driving-time estimation.
    Directions,
}

impl Service {
    const fn name(self) -> &'static str {
        match self {
            Self::Geocoder => "geocoder",
            Self::Directions => "directions",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Failure of a guarded lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The geocoder answered with an error.
    #[error(transparent)]
    Geocode(#[from] GeocodeError),
    /// The directions service answered with an error.
    #[error(transparent)]
    TravelTime(#[from] TravelTimeError),
    /// The service's breaker is open; no call was made.
    #[error("{service} circuit is open; call skipped")]
    CircuitOpen {
        /// Service whose breaker refused the call.
        service: Service,
    },
    /// The call did not finish within the configured timeout.
    #[error("{service} call timed out after {timeout:?}")]
    TimedOut {
        /// Service that was called.
        service: Service,
        /// Configured timeout.
        timeout: Duration,
    },
}

impl LookupError {
    /// Whether retrying on a later cycle can never succeed.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        match self {
            Self::Geocode(err) => err.is_permanent(),
            Self::TravelTime(err) => err.is_permanent(),
            Self::CircuitOpen { .. } | Self::TimedOut { .. } => false,
        }
    }
}

/// Geocoder and estimator behind timeouts, breakers and a coordinate cache.
#[derive(Debug)]
pub struct LookupService<G, T> {
    geocoder: G,
    estimator: T,
    cache: CoordinateCache,
    geocoder_breaker: CircuitBreaker,
    directions_breaker: CircuitBreaker,
    timeout: Duration,
}

impl<G, T> LookupService<G, T>
where
    G: Geocoder,
    T: TravelTimeEstimator,
{
    /// Wrap `geocoder` and `estimator`, caching coordinates in `cache`.
    #[must_use]
    pub fn new(geocoder: G, estimator: T, cache: CoordinateCache, config: &PlannerConfig) -> Self {
        let breaker = |service: Service| {
            CircuitBreaker::new(
                service.name(),
                config.breaker_threshold(),
                config.breaker_cooldown(),
            )
        };
        Self {
            geocoder,
            estimator,
            cache,
            geocoder_breaker: breaker(Service::Geocoder),
            directions_breaker: breaker(Service::Directions),
            timeout: config.lookup_timeout(),
        }
    }

    /// Shared coordinate cache.
    #[must_use]
    pub const fn cache(&self) -> &CoordinateCache {
        &self.cache
    }

    /// State of the breaker guarding `service`.
    #[must_use]
    pub fn breaker_state(&self, service: Service) -> BreakerState {
        self.breaker(service).state()
    }

    /// Resolve `address`, answering from the cache when possible.
    ///
    /// # Errors
    ///
    /// Returns the geocoder's error, [`LookupError::TimedOut`] or
    /// [`LookupError::CircuitOpen`].
    pub async fn coordinate(&self, address: &str) -> Result<Coord<f64>, LookupError> {
        if let Some(cached) = self.cache.get(address) {
            return Ok(cached);
        }
        let coordinate = self
            .guarded(Service::Geocoder, self.geocoder.resolve(address))
            .await?;
        self.cache.insert(address, coordinate);
        Ok(coordinate)
    }

    /// Driving time from `origin` to `destination` leaving at `departure`.
    ///
    /// # Errors
    ///
    /// Returns the estimator's error, [`LookupError::TimedOut`] or
    /// [`LookupError::CircuitOpen`].
    pub async fn travel_time(
        &self,
        origin: &str,
        destination: &str,
        departure: SystemTime,
    ) -> Result<Duration, LookupError> {
        self.guarded(
            Service::Directions,
            self.estimator.estimate(origin, destination, departure),
        )
        .await
    }

    async fn guarded<V, E>(
        &self,
        service: Service,
        call: impl Future<Output = Result<V, E>>,
    ) -> Result<V, LookupError>
    where
        E: Into<LookupError>,
    {
        let breaker = self.breaker(service);
        if !breaker.try_acquire() {
            return Err(LookupError::CircuitOpen { service });
        }
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => {
                breaker.record_success();
                Ok(value)
            }
            Ok(Err(source)) => {
                let err: LookupError = source.into();
                if err.is_permanent() {
                    breaker.record_success();
                } else {
                    breaker.record_failure();
                }
                Err(err)
            }
            Err(_elapsed) => {
                breaker.record_failure();
                Err(LookupError::TimedOut {
                    service,
                    timeout: self.timeout,
                })
            }
        }
    }

    const fn breaker(&self, service: Service) -> &CircuitBreaker {
        match service {
            Service::Geocoder => &self.geocoder_breaker,
            Service::Directions => &self.directions_breaker,
        }
    }
}

#[cfg(test)]
#[expect(
    clippy::expect_used,
    reason = "tests fail fast on lookups that are known to fail"
)]
mod tests {
    use super::*;
    use courier_core::test_support::{StaticGeocoder, StaticTravelTimes};
    use rstest::{fixture, rstest};

    const DEPOT: Coord<f64> = Coord { x: -73.93, y: 42.79 };

    fn unavailable() -> GeocodeError {
        GeocodeError::NetworkError {
            endpoint: "http://geo.test".into(),
            message: "connection refused".into(),
        }
    }

    #[fixture]
    fn config() -> PlannerConfig {
        PlannerConfig::default().with_breaker_threshold(2)
    }

    #[rstest]
    #[tokio::test]
    async fn caches_coordinates_by_normalised_address(config: PlannerConfig) {
        let geocoder = StaticGeocoder::new().with_address("198 Morris Rd", DEPOT);
        let lookups = LookupService::new(
            geocoder.clone(),
            StaticTravelTimes::new(),
            CoordinateCache::new(),
            &config,
        );

        assert_eq!(lookups.coordinate("198 Morris Rd").await, Ok(DEPOT));
        assert_eq!(lookups.coordinate(" 198 MORRIS  rd").await, Ok(DEPOT));
        assert_eq!(geocoder.calls(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn not_found_is_permanent_and_keeps_breaker_closed(config: PlannerConfig) {
        let lookups = LookupService::new(
            StaticGeocoder::new(),
            StaticTravelTimes::new(),
            CoordinateCache::new(),
            &config,
        );

        for _ in 0..3 {
            let err = lookups.coordinate("nowhere").await.expect_err("unknown");
            assert!(err.is_permanent());
        }
        assert_eq!(lookups.breaker_state(Service::Geocoder), BreakerState::Closed);
    }

    #[rstest]
    #[tokio::test]
    async fn transient_failures_open_the_breaker(config: PlannerConfig) {
        let geocoder = StaticGeocoder::new().with_failure("a", unavailable());
        let lookups = LookupService::new(
            geocoder.clone(),
            StaticTravelTimes::new(),
            CoordinateCache::new(),
            &config,
        );

        for _ in 0..2 {
            let err = lookups.coordinate("a").await.expect_err("configured failure");
            assert!(matches!(err, LookupError::Geocode(GeocodeError::NetworkError { .. })));
        }
        assert_eq!(
            lookups.coordinate("a").await,
            Err(LookupError::CircuitOpen {
                service: Service::Geocoder
            })
        );
        assert_eq!(geocoder.calls(), 2, "open breaker must not call the service");
        assert_eq!(lookups.breaker_state(Service::Directions), BreakerState::Closed);
    }

    #[rstest]
    #[tokio::test]
    async fn travel_time_passes_through(config: PlannerConfig) {
        let lookups = LookupService::new(
            StaticGeocoder::new(),
            StaticTravelTimes::new().with_minutes("depot", "a", 7),
            CoordinateCache::new(),
            &config,
        );

        assert_eq!(
            lookups.travel_time("depot", "a", SystemTime::now()).await,
            Ok(Duration::from_secs(7 * 60))
        );
        let err = lookups
            .travel_time("depot", "b", SystemTime::now())
            .await
            .expect_err("no route");
        assert!(err.is_permanent());
    }
}
