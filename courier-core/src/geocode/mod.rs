//! Resolve postal addresses to coordinates.
//!
//! The [`Geocoder`] trait abstracts the geocoding service. The engine never
//! calls it directly; lookups happen in the planner, which caches results by
//! normalised address.

mod error;

pub use error::GeocodeError;

use std::sync::Arc;

use async_trait::async_trait;
use geo::Coord;

/// Resolve a postal address to a coordinate (`x` = longitude, `y` = latitude).
///
/// Implementations return [`GeocodeError::NotFound`] when the service answered
/// but had no match, and one of the transient variants when the service could
/// not be reached or misbehaved.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use geo::Coord;
/// use courier_core::{GeocodeError, Geocoder};
///
/// struct NullIsland;
///
/// #[async_trait]
/// impl Geocoder for NullIsland {
///     async fn resolve(&self, address: &str) -> Result<Coord<f64>, GeocodeError> {
///         if address.trim().is_empty() {
///             return Err(GeocodeError::EmptyAddress);
///         }
///         Ok(Coord { x: 0.0, y: 0.0 })
///     }
/// }
/// ```
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolve `address`.
    ///
    /// Implementations must return `Err(GeocodeError::EmptyAddress)` for a
    /// blank address without contacting the service.
    async fn resolve(&self, address: &str) -> Result<Coord<f64>, GeocodeError>;
}

#[async_trait]
impl<G: Geocoder + ?Sized> Geocoder for Arc<G> {
    async fn resolve(&self, address: &str) -> Result<Coord<f64>, GeocodeError> {
        (**self).resolve(address).await
    }
}
