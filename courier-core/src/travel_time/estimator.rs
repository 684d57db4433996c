//! Travel-time estimator trait.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;

use super::error::TravelTimeError;

/// Estimate the driving time between two addresses.
///
/// # Examples
///
/// ```
/// use std::time::{Duration, SystemTime};
/// use async_trait::async_trait;
/// use courier_core::{TravelTimeError, TravelTimeEstimator};
///
/// struct TenMinutes;
///
/// #[async_trait]
/// impl TravelTimeEstimator for TenMinutes {
///     async fn estimate(
///         &self,
///         origin: &str,
///         destination: &str,
///         _departure: SystemTime,
///     ) -> Result<Duration, TravelTimeError> {
///         if origin.trim().is_empty() || destination.trim().is_empty() {
///             return Err(TravelTimeError::EmptyInput);
///         }
///         Ok(Duration::from_secs(600))
///     }
/// }
/// ```
#[async_trait]
pub trait TravelTimeEstimator: Send + Sync {
    /// Estimate the driving time from `origin` to `destination` when leaving
    /// at `departure`.
    ///
    /// Implementations must return `Err(TravelTimeError::EmptyInput)` when
    /// either address is blank.
    async fn estimate(
        &self,
        origin: &str,
        destination: &str,
        departure: SystemTime,
    ) -> Result<Duration, TravelTimeError>;
}

#[async_trait]
impl<T: TravelTimeEstimator + ?Sized> TravelTimeEstimator for Arc<T> {
    async fn estimate(
        &self,
        origin: &str,
        destination: &str,
        departure: SystemTime,
    ) -> Result<Duration, TravelTimeError> {
        (**self).estimate(origin, destination, departure).await
    }
}
