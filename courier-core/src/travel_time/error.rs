use thiserror::Error;

/// Errors from [`crate::TravelTimeEstimator::estimate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TravelTimeError {
    /// Origin or destination was blank.
    #[error("origin and destination must not be empty")]
    EmptyInput,
    /// The service answered but found no driving route.
    #[error("no route from {origin:?} to {destination:?}")]
    NoRoute {
        /// Origin address.
        origin: String,
        /// Destination address.
        destination: String,
    },
    /// The request did not complete in time.
    #[error("directions request to {endpoint} timed out after {timeout_secs}s")]
    Timeout {
        /// Service endpoint, without credentials.
        endpoint: String,
        /// Configured timeout.
        timeout_secs: u64,
    },
    /// The service responded with a non-success HTTP status.
    #[error("directions request to {endpoint} failed with HTTP {status}: {message}")]
    HttpError {
        /// Service endpoint, without credentials.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Error detail.
        message: String,
    },
    /// The service could not be reached.
    #[error("directions request to {endpoint} failed: {message}")]
    NetworkError {
        /// Service endpoint, without credentials.
        endpoint: String,
        /// Error detail.
        message: String,
    },
    /// The service reported an error status in its payload.
    #[error("directions service returned {code}: {message}")]
    ServiceError {
        /// Service status code, e.g. `REQUEST_DENIED`.
        code: String,
        /// Error detail supplied by the service.
        message: String,
    },
    /// The response could not be decoded.
    #[error("failed to parse directions response: {message}")]
    ParseError {
        /// Decoder detail.
        message: String,
    },
}

impl TravelTimeError {
    /// Whether the service itself worked and simply has no answer.
    ///
    /// Permanent errors do not count against a service's health; the planner
    /// treats them like an infeasible order rather than an outage.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::EmptyInput | Self::NoRoute { .. })
    }
}
