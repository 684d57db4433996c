use thiserror::Error;

/// Errors from [`crate::Geocoder::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeocodeError {
    /// The address was blank.
    #[error("address must not be empty")]
    EmptyAddress,
    /// The service answered but found no match for the address.
    #[error("no coordinates found for {address:?}")]
    NotFound {
        /// Address as submitted.
        address: String,
    },
    /// The request did not complete in time.
    #[error("geocoding request to {endpoint} timed out after {timeout_secs}s")]
    Timeout {
        /// Service endpoint, without credentials.
        endpoint: String,
        /// Configured timeout.
        timeout_secs: u64,
    },
    /// The service responded with a non-success HTTP status.
    #[error("geocoding request to {endpoint} failed with HTTP {status}: {message}")]
    HttpError {
        /// Service endpoint, without credentials.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Error detail.
        message: String,
    },
    /// The service could not be reached.
    #[error("geocoding request to {endpoint} failed: {message}")]
    NetworkError {
        /// Service endpoint, without credentials.
        endpoint: String,
        /// Error detail.
        message: String,
    },
    /// The service reported an error status in its payload.
    #[error("geocoding service returned {code}: {message}")]
    ServiceError {
        /// Service status code, e.g. `OVER_QUERY_LIMIT`.
        code: String,
        /// Error detail supplied by the service.
        message: String,
    },
    /// The response could not be decoded.
    #[error("failed to parse geocoding response: {message}")]
    ParseError {
        /// Decoder detail.
        message: String,
    },
}

impl GeocodeError {
    /// Whether retrying the same address can never succeed.
    ///
    /// Only "no result" and blank input are permanent; every other variant
    /// describes a service problem that may clear on a later attempt.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::EmptyAddress | Self::NotFound { .. })
    }
}
