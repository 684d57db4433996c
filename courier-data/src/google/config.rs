//! Configuration and client construction for the Google Maps adapters.

use std::time::Duration;

use reqwest::Client;
use url::Url;

/// Default user agent for Google Maps requests.
pub const DEFAULT_USER_AGENT: &str = "courier-dispatch/0.1";

/// Geocoding API JSON endpoint.
pub const DEFAULT_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Directions API JSON endpoint.
pub const DEFAULT_DIRECTIONS_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Error type for adapter construction failures.
#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// A configured endpoint is not a valid absolute URL.
    #[error("invalid endpoint {url:?}: {source}")]
    InvalidUrl {
        /// The rejected endpoint.
        url: String,
        /// Parser detail.
        #[source]
        source: url::ParseError,
    },
}

/// Configuration shared by [`super::GoogleGeocoder`] and
/// [`super::GoogleDirections`].
#[derive(Clone)]
pub struct GoogleMapsConfig {
    /// API key sent with every request.
    pub api_key: String,
    /// Geocoding endpoint.
    pub geocode_url: String,
    /// Directions endpoint.
    pub directions_url: String,
    /// Request timeout duration.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl std::fmt::Debug for GoogleMapsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleMapsConfig")
            .field("api_key", &"<redacted>")
            .field("geocode_url", &self.geocode_url)
            .field("directions_url", &self.directions_url)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl Default for GoogleMapsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            geocode_url: DEFAULT_GEOCODE_URL.to_owned(),
            directions_url: DEFAULT_DIRECTIONS_URL.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl GoogleMapsConfig {
    /// Create a configuration for the public endpoints with the given key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Override the geocoding endpoint.
    #[must_use]
    pub fn with_geocode_url(mut self, url: impl Into<String>) -> Self {
        self.geocode_url = url.into();
        self
    }

    /// Override the directions endpoint.
    #[must_use]
    pub fn with_directions_url(mut self, url: impl Into<String>) -> Self {
        self.directions_url = url.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub(super) fn build_client(&self) -> Result<Client, ClientBuildError> {
        Client::builder()
            .user_agent(&self.user_agent)
            .connect_timeout(self.timeout)
            .timeout(self.timeout)
            .build()
            .map_err(ClientBuildError::HttpClient)
    }
}

pub(super) fn parse_endpoint(url: &str) -> Result<Url, ClientBuildError> {
    Url::parse(url).map_err(|source| ClientBuildError::InvalidUrl {
        url: url.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn config_builder_pattern() {
        let config = GoogleMapsConfig::new("key")
            .with_geocode_url("http://localhost:1/geocode")
            .with_directions_url("http://localhost:1/directions")
            .with_timeout(Duration::from_secs(3))
            .with_user_agent("test-agent/1.0");

        assert_eq!(config.api_key, "key");
        assert_eq!(config.geocode_url, "http://localhost:1/geocode");
        assert_eq!(config.directions_url, "http://localhost:1/directions");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.user_agent, "test-agent/1.0");
    }

    #[rstest]
    fn defaults_target_public_endpoints() {
        let config = GoogleMapsConfig::default();
        assert_eq!(config.geocode_url, DEFAULT_GEOCODE_URL);
        assert_eq!(config.directions_url, DEFAULT_DIRECTIONS_URL);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[rstest]
    fn debug_output_hides_api_key() {
        let rendered = format!("{:?}", GoogleMapsConfig::new("super-secret"));
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[rstest]
    fn rejects_relative_endpoint() {
        let err = parse_endpoint("maps/api/geocode/json").expect_err("relative URL");
        assert!(matches!(err, ClientBuildError::InvalidUrl { .. }));
    }

    #[rstest]
    fn invalid_endpoint_error_names_the_url_and_keeps_its_source() {
        use std::error::Error as _;

        let err = parse_endpoint("not a url").expect_err("relative URL");

        assert_eq!(
            err.to_string(),
            format!("invalid endpoint \"not a url\": {}", url::ParseError::RelativeUrlWithoutBase)
        );
        let source = err.source().expect("parse error is the source");
        assert_eq!(
            source.downcast_ref::<url::ParseError>(),
            Some(&url::ParseError::RelativeUrlWithoutBase)
        );
    }
}
