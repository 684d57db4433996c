//! `TravelTimeEstimator` backed by the Google Maps Directions API.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use courier_core::{TravelTimeError, TravelTimeEstimator};
use reqwest::Client;
use url::Url;

use super::config::{ClientBuildError, GoogleMapsConfig, parse_endpoint};
use super::response::{DirectionsResponse, is_ok};
use super::{RequestFailure, classify_reqwest_error, redacted_endpoint};

/// Directions adapter requesting driving routes.
///
/// The duration of the first leg of the recommended route is reported.
/// `ZERO_RESULTS` and `NOT_FOUND` map to [`TravelTimeError::NoRoute`]; every
/// other non-`OK` status maps to [`TravelTimeError::ServiceError`].
#[derive(Debug, Clone)]
pub struct GoogleDirections {
    client: Client,
    config: GoogleMapsConfig,
    endpoint: Url,
}

impl GoogleDirections {
    /// Create an estimator for the public endpoint with the given API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ClientBuildError> {
        Self::with_config(GoogleMapsConfig::new(api_key))
    }

    /// Create an estimator with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build or the directions
    /// endpoint is not an absolute URL.
    pub fn with_config(config: GoogleMapsConfig) -> Result<Self, ClientBuildError> {
        let client = config.build_client()?;
        let endpoint = parse_endpoint(&config.directions_url)?;
        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    fn request_url(&self, origin: &str, destination: &str, departure: SystemTime) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("origin", origin)
            .append_pair("destination", destination)
            .append_pair("mode", "driving")
            .append_pair("departure_time", &departure_param(departure, SystemTime::now()))
            .append_pair("key", &self.config.api_key);
        url
    }

    fn convert_reqwest_error(&self, error: reqwest::Error) -> TravelTimeError {
        let endpoint = redacted_endpoint(&self.endpoint);
        match classify_reqwest_error(error) {
            RequestFailure::Timeout => TravelTimeError::Timeout {
                endpoint,
                timeout_secs: self.config.timeout.as_secs(),
            },
            RequestFailure::Http { status, message } => TravelTimeError::HttpError {
                endpoint,
                status,
                message,
            },
            RequestFailure::Network { message } => {
                TravelTimeError::NetworkError { endpoint, message }
            }
        }
    }
}

/// Google only accepts departure times that are not in the past; anything
/// at or before `now` is sent as `"now"`.
fn departure_param(departure: SystemTime, now: SystemTime) -> String {
    if departure <= now {
        return "now".to_owned();
    }
    departure
        .duration_since(UNIX_EPOCH)
        .map_or_else(|_| "now".to_owned(), |since| since.as_secs().to_string())
}

/// Convert a decoded directions response to a driving duration.
fn convert_response(
    origin: &str,
    destination: &str,
    response: DirectionsResponse,
) -> Result<Duration, TravelTimeError> {
    if matches!(response.status.as_str(), "ZERO_RESULTS" | "NOT_FOUND") {
        return Err(TravelTimeError::NoRoute {
            origin: origin.to_owned(),
            destination: destination.to_owned(),
        });
    }
    if !is_ok(&response.status) {
        return Err(TravelTimeError::ServiceError {
            code: response.status,
            message: response.error_message.unwrap_or_default(),
        });
    }

    let leg = response
        .routes
        .first()
        .and_then(|route| route.legs.first())
        .ok_or_else(|| TravelTimeError::NoRoute {
            origin: origin.to_owned(),
            destination: destination.to_owned(),
        })?;

    let seconds = leg.duration.value;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(TravelTimeError::ParseError {
            message: format!("invalid leg duration {seconds}"),
        });
    }
    Ok(Duration::from_secs_f64(seconds))
}

#[async_trait]
impl TravelTimeEstimator for GoogleDirections {
    async fn estimate(
        &self,
        origin: &str,
        destination: &str,
        departure: SystemTime,
    ) -> Result<Duration, TravelTimeError> {
        let (origin, destination) = (origin.trim(), destination.trim());
        if origin.is_empty() || destination.is_empty() {
            return Err(TravelTimeError::EmptyInput);
        }

        let response = self
            .client
            .get(self.request_url(origin, destination, departure))
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(err))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(err))?;

        let payload: DirectionsResponse =
            response
                .json()
                .await
                .map_err(|err| TravelTimeError::ParseError {
                    message: err.without_url().to_string(),
                })?;

        convert_response(origin, destination, payload)
    }
}
