//! `Geocoder` backed by the Google Maps Geocoding API.

use async_trait::async_trait;
use courier_core::{GeocodeError, Geocoder};
use geo::Coord;
use reqwest::Client;
use url::Url;

use super::config::{ClientBuildError, GoogleMapsConfig, parse_endpoint};
use super::response::{GeocodeResponse, is_ok};
use super::{RequestFailure, classify_reqwest_error, redacted_endpoint};

/// Geocoding adapter issuing one `GET` per lookup.
///
/// `ZERO_RESULTS` maps to [`GeocodeError::NotFound`]; every other non-`OK`
/// status maps to [`GeocodeError::ServiceError`].
#[derive(Debug, Clone)]
pub struct GoogleGeocoder {
    client: Client,
    config: GoogleMapsConfig,
    endpoint: Url,
}

impl GoogleGeocoder {
    /// Create a geocoder for the public endpoint with the given API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ClientBuildError> {
        Self::with_config(GoogleMapsConfig::new(api_key))
    }

    /// Create a geocoder with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build or the geocoding
    /// endpoint is not an absolute URL.
    pub fn with_config(config: GoogleMapsConfig) -> Result<Self, ClientBuildError> {
        let client = config.build_client()?;
        let endpoint = parse_endpoint(&config.geocode_url)?;
        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    fn request_url(&self, address: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("address", address)
            .append_pair("key", &self.config.api_key);
        url
    }

    fn convert_reqwest_error(&self, error: reqwest::Error) -> GeocodeError {
        let endpoint = redacted_endpoint(&self.endpoint);
        match classify_reqwest_error(error) {
            RequestFailure::Timeout => GeocodeError::Timeout {
                endpoint,
                timeout_secs: self.config.timeout.as_secs(),
            },
            RequestFailure::Http { status, message } => GeocodeError::HttpError {
                endpoint,
                status,
                message,
            },
            RequestFailure::Network { message } => GeocodeError::NetworkError { endpoint, message },
        }
    }
}

/// Convert a decoded geocoding response to a coordinate.
fn convert_response(address: &str, response: GeocodeResponse) -> Result<Coord<f64>, GeocodeError> {
    if response.status == "ZERO_RESULTS" {
        return Err(GeocodeError::NotFound {
            address: address.to_owned(),
        });
    }
    if !is_ok(&response.status) {
        return Err(GeocodeError::ServiceError {
            code: response.status,
            message: response.error_message.unwrap_or_default(),
        });
    }
    let location = response
        .results
        .first()
        .map(|result| result.geometry.location)
        .ok_or_else(|| GeocodeError::NotFound {
            address: address.to_owned(),
        })?;
    if !location.lat.is_finite() || !location.lng.is_finite() {
        return Err(GeocodeError::ParseError {
            message: format!("non-finite location {}, {}", location.lat, location.lng),
        });
    }
    Ok(Coord {
        x: location.lng,
        y: location.lat,
    })
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    async fn resolve(&self, address: &str) -> Result<Coord<f64>, GeocodeError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(GeocodeError::EmptyAddress);
        }

        let response = self
            .client
            .get(self.request_url(address))
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(err))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(err))?;

        let payload: GeocodeResponse =
            response
                .json()
                .await
                .map_err(|err| GeocodeError::ParseError {
                    message: err.without_url().to_string(),
                })?;

        let coordinate = convert_response(address, payload)?;
        log::debug!("geocoded {address:?} to {}, {}", coordinate.y, coordinate.x);
        Ok(coordinate)
    }
}
