//! Google Maps Geocoding and Directions adapters.
//!
//! [`GoogleGeocoder`] resolves addresses through the Geocoding API and
//! [`GoogleDirections`] estimates driving time through the Directions API.
//! Both share a [`GoogleMapsConfig`] and each owns its own `reqwest` client.
//!
//! # Example
//!
//! ```no_run
//! use std::time::{Duration, SystemTime};
//! use courier_core::{Geocoder, TravelTimeEstimator};
//! use courier_data::{GoogleDirections, GoogleGeocoder, GoogleMapsConfig};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GoogleMapsConfig::new("api-key").with_timeout(Duration::from_secs(5));
//! let geocoder = GoogleGeocoder::with_config(config.clone())?;
//! let directions = GoogleDirections::with_config(config)?;
//!
//! let depot = geocoder.resolve("198 Morris Rd, Schenectady, NY").await?;
//! let drive = directions
//!     .estimate("198 Morris Rd, Schenectady, NY", "1 State St, Albany, NY", SystemTime::now())
//!     .await?;
//! println!("depot at {depot:?}, {} minutes away", drive.as_secs() / 60);
//! # Ok(())
//! # }
//! ```

mod config;
mod directions;
mod geocoder;
mod response;

pub use config::{ClientBuildError, DEFAULT_USER_AGENT, GoogleMapsConfig};
pub use directions::GoogleDirections;
pub use geocoder::GoogleGeocoder;

/// Request failure shared by both adapters before it is mapped onto the
/// adapter's own error type.
#[derive(Debug)]
enum RequestFailure {
    Timeout,
    Http { status: u16, message: String },
    Network { message: String },
}

/// Classify a `reqwest` error, dropping the request URL so the API key in
/// its query string never reaches an error message.
fn classify_reqwest_error(error: reqwest::Error) -> RequestFailure {
    if error.is_timeout() {
        return RequestFailure::Timeout;
    }
    let status = error.status();
    let message = error.without_url().to_string();
    match status {
        Some(status) => RequestFailure::Http {
            status: status.as_u16(),
            message,
        },
        None => RequestFailure::Network { message },
    }
}

/// `scheme://host/path` of a request URL, without the query string.
fn redacted_endpoint(url: &url::Url) -> String {
    let mut endpoint = url.clone();
    endpoint.set_query(None);
    endpoint.to_string()
}
