//! Google Maps API response types.
//!
//! Only the fields the adapters read are modelled; everything else in the
//! payload is ignored.
//!
//! See: <https://developers.google.com/maps/documentation/geocoding/requests-geocoding>
//! and <https://developers.google.com/maps/documentation/directions/get-directions>

use serde::Deserialize;

/// Geocoding API response.
#[derive(Debug, Deserialize)]
pub struct GeocodeResponse {
    /// Status code, e.g. `"OK"`, `"ZERO_RESULTS"`, `"OVER_QUERY_LIMIT"`.
    pub status: String,
    /// Optional detail when `status` is not `"OK"`.
    pub error_message: Option<String>,
    /// Matches, best first.
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
}

/// One geocoding match.
#[derive(Debug, Deserialize)]
pub struct GeocodeResult {
    /// Geometry of the match.
    pub geometry: Geometry,
}

/// Geometry of a geocoding match.
#[derive(Debug, Deserialize)]
pub struct Geometry {
    /// Representative point.
    pub location: LatLng,
}

/// WGS84 point as Google encodes it.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LatLng {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

/// Directions API response.
#[derive(Debug, Deserialize)]
pub struct DirectionsResponse {
    /// Status code, e.g. `"OK"`, `"ZERO_RESULTS"`, `"NOT_FOUND"`.
    pub status: String,
    /// Optional detail when `status` is not `"OK"`.
    pub error_message: Option<String>,
    /// Candidate routes, recommended route first.
    #[serde(default)]
    pub routes: Vec<Route>,
}

/// One route between origin and destination.
#[derive(Debug, Deserialize)]
pub struct Route {
    /// Legs of the route; a request without waypoints has exactly one.
    #[serde(default)]
    pub legs: Vec<Leg>,
}

/// One leg of a route.
#[derive(Debug, Deserialize)]
pub struct Leg {
    /// Typical driving time for the leg.
    pub duration: TextValue,
}

/// A value with its human-readable rendering.
#[derive(Debug, Deserialize)]
pub struct TextValue {
    /// Value in the API's base unit (seconds for durations).
    pub value: f64,
}

/// Whether a `status` field reports success.
pub fn is_ok(status: &str) -> bool {
    status == "OK"
}
