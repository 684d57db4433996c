//! Great-circle distances between coordinates.
//!
//! Coordinates follow the `geo` convention used throughout the crate:
//! `x` is longitude and `y` is latitude, both in degrees.

use geo::{Coord, Distance, Geodesic, Point};

/// Metres in one international mile.
pub const METRES_PER_MILE: f64 = 1_609.344;

/// Geodesic distance in miles between `from` and `to` on the WGS84 ellipsoid.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use courier_core::geodesic_miles;
///
/// let here = Coord { x: -73.94, y: 42.81 };
/// assert_eq!(geodesic_miles(here, here), 0.0);
/// ```
#[must_use]
pub fn geodesic_miles(from: Coord<f64>, to: Coord<f64>) -> f64 {
    Geodesic.distance(Point::from(from), Point::from(to)) / METRES_PER_MILE
}

/// Whether `coordinate` can take part in distance calculations.
#[must_use]
pub fn is_valid_coordinate(coordinate: Coord<f64>) -> bool {
    coordinate.x.is_finite()
        && coordinate.y.is_finite()
        && (-180.0..=180.0).contains(&coordinate.x)
        && (-90.0..=90.0).contains(&coordinate.y)
}
