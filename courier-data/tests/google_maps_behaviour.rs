//! Behavioural tests for the Google Maps adapters.
//!
//! A local HTTP responder stands in for the Google endpoints so the full
//! request, decode and error-mapping path runs without network access.

mod support;

use std::cell::RefCell;
use std::time::{Duration, SystemTime};

use courier_core::{GeocodeError, Geocoder, TravelTimeError, TravelTimeEstimator};
use courier_data::{GoogleDirections, GoogleGeocoder, GoogleMapsConfig};
use geo::Coord;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use support::StubServer;
use tokio::runtime::Runtime;

const API_KEY: &str = "test-key-do-not-leak";
const WAREHOUSE: &str = "198 Morris Rd, Schenectady, NY";

struct ServiceWorld {
    runtime: Runtime,
    server: RefCell<Option<StubServer>>,
    geocoded: RefCell<Option<Result<Coord<f64>, GeocodeError>>>,
    estimated: RefCell<Option<Result<Duration, TravelTimeError>>>,
}

impl ServiceWorld {
    fn serve(&self, status: u16, body: &str) {
        self.server.replace(Some(StubServer::spawn(status, body)));
    }

    fn config(&self) -> GoogleMapsConfig {
        let server = self.server.borrow();
        let base = &server.as_ref().expect("server must be started").base_url;
        GoogleMapsConfig::new(API_KEY)
            .with_geocode_url(format!("{base}/maps/api/geocode/json"))
            .with_directions_url(format!("{base}/maps/api/directions/json"))
            .with_timeout(Duration::from_secs(5))
    }

    fn geocode_error(&self) -> GeocodeError {
        self.geocoded
            .borrow()
            .clone()
            .expect("geocode must have run")
            .expect_err("geocode should fail")
    }
}

#[fixture]
fn world() -> ServiceWorld {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("test runtime");
    ServiceWorld {
        runtime,
        server: RefCell::new(None),
        geocoded: RefCell::new(None),
        estimated: RefCell::new(None),
    }
}

// --- Given steps ---

#[given("a geocoding service that knows 198 Morris Rd")]
fn geocoder_knows_address(world: &ServiceWorld) {
    world.serve(
        200,
        r#"{"status":"OK","results":[{"geometry":{"location":{"lat":42.79,"lng":-73.93}}}]}"#,
    );
}

#[given("a geocoding service with no match")]
fn geocoder_no_match(world: &ServiceWorld) {
    world.serve(200, r#"{"status":"ZERO_RESULTS","results":[]}"#);
}

#[given("a geocoding service over its query limit")]
fn geocoder_over_limit(world: &ServiceWorld) {
    world.serve(
        200,
        r#"{"status":"OVER_QUERY_LIMIT","error_message":"You have exceeded your daily request quota.","results":[]}"#,
    );
}

#[given("a geocoding service failing with HTTP 503")]
fn geocoder_unavailable(world: &ServiceWorld) {
    world.serve(503, r#"{"error":"unavailable"}"#);
}

#[given("a directions service reporting a 25 minute drive")]
fn directions_ok(world: &ServiceWorld) {
    world.serve(
        200,
        r#"{"status":"OK","routes":[{"legs":[{"duration":{"text":"25 mins","value":1500}}]}]}"#,
    );
}

#[given("a directions service with no route")]
fn directions_no_route(world: &ServiceWorld) {
    world.serve(200, r#"{"status":"ZERO_RESULTS","routes":[]}"#);
}

// --- When steps ---

#[when("198 Morris Rd is geocoded")]
fn geocode_warehouse(world: &ServiceWorld) {
    let geocoder = GoogleGeocoder::with_config(world.config()).expect("geocoder should build");
    let outcome = world.runtime.block_on(geocoder.resolve(WAREHOUSE));
    world.geocoded.replace(Some(outcome));
}

#[when("the drive to 1 Main St is estimated")]
fn estimate_drive(world: &ServiceWorld) {
    let directions =
        GoogleDirections::with_config(world.config()).expect("estimator should build");
    let outcome = world.runtime.block_on(directions.estimate(
        WAREHOUSE,
        "1 Main St, Albany, NY",
        SystemTime::now(),
    ));
    world.estimated.replace(Some(outcome));
}

// --- Then steps ---

#[then("the coordinate is longitude -73.93 latitude 42.79")]
fn then_coordinate(world: &ServiceWorld) {
    let outcome = world.geocoded.borrow().clone().expect("geocode must have run");
    assert_eq!(outcome, Ok(Coord { x: -73.93, y: 42.79 }));
}

#[then("the address is reported as not found")]
fn then_not_found(world: &ServiceWorld) {
    let err = world.geocode_error();
    assert!(err.is_permanent(), "expected permanent failure, got {err:?}");
    assert!(matches!(err, GeocodeError::NotFound { .. }));
}

#[then("a service error OVER_QUERY_LIMIT is reported")]
fn then_service_error(world: &ServiceWorld) {
    let err = world.geocode_error();
    assert!(!err.is_permanent());
    match err {
        GeocodeError::ServiceError { code, message } => {
            assert_eq!(code, "OVER_QUERY_LIMIT");
            assert!(message.contains("quota"));
        }
        other => panic!("expected ServiceError, got {other:?}"),
    }
}

#[then("an HTTP 503 error is reported without the API key")]
fn then_http_error(world: &ServiceWorld) {
    let err = world.geocode_error();
    assert!(matches!(err, GeocodeError::HttpError { status: 503, .. }));
    assert!(
        !err.to_string().contains(API_KEY),
        "error message leaked the API key: {err}"
    );
}

#[then("the estimate is 25 minutes")]
fn then_estimate(world: &ServiceWorld) {
    let outcome = world.estimated.borrow().clone().expect("estimate must have run");
    assert_eq!(outcome, Ok(Duration::from_secs(25 * 60)));
}

#[then("the request asked for a driving route")]
fn then_driving(world: &ServiceWorld) {
    let server = world.server.borrow();
    let requests = server.as_ref().expect("server must be started").requests();
    let request = requests.first().expect("one request recorded");
    assert!(request.starts_with("GET /maps/api/directions/json?"));
    assert!(request.contains("mode=driving"));
    assert!(request.contains("departure_time=now"));
}

#[then("no route is reported")]
fn then_no_route(world: &ServiceWorld) {
    let outcome = world.estimated.borrow().clone().expect("estimate must have run");
    assert!(matches!(outcome, Err(TravelTimeError::NoRoute { .. })));
}

// --- Scenario registrations ---

macro_rules! register_scenario {
    ($fn_name:ident, $title:literal) => {
        #[scenario(path = "tests/features/google_maps.feature", name = $title)]
        fn $fn_name(world: ServiceWorld) {
            let _ = world;
        }
    };
}

register_scenario!(resolving_known_address, "resolving a known address");
register_scenario!(address_without_match, "an address with no match");
register_scenario!(geocoder_over_quota, "a geocoding service over its quota");
register_scenario!(
    geocoder_http_failure,
    "a geocoding service failing at the HTTP layer"
);
register_scenario!(estimating_a_drive, "estimating a drive");
register_scenario!(destination_without_route, "a destination with no route");
