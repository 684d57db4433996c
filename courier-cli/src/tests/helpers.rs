//! Test helpers for composing orders files and stub lookup services.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use courier_core::test_support::{StaticGeocoder, StaticTravelTimes};
use geo::Coord;
use tempfile::TempDir;

use crate::CliError;
use crate::assign::{AssignArgs, AssignConfig, DispatcherBuilder, SharedDispatcher, shared_dispatcher};

pub(super) const WAREHOUSE: &str = "depot";
pub(super) const API_KEY: &str = "test-key";

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    std::fs::write(path, contents).expect("write test file");
}

/// Temporary directory holding an `orders.json`.
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub(super) fn orders_path(&self) -> Utf8PathBuf {
        self.root.join("orders.json")
    }

    pub(super) fn write_orders(&self, addresses: &[&str]) -> Utf8PathBuf {
        let path = self.orders_path();
        let payload = serde_json::to_string(addresses).expect("serialise addresses");
        write_utf8(&path, payload.as_bytes());
        path
    }
}

/// Arguments naming every required option.
pub(super) fn complete_args(orders: Utf8PathBuf) -> AssignArgs {
    AssignArgs {
        orders: Some(orders),
        warehouse_address: Some(WAREHOUSE.to_owned()),
        google_api_key: Some(API_KEY.to_owned()),
        ..AssignArgs::default()
    }
}

/// Builds dispatchers over fixed coordinates and travel times.
#[derive(Debug, Clone)]
pub(super) struct StubDispatcherBuilder {
    geocoder: StaticGeocoder,
    travel: StaticTravelTimes,
}

impl StubDispatcherBuilder {
    pub(super) fn new() -> Self {
        let geocoder = StaticGeocoder::new()
            .with_address(WAREHOUSE, Coord { x: -73.93, y: 42.79 })
            .with_address("near", Coord { x: -73.90, y: 42.80 })
            .with_address("next-door", Coord { x: -73.89, y: 42.80 })
            .with_address("far", Coord { x: -75.0, y: 44.0 });
        let travel = StaticTravelTimes::new()
            .with_minutes(WAREHOUSE, "near", 10)
            .with_minutes(WAREHOUSE, "next-door", 12)
            .with_minutes(WAREHOUSE, "far", 150);
        Self { geocoder, travel }
    }
}

impl DispatcherBuilder for StubDispatcherBuilder {
    fn build(&self, config: &AssignConfig) -> Result<SharedDispatcher, CliError> {
        Ok(shared_dispatcher(
            Arc::new(self.geocoder.clone()),
            Arc::new(self.travel.clone()),
            config,
        ))
    }
}
