//! Assign command implementation for the courier CLI.

use std::io::{BufReader, Write};
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8};
use clap::Parser;
use courier_core::{
    Geocoder, OrderId, RejectionReason, SkippedOrder, SlotAssignment, SlotKind, SlotLayout,
    TravelTimeEstimator,
};
use courier_data::{GoogleDirections, GoogleGeocoder, GoogleMapsConfig};
use courier_planner::{CycleReport, DepotSettings, Dispatcher, GreedyPlanner, PlannerConfig};
use geo::Coord;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_BREAKER_COOLDOWN_SECS, ARG_BREAKER_THRESHOLD, ARG_CAPACITY, ARG_DIRECTIONS_BASE_URL,
    ARG_GEOCODE_BASE_URL, ARG_GOOGLE_API_KEY, ARG_LOOKUP_TIMEOUT_SECS, ARG_MAX_CONCURRENCY,
    ARG_MAX_DEFERRALS, ARG_MAX_TRAVEL_MINUTES, ARG_ORDERS, ARG_SLOT_KIND, ARG_WAREHOUSE_ADDRESS,
    CliError, ENV_GOOGLE_API_KEY, ENV_ORDERS, ENV_WAREHOUSE_ADDRESS,
};

/// Number of slots when `--capacity` is not given.
pub(crate) const DEFAULT_CAPACITY: usize = 11;
/// Travel budget when `--max-travel-minutes` is not given.
pub(crate) const DEFAULT_MAX_TRAVEL_MINUTES: u64 = 120;

/// CLI arguments for the `assign` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Submit every address in a JSON array of strings, run a single \
                 assignment cycle against the Google Maps geocoding and \
                 directions services, and print the resulting assignment as \
                 JSON.",
    about = "Assign a batch of delivery addresses"
)]
#[ortho_config(prefix = "COURIER")]
pub(crate) struct AssignArgs {
    /// Path to a JSON file holding an array of delivery addresses.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) orders: Option<Utf8PathBuf>,
    /// Address every route starts from.
    #[arg(long = ARG_WAREHOUSE_ADDRESS, value_name = "address")]
    #[serde(default)]
    pub(crate) warehouse_address: Option<String>,
    /// Whether slots are drivers or zones.
    #[arg(long = ARG_SLOT_KIND, value_name = "driver|zone")]
    #[serde(default)]
    pub(crate) slot_kind: Option<String>,
    /// Number of drivers or zones.
    #[arg(long = ARG_CAPACITY, value_name = "count")]
    #[serde(default)]
    pub(crate) capacity: Option<usize>,
    /// Longest acceptable drive from the warehouse.
    #[arg(long = ARG_MAX_TRAVEL_MINUTES, value_name = "minutes")]
    #[serde(default)]
    pub(crate) max_travel_minutes: Option<u64>,
    /// Google Maps Platform API key.
    #[arg(long = ARG_GOOGLE_API_KEY, value_name = "key")]
    #[serde(default)]
    pub(crate) google_api_key: Option<String>,
    /// Override the geocoding endpoint.
    #[arg(long = ARG_GEOCODE_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) geocode_base_url: Option<String>,
    /// Override the directions endpoint.
    #[arg(long = ARG_DIRECTIONS_BASE_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) directions_base_url: Option<String>,
    /// Orders looked up concurrently.
    #[arg(long = ARG_MAX_CONCURRENCY, value_name = "count")]
    #[serde(default)]
    pub(crate) max_concurrency: Option<usize>,
    /// Per-request timeout for lookups.
    #[arg(long = ARG_LOOKUP_TIMEOUT_SECS, value_name = "seconds")]
    #[serde(default)]
    pub(crate) lookup_timeout_secs: Option<u64>,
    /// Failed cycles tolerated before an order is rejected.
    #[arg(long = ARG_MAX_DEFERRALS, value_name = "count")]
    #[serde(default)]
    pub(crate) max_deferrals: Option<u32>,
    /// Consecutive transient failures that open a service breaker.
    #[arg(long = ARG_BREAKER_THRESHOLD, value_name = "count")]
    #[serde(default)]
    pub(crate) breaker_threshold: Option<u32>,
    /// Time an open breaker waits before a trial request.
    #[arg(long = ARG_BREAKER_COOLDOWN_SECS, value_name = "seconds")]
    #[serde(default)]
    pub(crate) breaker_cooldown_secs: Option<u64>,
}

impl AssignArgs {
    pub(crate) fn into_config(self) -> Result<AssignConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        AssignConfig::try_from(merged)
    }
}

/// Resolved `assign` command configuration.
#[derive(Debug, Clone)]
pub(crate) struct AssignConfig {
    /// Path to the JSON orders file.
    pub(crate) orders_path: Utf8PathBuf,
    /// Warehouse, slot layout and travel budget.
    pub(crate) depot: DepotSettings,
    /// Lookup tuning.
    pub(crate) planner: PlannerConfig,
    /// Google Maps credentials and endpoints.
    pub(crate) maps: GoogleMapsConfig,
}

impl TryFrom<AssignArgs> for AssignConfig {
    type Error = CliError;

    fn try_from(args: AssignArgs) -> Result<Self, Self::Error> {
        let orders_path = args.orders.ok_or(CliError::MissingArgument {
            field: ARG_ORDERS,
            env: ENV_ORDERS,
        })?;
        let warehouse_address = non_blank(args.warehouse_address).ok_or(
            CliError::MissingArgument {
                field: ARG_WAREHOUSE_ADDRESS,
                env: ENV_WAREHOUSE_ADDRESS,
            },
        )?;
        let api_key = non_blank(args.google_api_key).ok_or(CliError::MissingArgument {
            field: ARG_GOOGLE_API_KEY,
            env: ENV_GOOGLE_API_KEY,
        })?;

        let kind = args
            .slot_kind
            .as_deref()
            .map(str::parse::<SlotKind>)
            .transpose()?
            .unwrap_or_default();
        let layout = SlotLayout::new(kind, args.capacity.unwrap_or(DEFAULT_CAPACITY))?;
        let max_travel_minutes = args
            .max_travel_minutes
            .unwrap_or(DEFAULT_MAX_TRAVEL_MINUTES);
        let depot = DepotSettings::new(
            warehouse_address,
            layout,
            Duration::from_secs(max_travel_minutes.saturating_mul(60)),
        );

        let mut planner = PlannerConfig::default();
        if let Some(count) = args.max_concurrency {
            planner = planner.with_max_concurrency(count);
        }
        if let Some(secs) = args.lookup_timeout_secs {
            planner = planner.with_lookup_timeout(Duration::from_secs(secs));
        }
        if let Some(count) = args.max_deferrals {
            planner = planner.with_max_deferrals(count);
        }
        if let Some(count) = args.breaker_threshold {
            planner = planner.with_breaker_threshold(count);
        }
        if let Some(secs) = args.breaker_cooldown_secs {
            planner = planner.with_breaker_cooldown(Duration::from_secs(secs));
        }

        let mut maps = GoogleMapsConfig::new(api_key);
        if let Some(url) = args.geocode_base_url {
            maps = maps.with_geocode_url(url);
        }
        if let Some(url) = args.directions_base_url {
            maps = maps.with_directions_url(url);
        }

        Ok(Self {
            orders_path,
            depot,
            planner,
            maps,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// Dispatcher over type-erased lookup services.
pub(crate) type SharedDispatcher = Dispatcher<Arc<dyn Geocoder>, Arc<dyn TravelTimeEstimator>>;

/// Builds the dispatcher for the current assign invocation.
pub(crate) trait DispatcherBuilder {
    fn build(&self, config: &AssignConfig) -> Result<SharedDispatcher, CliError>;
}

pub(crate) struct GoogleDispatcherBuilder;

impl DispatcherBuilder for GoogleDispatcherBuilder {
    fn build(&self, config: &AssignConfig) -> Result<SharedDispatcher, CliError> {
        let geocoder = GoogleGeocoder::with_config(config.maps.clone()).map_err(|source| {
            CliError::BuildClient {
                service: "geocoder",
                source,
            }
        })?;
        let directions = GoogleDirections::with_config(config.maps.clone()).map_err(|source| {
            CliError::BuildClient {
                service: "directions",
                source,
            }
        })?;
        Ok(shared_dispatcher(
            Arc::new(geocoder),
            Arc::new(directions),
            config,
        ))
    }
}

/// Wire lookup services into a dispatcher configured by `config`.
pub(crate) fn shared_dispatcher(
    geocoder: Arc<dyn Geocoder>,
    estimator: Arc<dyn TravelTimeEstimator>,
    config: &AssignConfig,
) -> SharedDispatcher {
    let planner = GreedyPlanner::new(geocoder, estimator, config.depot.clone(), config.planner);
    Dispatcher::new(planner)
}

/// Coordinate as printed in the report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub(crate) struct Location {
    pub(crate) lat: f64,
    pub(crate) lon: f64,
}

impl From<Coord<f64>> for Location {
    fn from(coord: Coord<f64>) -> Self {
        Self {
            lat: coord.y,
            lon: coord.x,
        }
    }
}

/// An order withdrawn during the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RejectedEntry {
    pub(crate) id: OrderId,
    pub(crate) reason: RejectionReason,
}

/// An address refused at submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct RefusedAddress {
    pub(crate) address: String,
    pub(crate) error: String,
}

/// JSON document printed by `courier assign`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct AssignReport {
    pub(crate) warehouse: Location,
    pub(crate) slots: Vec<SlotAssignment>,
    pub(crate) skipped: Vec<SkippedOrder>,
    pub(crate) rejected: Vec<RejectedEntry>,
    pub(crate) refused: Vec<RefusedAddress>,
}

impl AssignReport {
    fn new(cycle: CycleReport, refused: Vec<RefusedAddress>) -> Self {
        let skipped = cycle.assignment.skipped().to_vec();
        let rejected = cycle
            .rejected
            .iter()
            .map(|entry| RejectedEntry {
                id: entry.id,
                reason: entry.reason,
            })
            .collect();
        Self {
            warehouse: Location::from(cycle.warehouse),
            slots: cycle.assignment.into_slots(),
            skipped,
            rejected,
            refused,
        }
    }
}

pub(crate) fn run_assign(args: AssignArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_assign_with(args, &GoogleDispatcherBuilder, &mut stdout)
}

pub(crate) fn run_assign_with(
    args: AssignArgs,
    builder: &dyn DispatcherBuilder,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let addresses = load_orders(&config.orders_path)?;
    let dispatcher = builder.build(&config)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let report = runtime.block_on(dispatch(&dispatcher, addresses))?;
    write_report(writer, &report)
}

async fn dispatch(
    dispatcher: &SharedDispatcher,
    addresses: Vec<String>,
) -> Result<AssignReport, CliError> {
    let mut refused = Vec::new();
    for address in addresses {
        match dispatcher.submit(&address).await {
            Ok(order) => log::debug!("accepted {address:?} as order {}", order.id),
            Err(err) => {
                log::warn!("refusing {address:?}: {err}");
                refused.push(RefusedAddress {
                    address,
                    error: err.to_string(),
                });
            }
        }
    }
    let cycle = dispatcher.run_cycle().await?;
    Ok(AssignReport::new(cycle, refused))
}

/// Loads the JSON array of addresses at `path`.
pub(crate) fn load_orders(path: &Utf8Path) -> Result<Vec<String>, CliError> {
    let file = fs_utf8::File::open_ambient(path, ambient_authority()).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            CliError::MissingSourceFile {
                field: ARG_ORDERS,
                path: path.to_path_buf(),
            }
        } else {
            CliError::OpenOrders {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    let is_file = file
        .metadata()
        .map_err(|source| CliError::OpenOrders {
            path: path.to_path_buf(),
            source,
        })?
        .is_file();
    if !is_file {
        return Err(CliError::SourcePathNotFile {
            field: ARG_ORDERS,
            path: path.to_path_buf(),
        });
    }
    serde_json::from_reader(BufReader::new(file)).map_err(|source| CliError::ParseOrders {
        path: path.to_path_buf(),
        source,
    })
}

fn write_report(writer: &mut dyn Write, report: &AssignReport) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(report).map_err(CliError::SerialiseReport)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteReport)?;
    writer.write_all(b"\n").map_err(CliError::WriteReport)?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<AssignConfig, CliError> {
    let merged = AssignArgs::merge_from_layers(layers).map_err(CliError::from)?;
    AssignConfig::try_from(merged)
}
