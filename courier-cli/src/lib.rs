//! Command-line interface for the courier dispatch engine.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod assign;
mod error;

use assign::{AssignArgs, run_assign};
pub use error::CliError;

pub(crate) const ARG_ORDERS: &str = "orders";
pub(crate) const ARG_WAREHOUSE_ADDRESS: &str = "warehouse-address";
pub(crate) const ARG_SLOT_KIND: &str = "slot-kind";
pub(crate) const ARG_CAPACITY: &str = "capacity";
pub(crate) const ARG_MAX_TRAVEL_MINUTES: &str = "max-travel-minutes";
pub(crate) const ARG_GOOGLE_API_KEY: &str = "google-api-key";
pub(crate) const ARG_GEOCODE_BASE_URL: &str = "geocode-base-url";
pub(crate) const ARG_DIRECTIONS_BASE_URL: &str = "directions-base-url";
pub(crate) const ARG_MAX_CONCURRENCY: &str = "max-concurrency";
pub(crate) const ARG_LOOKUP_TIMEOUT_SECS: &str = "lookup-timeout-secs";
pub(crate) const ARG_MAX_DEFERRALS: &str = "max-deferrals";
pub(crate) const ARG_BREAKER_THRESHOLD: &str = "breaker-threshold";
pub(crate) const ARG_BREAKER_COOLDOWN_SECS: &str = "breaker-cooldown-secs";
pub(crate) const ENV_ORDERS: &str = "COURIER_CMDS_ASSIGN_ORDERS";
pub(crate) const ENV_WAREHOUSE_ADDRESS: &str = "COURIER_CMDS_ASSIGN_WAREHOUSE_ADDRESS";
pub(crate) const ENV_GOOGLE_API_KEY: &str = "COURIER_CMDS_ASSIGN_GOOGLE_API_KEY";

/// Run the courier CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns a [`CliError`] when argument parsing, configuration, order
/// loading, dispatch, or report output fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Assign(args) => run_assign(args),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "courier",
    about = "Assign pending delivery orders to drivers or zones",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Submit a batch of addresses, run one cycle and print the assignment.
    Assign(AssignArgs),
}

#[cfg(test)]
mod tests;
