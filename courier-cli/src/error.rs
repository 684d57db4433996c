//! Error types emitted by the courier CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use courier_core::{LayoutError, ParseSlotKindError};
use courier_data::ClientBuildError;
use courier_planner::DispatchError;
use thiserror::Error;

/// Errors emitted by the courier CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// The slot kind is neither `driver` nor `zone`.
    #[error(transparent)]
    InvalidSlotKind(#[from] ParseSlotKindError),
    /// The slot layout could not be built.
    #[error("invalid slot layout: {0}")]
    InvalidLayout(#[from] LayoutError),
    /// A referenced input path does not exist on disk.
    #[error("{field} path {path:?} does not exist")]
    MissingSourceFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced input path exists but is not a file.
    #[error("{field} path {path:?} exists but is not a file")]
    SourcePathNotFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// Opening the orders file failed.
    #[error("failed to open orders at {path:?}: {source}")]
    OpenOrders {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The orders file is not a JSON array of address strings.
    #[error("failed to parse orders JSON at {path:?}: {source}")]
    ParseOrders {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// Constructing a Google Maps client failed.
    #[error("failed to build {service} client: {source}")]
    BuildClient {
        service: &'static str,
        #[source]
        source: ClientBuildError,
    },
    /// Starting the async runtime failed.
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// Submitting an order or running the cycle failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// Serialising the assignment report failed.
    #[error("failed to serialise assignment report: {0}")]
    SerialiseReport(#[source] serde_json::Error),
    /// Writing the assignment report failed.
    #[error("failed to write assignment report: {0}")]
    WriteReport(#[source] std::io::Error),
}
