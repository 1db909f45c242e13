//! Error types emitted by the cities CLI.
//!
//! Keep this error type reasonably small, as every command helper returns
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use cities_core::{SqliteCityStoreError, StoreError};
use cities_data::SourceBuildError;
use thiserror::Error;

/// Errors emitted by the cities CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (pass <{field}> or set {env})")]
    MissingArgument {
        /// Name of the missing option.
        field: &'static str,
        /// Environment variable that can supply it.
        env: &'static str,
    },
    /// Both a remote URL and a local file were selected as the dataset.
    #[error("--url and --file are mutually exclusive")]
    ConflictingSources,
    /// A size option was zero.
    #[error("--{field} must be greater than zero")]
    ZeroSize {
        /// Name of the offending option.
        field: &'static str,
    },
    /// The directory holding the database could not be created.
    #[error("failed to prepare directory for {path:?}: {source}")]
    PrepareDatabaseDir {
        /// Database path whose parent was being created.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// Opening the SQLite catalogue failed.
    #[error(transparent)]
    OpenStore(#[from] SqliteCityStoreError),
    /// Constructing the HTTP dataset client failed.
    #[error(transparent)]
    BuildSource(#[from] SourceBuildError),
    /// The async runtime could not be started.
    #[error("failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// The refresh ended in an error state.
    #[error("refresh failed: {message}")]
    Refresh {
        /// Message published by the session.
        message: String,
    },
    /// Reading or updating the catalogue failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Serialising command output failed.
    #[error("failed to serialise output: {0}")]
    SerializeOutput(#[source] serde_json::Error),
    /// Writing command output failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
