//! Command-line interface for the local city catalogue.
//!
//! `cities refresh` downloads (or reads) the dataset and replaces the SQLite
//! catalogue, `cities list` pages through it and `cities favorite` toggles a
//! favourite flag. Every command writes pretty-printed JSON to stdout.
#![forbid(unsafe_code)]

use std::io::{self, Write};

use clap::{Parser, Subcommand};

mod error;
mod favorite;
mod list;
mod output;
mod refresh;

pub use error::CliError;

use favorite::FavoriteArgs;
use list::ListArgs;
use refresh::RefreshArgs;

pub(crate) const ARG_DB: &str = "db";
pub(crate) const ARG_URL: &str = "url";
pub(crate) const ARG_FILE: &str = "file";
pub(crate) const ARG_CHUNK_SIZE: &str = "chunk-size";
pub(crate) const ARG_PAGE_SIZE: &str = "page-size";
pub(crate) const ARG_TIMEOUT_SECS: &str = "timeout-secs";
pub(crate) const ARG_PRESERVE_FAVORITES: &str = "preserve-favorites";
pub(crate) const ARG_SEARCH: &str = "search";
pub(crate) const ARG_FAVORITES: &str = "favorites";
pub(crate) const ARG_PAGE: &str = "page";
pub(crate) const ARG_ID: &str = "id";
pub(crate) const ENV_FAVORITE_ID: &str = "CITIES_CMDS_FAVORITE_ID";

/// Database used when `--db` is not supplied.
pub(crate) const DEFAULT_DB: &str = "cities.db";

/// Run the CLI with the current process arguments, writing to stdout.
///
/// # Errors
///
/// Returns [`CliError`] when argument parsing, configuration layering or the
/// selected command fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute(cli.command, &mut out)
}

fn execute(command: Command, out: &mut dyn Write) -> Result<(), CliError> {
    match command {
        Command::Refresh(args) => refresh::run_refresh(&args.into_config()?, out),
        Command::List(args) => list::run_list(&args.into_config()?, out),
        Command::Favorite(args) => favorite::run_favorite(&args.into_config()?, out),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "cities",
    about = "Maintain and browse a local catalogue of world cities",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Replace the catalogue with a fresh copy of the dataset.
    Refresh(RefreshArgs),
    /// Print one page of the catalogue.
    List(ListArgs),
    /// Toggle the favourite flag of a city.
    Favorite(FavoriteArgs),
}

#[cfg(test)]
mod tests;
