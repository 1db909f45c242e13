//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use cities_cli::CliError;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives.
const LOG_ENV: &str = "CITIES_LOG";
const DEFAULT_LOG_FILTER: &str = "info";

fn main() -> eyre::Result<()> {
    init_logging()?;
    match cities_cli::run() {
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        result => Ok(result?),
    }
}

/// Install a stderr subscriber that also receives `log` records.
fn init_logging() -> eyre::Result<()> {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| eyre::eyre!("failed to install logger: {err}"))
}
