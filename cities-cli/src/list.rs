//! `list` command: print one page of the catalogue.

use std::{io::Write, sync::Arc};

use camino::Utf8PathBuf;
use cities_core::{QueryEngine, QuerySpec, SqliteCityStore};
use cities_session::SessionConfig;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_DB, ARG_FAVORITES, ARG_PAGE, ARG_PAGE_SIZE, ARG_SEARCH, CliError, DEFAULT_DB,
    output::{ListOutput, views, write_json},
    refresh::non_zero,
};

/// CLI arguments for the `list` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "list",
    long_about = "Print one page of the catalogue sorted by country then \
                 name. Pages are numbered from zero. The catalogue must \
                 have been built with `cities refresh`.",
    about = "Page through the catalogue"
)]
#[ortho_config(prefix = "CITIES")]
pub(crate) struct ListArgs {
    /// Path to the SQLite catalogue.
    #[arg(long = ARG_DB, value_name = "path")]
    #[serde(default)]
    pub(crate) db: Option<Utf8PathBuf>,
    /// Case-insensitive substring matched against name or country.
    #[arg(long = ARG_SEARCH, value_name = "text")]
    #[serde(default)]
    pub(crate) search: Option<String>,
    /// Only list favourites.
    #[arg(long = ARG_FAVORITES)]
    #[serde(default)]
    pub(crate) favorites: bool,
    /// Zero-based page number.
    #[arg(long = ARG_PAGE, value_name = "n")]
    #[serde(default)]
    pub(crate) page: Option<usize>,
    /// Rows per page.
    #[arg(long = ARG_PAGE_SIZE, value_name = "rows")]
    #[serde(default)]
    pub(crate) page_size: Option<usize>,
}

impl ListArgs {
    pub(crate) fn into_config(self) -> Result<ListConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ListConfig::try_from(merged)
    }
}

/// Resolved `list` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ListConfig {
    pub(crate) db: Utf8PathBuf,
    pub(crate) search_text: String,
    pub(crate) favorites_only: bool,
    pub(crate) page: usize,
    pub(crate) page_size: usize,
}

impl ListConfig {
    fn spec(&self) -> QuerySpec {
        QuerySpec::new(
            self.search_text.clone(),
            self.favorites_only,
            self.page.saturating_mul(self.page_size),
            self.page_size,
        )
    }
}

impl TryFrom<ListArgs> for ListConfig {
    type Error = CliError;

    fn try_from(args: ListArgs) -> Result<Self, Self::Error> {
        let page_size = match args.page_size {
            Some(rows) => non_zero(rows, ARG_PAGE_SIZE)?,
            None => SessionConfig::default().page_size,
        };
        Ok(Self {
            db: args.db.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DB)),
            search_text: args.search.unwrap_or_default(),
            favorites_only: args.favorites,
            page: args.page.unwrap_or_default(),
            page_size,
        })
    }
}

pub(crate) fn run_list(config: &ListConfig, out: &mut dyn Write) -> Result<(), CliError> {
    let store = SqliteCityStore::open_existing(&config.db)?;
    let engine = QueryEngine::new(Arc::new(store));
    let spec = config.spec();
    let total = engine.count(&spec)?;
    let cities = engine.page(&spec)?;
    write_json(
        out,
        &ListOutput {
            page: config.page,
            total,
            cities: views(&cities),
        },
    )
}
