//! `favorite` command: toggle the favourite flag of one city.

use std::io::Write;

use camino::Utf8PathBuf;
use cities_core::{CityStore, SqliteCityStore};
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_DB, ARG_ID, CliError, DEFAULT_DB, ENV_FAVORITE_ID,
    output::{CityView, write_json},
};

/// CLI arguments for the `favorite` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "favorite",
    about = "Toggle the favourite flag of a city and print the updated row"
)]
#[ortho_config(prefix = "CITIES")]
pub(crate) struct FavoriteArgs {
    /// Identifier of the city to toggle.
    #[arg(value_name = "id")]
    #[serde(default)]
    pub(crate) id: Option<i64>,
    /// Path to the SQLite catalogue.
    #[arg(long = ARG_DB, value_name = "path")]
    #[serde(default)]
    pub(crate) db: Option<Utf8PathBuf>,
}

impl FavoriteArgs {
    pub(crate) fn into_config(self) -> Result<FavoriteConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        FavoriteConfig::try_from(merged)
    }
}

/// Resolved `favorite` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FavoriteConfig {
    pub(crate) db: Utf8PathBuf,
    pub(crate) id: i64,
}

impl TryFrom<FavoriteArgs> for FavoriteConfig {
    type Error = CliError;

    fn try_from(args: FavoriteArgs) -> Result<Self, Self::Error> {
        let id = args.id.ok_or(CliError::MissingArgument {
            field: ARG_ID,
            env: ENV_FAVORITE_ID,
        })?;
        Ok(Self {
            db: args.db.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DB)),
            id,
        })
    }
}

pub(crate) fn run_favorite(config: &FavoriteConfig, out: &mut dyn Write) -> Result<(), CliError> {
    let store = SqliteCityStore::open_existing(&config.db)?;
    let city = store.toggle_favorite(config.id)?;
    write_json(out, &CityView::from(&city))
}
