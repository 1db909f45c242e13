//! `refresh` command: fetch the dataset and rebuild the catalogue.

use std::{io::Write, sync::Arc, time::Duration};

use camino::Utf8PathBuf;
use cities_core::{CitySource, SqliteCityStore};
use cities_data::{FileCitySource, HttpCitySource, HttpCitySourceConfig, fs::ensure_parent_dir};
use cities_loader::FavoritePolicy;
use cities_session::{CityListAction, CitySession, Phase, SessionConfig};
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::{
    ARG_CHUNK_SIZE, ARG_DB, ARG_FILE, ARG_PAGE_SIZE, ARG_PRESERVE_FAVORITES, ARG_TIMEOUT_SECS,
    ARG_URL, CliError, DEFAULT_DB,
    output::{RefreshOutput, views, write_json},
};

/// CLI arguments for the `refresh` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "refresh",
    long_about = "Replace the local catalogue with a fresh copy of the city \
                 dataset. The dataset is downloaded from --url (defaulting \
                 to the published dataset) or read from --file, written in \
                 parallel chunks, and the first page is printed.",
    about = "Rebuild the local catalogue"
)]
#[ortho_config(prefix = "CITIES")]
pub(crate) struct RefreshArgs {
    /// Path to the SQLite catalogue.
    #[arg(long = ARG_DB, value_name = "path")]
    #[serde(default)]
    pub(crate) db: Option<Utf8PathBuf>,
    /// URL of the JSON dataset.
    #[arg(long = ARG_URL, value_name = "url")]
    #[serde(default)]
    pub(crate) url: Option<String>,
    /// Read the JSON dataset from a local file instead of downloading it.
    #[arg(long = ARG_FILE, value_name = "path")]
    #[serde(default)]
    pub(crate) file: Option<Utf8PathBuf>,
    /// Rows written per parallel chunk.
    #[arg(long = ARG_CHUNK_SIZE, value_name = "rows")]
    #[serde(default)]
    pub(crate) chunk_size: Option<usize>,
    /// Rows printed after the refresh.
    #[arg(long = ARG_PAGE_SIZE, value_name = "rows")]
    #[serde(default)]
    pub(crate) page_size: Option<usize>,
    /// Download timeout in seconds.
    #[arg(long = ARG_TIMEOUT_SECS, value_name = "secs")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
    /// Keep favourites whose ids reappear in the new dataset.
    #[arg(long = ARG_PRESERVE_FAVORITES)]
    #[serde(default)]
    pub(crate) preserve_favorites: bool,
}

impl RefreshArgs {
    pub(crate) fn into_config(self) -> Result<RefreshConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        RefreshConfig::try_from(merged)
    }
}

/// Where the dataset comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DatasetSource {
    Remote(HttpCitySourceConfig),
    Local(Utf8PathBuf),
}

impl DatasetSource {
    fn build(&self) -> Result<Arc<dyn CitySource>, CliError> {
        Ok(match self {
            Self::Remote(config) => Arc::new(HttpCitySource::with_config(config.clone())?),
            Self::Local(path) => Arc::new(FileCitySource::new(path.clone())),
        })
    }
}

/// Resolved `refresh` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RefreshConfig {
    pub(crate) db: Utf8PathBuf,
    pub(crate) source: DatasetSource,
    pub(crate) session: SessionConfig,
}

impl TryFrom<RefreshArgs> for RefreshConfig {
    type Error = CliError;

    fn try_from(args: RefreshArgs) -> Result<Self, Self::Error> {
        let source = match (args.url, args.file) {
            (Some(_), Some(_)) => return Err(CliError::ConflictingSources),
            (None, Some(path)) => DatasetSource::Local(path),
            (url, None) => {
                let mut config =
                    url.map_or_else(HttpCitySourceConfig::default, HttpCitySourceConfig::new);
                if let Some(secs) = args.timeout_secs {
                    config = config.with_timeout(Duration::from_secs(secs));
                }
                DatasetSource::Remote(config)
            }
        };

        let mut session = SessionConfig::default();
        if let Some(chunk_size) = args.chunk_size {
            session = session.with_chunk_size(non_zero(chunk_size, ARG_CHUNK_SIZE)?);
        }
        if let Some(page_size) = args.page_size {
            session = session.with_page_size(non_zero(page_size, ARG_PAGE_SIZE)?);
        }
        if args.preserve_favorites {
            session = session.with_favorites(FavoritePolicy::Preserve);
        }

        Ok(Self {
            db: args.db.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DB)),
            source,
            session,
        })
    }
}

pub(crate) const fn non_zero(value: usize, field: &'static str) -> Result<usize, CliError> {
    if value == 0 {
        Err(CliError::ZeroSize { field })
    } else {
        Ok(value)
    }
}

pub(crate) fn run_refresh(config: &RefreshConfig, out: &mut dyn Write) -> Result<(), CliError> {
    ensure_parent_dir(&config.db).map_err(|source| CliError::PrepareDatabaseDir {
        path: config.db.clone(),
        source,
    })?;
    let store = Arc::new(SqliteCityStore::open(&config.db)?);
    let source = config.source.build()?;
    info!("refreshing catalogue at {}", config.db);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let mut session = CitySession::new(source, store, config.session);
    let state = runtime.block_on(async move {
        session.handle(CityListAction::Bootstrap).await.clone()
    });

    if let Phase::Error(message) = state.phase {
        return Err(CliError::Refresh { message });
    }
    write_json(
        out,
        &RefreshOutput {
            persisted_seconds: state.persist_duration.map(|elapsed| elapsed.as_secs_f64()),
            cities: views(&state.cities),
        },
    )
}
