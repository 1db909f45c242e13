//! Facade crate for the cities engine.
//!
//! This crate re-exports the core domain types, the bulk loader and the
//! session state machine, and exposes the SQLite store and the dataset
//! adapters behind feature flags.

#![forbid(unsafe_code)]

pub use cities_core::{
    City, CityPredicate, CitySort, CitySource, CityStore, CityWriter, DecodeError, FetchError,
    QueryEngine, QuerySpec, SearchTerm, SourceError, StoreError,
};

pub use cities_loader::{BulkLoader, DEFAULT_CHUNK_SIZE, FavoritePolicy, LoadError, LoadReport};

pub use cities_session::{
    CityListAction, CityListState, CitySession, Phase, SessionConfig, SessionError,
    SessionHandle,
};

#[cfg(feature = "store-sqlite")]
pub use cities_core::{SqliteCityStore, SqliteCityStoreError, SqliteStoreOptions};

#[cfg(feature = "sources")]
pub use cities_data::{FileCitySource, HttpCitySource, HttpCitySourceConfig};

#[cfg(feature = "test-support")]
pub use cities_core::test_support;
