//! Core domain types for the cities engine.
//!
//! The crate defines the [`City`] entity, the predicates and sort orders used
//! to page through a local catalogue, the [`CityStore`] persistence seam and
//! the [`CitySource`] seam for the remote dataset. Queries are translated by
//! [`QueryEngine`]. A SQLite-backed store ships behind the `store-sqlite`
//! feature.

#![forbid(unsafe_code)]

mod city;
mod engine;
mod query;
mod source;
pub mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use city::City;
pub use engine::QueryEngine;
pub use query::{CityPredicate, CitySort, QuerySpec, SearchTerm, fold_search_text};
pub use source::{CitySource, DecodeError, FetchError, SourceError};
pub use store::{CityStore, CityWriter, StoreError};

#[cfg(feature = "store-sqlite")]
pub use store::{SqliteCityStore, SqliteCityStoreError, SqliteCityWriter, SqliteStoreOptions};
