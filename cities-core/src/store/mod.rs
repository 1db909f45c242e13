//! Persistence seam for the city catalogue.
//!
//! A [`CityStore`] is a keyed collection of [`City`] rows with sorted,
//! filtered and paginated reads. Writes go through independent
//! [`CityWriter`] contexts: each writer sees only its own uncommitted changes
//! and publishes them atomically on [`CityWriter::save`]. Several writers may
//! be active at once on different threads, which is how the bulk loader gets
//! parallel throughput.

use std::error::Error as StdError;

use thiserror::Error;

use crate::{City, CityPredicate, CitySort};

#[cfg(feature = "store-sqlite")]
mod sqlite;

#[cfg(feature = "store-sqlite")]
pub use sqlite::{SqliteCityStore, SqliteCityStoreError, SqliteCityWriter, SqliteStoreOptions};

/// Keyed, queryable collection of cities.
///
/// `id` is unique at all times: inserting an existing id overwrites the row.
///
/// # Examples
///
/// ```rust
/// use cities_core::{City, CityStore, CityWriter};
///
/// fn replace_all<S: CityStore>(store: &S, cities: &[City]) -> Result<(), cities_core::StoreError> {
///     let mut writer = store.writer()?;
///     writer.delete_all()?;
///     for city in cities {
///         writer.insert(city)?;
///     }
///     writer.save()
/// }
/// ```
pub trait CityStore: Send + Sync {
    /// Independent write context bound to this store.
    type Writer: CityWriter;

    /// Open a new write context.
    fn writer(&self) -> Result<Self::Writer, StoreError>;

    /// Return at most `limit` rows matching `predicate`, ordered by `sort`,
    /// after skipping the first `offset` matches.
    ///
    /// An `offset` beyond the result size yields an empty sequence.
    fn query(
        &self,
        sort: CitySort,
        predicate: &CityPredicate,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<City>, StoreError>;

    /// Count the rows matching `predicate`.
    fn count(&self, predicate: &CityPredicate) -> Result<usize, StoreError>;

    /// Flip the favourite flag of the city with `id` and commit the change.
    ///
    /// Returns the updated row.
    fn toggle_favorite(&self, id: i64) -> Result<City, StoreError>;
}

/// A write context over a [`CityStore`].
///
/// Changes are invisible to readers and other writers until [`save`] commits
/// them. Dropping a writer without saving discards its changes.
///
/// [`save`]: CityWriter::save
pub trait CityWriter: Send {
    /// Remove every row. Returns the number of rows removed.
    fn delete_all(&mut self) -> Result<usize, StoreError>;

    /// Add `city`, overwriting any row with the same id.
    fn insert(&mut self, city: &City) -> Result<(), StoreError>;

    /// Commit pending writes.
    fn save(self) -> Result<(), StoreError>;
}

/// Errors raised by [`CityStore`] and [`CityWriter`] implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// The store was used before its schema was created.
    ///
    /// This is a sequencing error on the caller's side, not a transient
    /// fault; retrying without initialising the store fails again.
    #[error("city store is not initialised; run a refresh first")]
    Uninitialised,
    /// The referenced city does not exist.
    #[error("city {id} does not exist")]
    MissingCity {
        /// Identifier that was looked up.
        id: i64,
    },
    /// The backing storage failed.
    #[error("failed to {operation}: {source}")]
    Backend {
        /// Short description of the failed operation.
        operation: &'static str,
        /// Underlying storage error.
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

impl StoreError {
    /// Wrap a storage failure raised while performing `operation`.
    pub fn backend<E>(operation: &'static str, source: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Self::Backend {
            operation,
            source: source.into(),
        }
    }

    /// Whether the error signals a precondition violation rather than a
    /// storage fault.
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(self, Self::Uninitialised)
    }
}
