//! Translate page requests into store reads.

use std::sync::Arc;

use crate::{City, CitySort, CityStore, QuerySpec, StoreError};

/// Executes [`QuerySpec`] values against a [`CityStore`].
///
/// Every call re-executes against the current store state; nothing is cached
/// between calls. The engine is cheap to clone so it can be moved onto a
/// blocking worker.
///
/// # Examples
/// ```
/// # #[cfg(feature = "store-sqlite")]
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use std::sync::Arc;
/// use cities_core::{City, CityStore, CityWriter, QueryEngine, QuerySpec, SqliteCityStore};
///
/// let dir = tempfile::tempdir()?;
/// let store = Arc::new(SqliteCityStore::open(dir.path().join("cities.db"))?);
/// let mut writer = store.writer()?;
/// writer.insert(&City::new(1, "Montevideo", "UY", -34.9, -56.2))?;
/// writer.insert(&City::new(2, "Buenos Aires", "AR", -34.6, -58.4))?;
/// writer.save()?;
///
/// let engine = QueryEngine::new(store);
/// let page = engine.page(&QuerySpec::new("", false, 0, 50))?;
/// let names: Vec<_> = page.iter().map(|city| city.name.as_str()).collect();
/// assert_eq!(names, ["Buenos Aires", "Montevideo"]);
/// # Ok(())
/// # }
/// # #[cfg(not(feature = "store-sqlite"))]
/// # fn main() {}
/// ```
#[derive(Debug)]
pub struct QueryEngine<S> {
    store: Arc<S>,
}

impl<S> Clone for QueryEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: CityStore> QueryEngine<S> {
    /// Build an engine reading from `store`.
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The store this engine reads from.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Return one page for `spec`, sorted by country then name.
    ///
    /// An offset beyond the result size yields an empty page.
    pub fn page(&self, spec: &QuerySpec) -> Result<Vec<City>, StoreError> {
        self.store.query(
            CitySort::CountryThenName,
            &spec.predicate(),
            spec.offset,
            spec.limit,
        )
    }

    /// Count every row matching the filters of `spec`, ignoring paging.
    pub fn count(&self, spec: &QuerySpec) -> Result<usize, StoreError> {
        self.store.count(&spec.predicate())
    }
}
