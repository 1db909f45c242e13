use std::{
    collections::BTreeSet,
    num::NonZeroUsize,
    sync::Arc,
    time::{Duration, Instant},
};

use cities_core::{City, CityPredicate, CitySort, CityStore, CityWriter, StoreError};
use log::{debug, info};
use tokio::task;

use crate::{LoadError, partition};

/// Rows written per chunk when callers have no better figure.
pub const DEFAULT_CHUNK_SIZE: usize = 2000;

/// What happens to favourite flags when the catalogue is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FavoritePolicy {
    /// Incoming rows are written as given, so favourites are cleared.
    #[default]
    Reset,
    /// Favourites whose id reappears in the new dataset are re-applied.
    Preserve,
}

/// Outcome of a successful [`BulkLoader::load`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Rows removed by the initial clear.
    pub removed: usize,
    /// Rows handed to chunk writers.
    pub rows: usize,
    /// Number of chunks written.
    pub chunks: usize,
    /// Wall-clock time spent clearing and writing.
    pub elapsed: Duration,
}

/// Replaces the contents of a [`CityStore`] using one writer per chunk.
///
/// # Examples
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use std::sync::Arc;
/// use cities_core::{City, CityPredicate, CityStore, test_support::MemoryCityStore};
/// use cities_loader::BulkLoader;
///
/// let store = Arc::new(MemoryCityStore::default());
/// let loader = BulkLoader::new(Arc::clone(&store));
/// let cities = vec![
///     City::new(1, "Montevideo", "UY", -34.9, -56.2),
///     City::new(2, "Buenos Aires", "AR", -34.6, -58.4),
/// ];
/// let report = tokio::runtime::Runtime::new()?.block_on(loader.load(cities, 1))?;
/// assert_eq!(report.chunks, 2);
/// assert_eq!(store.count(&CityPredicate::All)?, 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BulkLoader<S> {
    store: Arc<S>,
    policy: FavoritePolicy,
}

impl<S> Clone for BulkLoader<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            policy: self.policy,
        }
    }
}

impl<S> BulkLoader<S>
where
    S: CityStore + 'static,
{
    /// Build a loader writing into `store` with [`FavoritePolicy::Reset`].
    pub const fn new(store: Arc<S>) -> Self {
        Self {
            store,
            policy: FavoritePolicy::Reset,
        }
    }

    /// Set the favourite carry-over policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: FavoritePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The active favourite policy.
    #[must_use]
    pub const fn policy(&self) -> FavoritePolicy {
        self.policy
    }

    /// Replace every row in the store with `cities`.
    ///
    /// The clear is committed before any chunk writer starts. Writers then run
    /// in parallel on blocking threads and the call waits for all of them.
    /// When one or more fail, the failure of the lowest-indexed chunk is
    /// returned and rows from chunks that committed remain in the store.
    ///
    /// # Errors
    ///
    /// [`LoadError::InvalidChunkSize`] when `chunk_size` is zero, otherwise the
    /// first clear, snapshot or chunk failure.
    pub async fn load(
        &self,
        cities: Vec<City>,
        chunk_size: usize,
    ) -> Result<LoadReport, LoadError> {
        let chunk_size = NonZeroUsize::new(chunk_size).ok_or(LoadError::InvalidChunkSize)?;
        let started = Instant::now();

        let mut rows = cities;
        if self.policy == FavoritePolicy::Preserve {
            let favorites = self.favorite_ids().await?;
            for city in &mut rows {
                city.is_favorite |= favorites.contains(&city.id);
            }
        }

        let removed = self.clear().await?;
        let row_count = rows.len();
        let chunks = partition(rows, chunk_size);
        let chunk_count = chunks.len();
        self.write_chunks(chunks).await?;

        let elapsed = started.elapsed();
        info!("loaded {row_count} cities in {chunk_count} chunks in {elapsed:?}");
        Ok(LoadReport {
            removed,
            rows: row_count,
            chunks: chunk_count,
            elapsed,
        })
    }

    async fn favorite_ids(&self) -> Result<BTreeSet<i64>, LoadError> {
        let store = Arc::clone(&self.store);
        let favorites = task::spawn_blocking(move || {
            store.query(CitySort::Id, &CityPredicate::Favorites, 0, usize::MAX)
        })
        .await
        .map_err(|err| LoadError::Snapshot(StoreError::backend("join favourite snapshot", err)))?;
        match favorites {
            Ok(cities) => Ok(cities.into_iter().map(|city| city.id).collect()),
            Err(err) if err.is_precondition() => Ok(BTreeSet::new()),
            Err(err) => Err(LoadError::Snapshot(err)),
        }
    }

    async fn clear(&self) -> Result<usize, LoadError> {
        let store = Arc::clone(&self.store);
        let removed = task::spawn_blocking(move || {
            let mut writer = store.writer()?;
            let removed = writer.delete_all()?;
            writer.save()?;
            Ok::<_, StoreError>(removed)
        })
        .await
        .map_err(|err| LoadError::Clear(StoreError::backend("join clear task", err)))?
        .map_err(LoadError::Clear)?;
        debug!("cleared {removed} cities before load");
        Ok(removed)
    }

    async fn write_chunks(&self, chunks: Vec<Vec<City>>) -> Result<(), LoadError> {
        let handles: Vec<_> = chunks
            .into_iter()
            .enumerate()
            .map(|(index, chunk)| {
                let store = Arc::clone(&self.store);
                let handle = task::spawn_blocking(move || {
                    let rows = chunk.len();
                    write_chunk(store.as_ref(), &chunk)
                        .map(|()| rows)
                        .map_err(|source| LoadError::Chunk {
                            index,
                            rows,
                            source,
                        })
                });
                (index, handle)
            })
            .collect();

        // Every writer is awaited so committed chunks are settled before returning.
        let mut first_error = None;
        for (index, handle) in handles {
            let outcome = handle
                .await
                .map_err(|source| LoadError::Worker { index, source })
                .and_then(|result| result);
            match outcome {
                Ok(rows) => debug!("committed chunk {index} ({rows} rows)"),
                Err(err) => {
                    debug!("chunk {index} failed: {err}");
                    first_error.get_or_insert(err);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

fn write_chunk<S: CityStore>(store: &S, chunk: &[City]) -> Result<(), StoreError> {
    let mut writer = store.writer()?;
    for city in chunk {
        writer.insert(city)?;
    }
    writer.save()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cities_core::test_support::MemoryCityStore;

    fn towns(count: i64) -> Vec<City> {
        (1..=count)
            .map(|id| City::new(id, format!("Town {id}"), "AR", 0.0, 0.0))
            .collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn rejects_zero_chunk_size() {
        let loader = BulkLoader::new(Arc::new(MemoryCityStore::default()));
        let err = loader.load(towns(3), 0).await.expect_err("zero chunk size");
        assert!(matches!(err, LoadError::InvalidChunkSize));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn empty_dataset_clears_store() {
        let store = Arc::new(MemoryCityStore::with_cities(towns(4)));
        let report = BulkLoader::new(Arc::clone(&store))
            .load(Vec::new(), 2)
            .await
            .expect("empty load");
        assert_eq!(report.removed, 4);
        assert_eq!((report.rows, report.chunks), (0, 0));
        assert_eq!(store.count(&CityPredicate::All).expect("count"), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn duplicate_ids_collapse_to_one_row() {
        let store = Arc::new(MemoryCityStore::default());
        let mut cities = towns(5);
        cities.push(City::new(3, "Again", "AR", 0.0, 0.0));
        BulkLoader::new(Arc::clone(&store))
            .load(cities, 2)
            .await
            .expect("load");
        assert_eq!(store.count(&CityPredicate::All).expect("count"), 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn reset_policy_drops_favorites() {
        let store = Arc::new(MemoryCityStore::with_cities([
            City::new(1, "Town 1", "AR", 0.0, 0.0).with_favorite(true),
        ]));
        BulkLoader::new(Arc::clone(&store))
            .load(towns(2), 10)
            .await
            .expect("load");
        assert_eq!(store.count(&CityPredicate::Favorites).expect("count"), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn preserve_policy_reapplies_matching_favorites() {
        let store = Arc::new(MemoryCityStore::with_cities([
            City::new(1, "Town 1", "AR", 0.0, 0.0).with_favorite(true),
            City::new(99, "Gone", "AR", 0.0, 0.0).with_favorite(true),
        ]));
        BulkLoader::new(Arc::clone(&store))
            .with_policy(FavoritePolicy::Preserve)
            .load(towns(3), 2)
            .await
            .expect("load");
        let favorites = store
            .query(CitySort::Id, &CityPredicate::Favorites, 0, 10)
            .expect("favorites");
        let ids: Vec<_> = favorites.iter().map(|city| city.id).collect();
        assert_eq!(ids, [1]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn preserve_policy_tolerates_uninitialised_store() {
        let store = Arc::new(MemoryCityStore::uninitialised());
        let report = BulkLoader::new(Arc::clone(&store))
            .with_policy(FavoritePolicy::Preserve)
            .load(towns(3), 2)
            .await
            .expect("first load");
        assert_eq!(report.rows, 3);
    }
}
