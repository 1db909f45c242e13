//! Test-only, in-memory `CityStore` and `CitySource` implementations used by
//! unit and behaviour tests.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard};

use async_trait::async_trait;

use crate::{
    City, CityPredicate, CitySort, CitySource, CityStore, CityWriter, SourceError, StoreError,
};

type Rows = Arc<RwLock<BTreeMap<i64, City>>>;

/// In-memory `CityStore` implementation used in tests.
///
/// Queries perform a linear scan and are intended only for small datasets.
/// Writers buffer their changes and apply them under a single write lock on
/// [`CityWriter::save`].
#[derive(Debug, Clone)]
pub struct MemoryCityStore {
    rows: Rows,
    initialised: Arc<AtomicBool>,
    commits: Arc<AtomicUsize>,
    queries: Arc<AtomicUsize>,
    failing_ids: Arc<BTreeSet<i64>>,
}

impl Default for MemoryCityStore {
    fn default() -> Self {
        Self {
            rows: Rows::default(),
            initialised: Arc::new(AtomicBool::new(true)),
            commits: Arc::default(),
            queries: Arc::default(),
            failing_ids: Arc::default(),
        }
    }
}

impl MemoryCityStore {
    /// Create a store pre-populated with `cities`.
    pub fn with_cities<I>(cities: I) -> Self
    where
        I: IntoIterator<Item = City>,
    {
        let store = Self::default();
        if let Ok(mut rows) = store.rows.write() {
            rows.extend(cities.into_iter().map(|city| (city.id, city)));
        }
        store
    }

    /// Create a store whose reads fail with [`StoreError::Uninitialised`]
    /// until a writer commits.
    #[must_use]
    pub fn uninitialised() -> Self {
        let store = Self::default();
        store.initialised.store(false, Ordering::SeqCst);
        store
    }

    /// Make any writer that inserted `id` fail when saving.
    #[must_use]
    pub fn failing_commit_for(mut self, id: i64) -> Self {
        let mut failing = (*self.failing_ids).clone();
        failing.insert(id);
        self.failing_ids = Arc::new(failing);
        self
    }

    /// Number of successful writer commits.
    #[must_use]
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Number of page queries served, including failed ones.
    #[must_use]
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Snapshot of every committed row ordered by id.
    pub fn snapshot(&self) -> Result<Vec<City>, StoreError> {
        Ok(read_rows(&self.rows)?.values().cloned().collect())
    }

    fn ensure_initialised(&self) -> Result<(), StoreError> {
        if self.initialised.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Uninitialised)
        }
    }
}

type RowsGuard<'a> = RwLockReadGuard<'a, BTreeMap<i64, City>>;

fn read_rows(rows: &Rows) -> Result<RowsGuard<'_>, StoreError> {
    rows.read()
        .map_err(|_| StoreError::backend("read rows", "row lock poisoned"))
}

impl CityStore for MemoryCityStore {
    type Writer = MemoryCityWriter;

    fn writer(&self) -> Result<Self::Writer, StoreError> {
        Ok(MemoryCityWriter {
            store: self.clone(),
            pending: Vec::new(),
        })
    }

    fn query(
        &self,
        sort: CitySort,
        predicate: &CityPredicate,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<City>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.ensure_initialised()?;
        let rows = read_rows(&self.rows)?;
        let mut matches: Vec<City> = rows
            .values()
            .filter(|city| predicate.matches(city))
            .cloned()
            .collect();
        matches.sort_by(|lhs, rhs| sort.compare(lhs, rhs));
        Ok(matches.into_iter().skip(offset).take(limit).collect())
    }

    fn count(&self, predicate: &CityPredicate) -> Result<usize, StoreError> {
        self.ensure_initialised()?;
        let rows = read_rows(&self.rows)?;
        Ok(rows.values().filter(|city| predicate.matches(city)).count())
    }

    fn toggle_favorite(&self, id: i64) -> Result<City, StoreError> {
        self.ensure_initialised()?;
        let mut rows = self
            .rows
            .write()
            .map_err(|_| StoreError::backend("write rows", "row lock poisoned"))?;
        let city = rows.get_mut(&id).ok_or(StoreError::MissingCity { id })?;
        city.is_favorite = !city.is_favorite;
        Ok(city.clone())
    }
}

#[derive(Debug)]
enum PendingWrite {
    Clear,
    Insert(City),
}

/// Buffered write context over a [`MemoryCityStore`].
#[derive(Debug)]
pub struct MemoryCityWriter {
    store: MemoryCityStore,
    pending: Vec<PendingWrite>,
}

impl CityWriter for MemoryCityWriter {
    fn delete_all(&mut self) -> Result<usize, StoreError> {
        let committed = read_rows(&self.store.rows)?.len();
        self.pending.push(PendingWrite::Clear);
        Ok(committed)
    }

    fn insert(&mut self, city: &City) -> Result<(), StoreError> {
        self.pending.push(PendingWrite::Insert(city.clone()));
        Ok(())
    }

    fn save(self) -> Result<(), StoreError> {
        let failing = self.pending.iter().find_map(|write| match write {
            PendingWrite::Insert(city) if self.store.failing_ids.contains(&city.id) => {
                Some(city.id)
            }
            _ => None,
        });
        if let Some(id) = failing {
            return Err(StoreError::backend(
                "commit",
                format!("injected commit failure for city {id}"),
            ));
        }
        let mut rows = self
            .store
            .rows
            .write()
            .map_err(|_| StoreError::backend("write rows", "row lock poisoned"))?;
        for write in self.pending {
            match write {
                PendingWrite::Clear => rows.clear(),
                PendingWrite::Insert(city) => {
                    rows.insert(city.id, city);
                }
            }
        }
        self.store.initialised.store(true, Ordering::SeqCst);
        self.store.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Scripted `CitySource` returning queued responses in order.
///
/// The final response repeats once the queue is drained to one entry.
#[derive(Debug, Default)]
pub struct StubCitySource {
    responses: Mutex<VecDeque<Result<Vec<City>, SourceError>>>,
    fetches: AtomicUsize,
}

impl StubCitySource {
    /// Source that always returns `cities`.
    #[must_use]
    pub fn with_cities(cities: Vec<City>) -> Self {
        Self::default().then_cities(cities)
    }

    /// Source that always fails with `error`.
    #[must_use]
    pub fn with_error(error: impl Into<SourceError>) -> Self {
        Self::default().then_error(error)
    }

    /// Queue a successful response.
    #[must_use]
    pub fn then_cities(self, cities: Vec<City>) -> Self {
        self.push(Ok(cities))
    }

    /// Queue a failing response.
    #[must_use]
    pub fn then_error(self, error: impl Into<SourceError>) -> Self {
        self.push(Err(error.into()))
    }

    /// Number of times [`CitySource::fetch`] was called.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn push(self, response: Result<Vec<City>, SourceError>) -> Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses.push_back(response);
        }
        self
    }
}

#[async_trait]
impl CitySource for StubCitySource {
    async fn fetch(&self) -> Result<Vec<City>, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let mut responses = self
            .responses
            .lock()
            .map_err(|_| crate::DecodeError::new("stub response queue poisoned"))?;
        let response = if responses.len() > 1 {
            responses.pop_front()
        } else {
            responses.front().cloned()
        };
        response.unwrap_or_else(|| Ok(Vec::new()))
    }
}
