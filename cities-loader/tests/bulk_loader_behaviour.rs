//! Behavioural tests for `BulkLoader` using rstest-bdd.

use std::{cell::RefCell, sync::Arc};

use cities_core::{City, CityPredicate, CityStore, test_support::MemoryCityStore};
use cities_loader::{BulkLoader, LoadError, LoadReport};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tokio::runtime::{Builder, Runtime};

/// Shared state for bulk loader scenarios.
#[derive(Debug)]
struct LoaderWorld {
    runtime: Runtime,
    store: RefCell<Arc<MemoryCityStore>>,
    outcome: RefCell<Option<Result<LoadReport, LoadError>>>,
}

impl LoaderWorld {
    fn new() -> Self {
        let runtime = Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .expect("build Tokio runtime");
        Self {
            runtime,
            store: RefCell::new(Arc::new(MemoryCityStore::default())),
            outcome: RefCell::new(None),
        }
    }

    fn load(&self, cities: Vec<City>, chunk_size: usize) {
        let store = Arc::clone(&self.store.borrow());
        let loader = BulkLoader::new(store);
        let outcome = self.runtime.block_on(loader.load(cities, chunk_size));
        self.outcome.replace(Some(outcome));
    }

    fn count(&self) -> usize {
        self.store
            .borrow()
            .count(&CityPredicate::All)
            .expect("count rows")
    }
}

#[fixture]
fn world() -> LoaderWorld {
    LoaderWorld::new()
}

fn towns(count: i64) -> Vec<City> {
    (1..=count)
        .map(|id| City::new(id, format!("Town {id}"), "AR", 0.0, 0.0))
        .collect()
}

#[given("an empty store")]
fn given_empty_store(world: &LoaderWorld) {
    world.store.replace(Arc::new(MemoryCityStore::default()));
}

#[given("a store holding {count} stale cities")]
fn given_stale_store(world: &LoaderWorld, count: i64) {
    let stale = (1..=count).map(|id| City::new(1000 + id, "Stale", "ZZ", 0.0, 0.0));
    world.store.replace(Arc::new(MemoryCityStore::with_cities(stale)));
}

#[given("an empty store whose commit fails for city {id}")]
fn given_failing_store(world: &LoaderWorld, id: i64) {
    world
        .store
        .replace(Arc::new(MemoryCityStore::default().failing_commit_for(id)));
}

#[when("I load {count} cities in chunks of {size}")]
fn when_load(world: &LoaderWorld, count: i64, size: usize) {
    world.load(towns(count), size);
}

#[when("I load {count} cities where one id repeats in chunks of {size}")]
fn when_load_duplicates(world: &LoaderWorld, count: i64, size: usize) {
    let mut cities = towns(count - 1);
    cities.push(City::new(1, "Town 1 again", "AR", 0.0, 0.0));
    world.load(cities, size);
}

#[then("the store holds {count} cities")]
fn then_store_holds(world: &LoaderWorld, count: usize) {
    assert_eq!(world.count(), count);
}

#[then("the report lists {chunks} chunks")]
fn then_report_chunks(world: &LoaderWorld, chunks: usize) {
    let borrowed = world.outcome.borrow();
    let report = borrowed
        .as_ref()
        .expect("a load should have run")
        .as_ref()
        .expect("load should succeed");
    assert_eq!(report.chunks, chunks);
    assert_eq!(report.removed, 3);
}

#[then("the load fails for chunk {index}")]
fn then_chunk_fails(world: &LoaderWorld, index: usize) {
    let borrowed = world.outcome.borrow();
    let outcome = borrowed.as_ref().expect("a load should have run");
    match outcome {
        Err(LoadError::Chunk {
            index: failed, rows, ..
        }) => {
            assert_eq!(*failed, index);
            assert_eq!(*rows, 2);
        }
        other => panic!("expected a chunk failure, got {other:?}"),
    }
}

#[then("the load is rejected for its chunk size")]
fn then_invalid_chunk_size(world: &LoaderWorld) {
    let borrowed = world.outcome.borrow();
    let outcome = borrowed.as_ref().expect("a load should have run");
    assert!(matches!(outcome, Err(LoadError::InvalidChunkSize)));
}

#[scenario(path = "tests/features/bulk_loader.feature", index = 0)]
fn load_replaces_rows(world: LoaderWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/bulk_loader.feature", index = 1)]
fn duplicate_ids(world: LoaderWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/bulk_loader.feature", index = 2)]
fn failed_chunk_keeps_siblings(world: LoaderWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/bulk_loader.feature", index = 3)]
fn zero_chunk_size(world: LoaderWorld) {
    let _ = world;
}
