//! Chunked, parallel replacement of the city catalogue.
//!
//! [`BulkLoader::load`] clears the store, partitions the incoming dataset into
//! contiguous chunks and commits each chunk from its own blocking worker with
//! an independent write context. Chunks that commit stay committed even when a
//! sibling fails; the first failure is reported once every worker finishes.

#![forbid(unsafe_code)]

mod chunks;
mod error;
mod loader;

pub use chunks::partition;
pub use error::LoadError;
pub use loader::{BulkLoader, DEFAULT_CHUNK_SIZE, FavoritePolicy, LoadReport};
