use cities_core::StoreError;
use thiserror::Error;
use tokio::task::JoinError;

/// Errors raised by [`BulkLoader::load`](crate::BulkLoader::load).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoadError {
    /// A chunk size of zero was requested.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Reading the favourites to carry over failed.
    #[error("failed to snapshot favourites before refresh: {0}")]
    Snapshot(#[source] StoreError),
    /// Deleting the previous rows failed.
    #[error("failed to clear the city store: {0}")]
    Clear(#[source] StoreError),
    /// A chunk writer failed to insert or commit its rows.
    #[error("failed to write chunk {index} ({rows} rows): {source}")]
    Chunk {
        /// Zero-based position of the chunk in the input.
        index: usize,
        /// Number of rows in the chunk.
        rows: usize,
        /// Underlying store failure.
        #[source]
        source: StoreError,
    },
    /// A chunk writer panicked or was cancelled.
    #[error("writer for chunk {index} did not complete: {source}")]
    Worker {
        /// Zero-based position of the chunk in the input.
        index: usize,
        /// Join failure reported by the runtime.
        #[source]
        source: JoinError,
    },
}

impl LoadError {
    /// The store failure behind this error, if any.
    #[must_use]
    pub const fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Snapshot(source) | Self::Clear(source) | Self::Chunk { source, .. } => {
                Some(source)
            }
            Self::InvalidChunkSize | Self::Worker { .. } => None,
        }
    }
}
