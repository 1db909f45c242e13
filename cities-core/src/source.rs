//! Remote dataset seam.
//!
//! A [`CitySource`] returns the entire catalogue in one call. There is no
//! pagination, retry or backoff at this boundary: a single failure is
//! surfaced as-is.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::City;

/// Produce the full dataset that a refresh loads into the store.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use cities_core::{City, CitySource, SourceError};
///
/// struct Fixed(Vec<City>);
///
/// #[async_trait]
/// impl CitySource for Fixed {
///     async fn fetch(&self) -> Result<Vec<City>, SourceError> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
#[async_trait]
pub trait CitySource: Send + Sync {
    /// Fetch every city. Returned rows are never marked as favourites.
    async fn fetch(&self) -> Result<Vec<City>, SourceError>;
}

/// Transport failures raised while retrieving the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("request to {url} failed with status {status}")]
    Http {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },
    /// The server could not be reached.
    #[error("network error contacting {url}: {message}")]
    Network {
        /// Requested URL.
        url: String,
        /// Transport error description.
        message: String,
    },
    /// The request did not complete within the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Requested URL.
        url: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },
    /// A local dataset file could not be read.
    #[error("failed to read dataset at {path:?}: {message}")]
    Read {
        /// Location of the dataset file.
        path: PathBuf,
        /// I/O error description.
        message: String,
    },
}

/// The dataset was retrieved but could not be decoded into cities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed city dataset: {message}")]
pub struct DecodeError {
    /// Decoder error description, including position where available.
    pub message: String,
}

impl DecodeError {
    /// Wrap a decoder message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors from [`CitySource::fetch`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Retrieving the dataset failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// Decoding the dataset failed.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}
