use cities_core::{SourceError, StoreError};
use cities_loader::LoadError;
use thiserror::Error;
use tokio::task::JoinError;

/// Failures raised while a session processes an action.
///
/// The session shows these as [`Phase::Error`](crate::Phase::Error) using
/// their `Display` output.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// Fetching or decoding the remote dataset failed.
    #[error(transparent)]
    Source(#[from] SourceError),
    /// Replacing the store contents failed.
    #[error(transparent)]
    Load(#[from] LoadError),
    /// A query or favourite update failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A blocking store task panicked or was cancelled.
    #[error("store task did not complete: {0}")]
    Worker(#[source] JoinError),
    /// The session driver is no longer running.
    #[error("city session has stopped")]
    Closed,
}

impl SessionError {
    /// Whether the failure is a sequencing error rather than a runtime fault.
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        match self {
            Self::Store(err) => err.is_precondition(),
            Self::Load(err) => err.store_error().is_some_and(StoreError::is_precondition),
            Self::Source(_) | Self::Worker(_) | Self::Closed => false,
        }
    }
}
