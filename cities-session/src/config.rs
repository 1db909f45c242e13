use std::time::Duration;

use cities_loader::{DEFAULT_CHUNK_SIZE, FavoritePolicy};

const DEFAULT_PAGE_SIZE: usize = 50;
const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(200);

/// Settings fixed for the lifetime of a [`CitySession`](crate::CitySession).
///
/// # Examples
/// ```
/// use std::time::Duration;
/// use cities_session::SessionConfig;
///
/// let config = SessionConfig::default()
///     .with_page_size(20)
///     .with_search_debounce(Duration::from_millis(50));
/// assert_eq!(config.page_size, 20);
/// assert_eq!(config.chunk_size, 2000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Rows requested per page.
    pub page_size: usize,
    /// Rows written per bulk loader chunk.
    pub chunk_size: usize,
    /// Quiet period before a search keystroke becomes a query.
    pub search_debounce: Duration,
    /// Favourite carry-over policy applied on bootstrap.
    pub favorites: FavoritePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
            favorites: FavoritePolicy::Reset,
        }
    }
}

impl SessionConfig {
    /// Set the page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the bulk loader chunk size.
    #[must_use]
    pub const fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the search debounce window.
    #[must_use]
    pub const fn with_search_debounce(mut self, search_debounce: Duration) -> Self {
        self.search_debounce = search_debounce;
        self
    }

    /// Set the favourite carry-over policy.
    #[must_use]
    pub const fn with_favorites(mut self, favorites: FavoritePolicy) -> Self {
        self.favorites = favorites;
        self
    }
}
