use std::time::Duration;

use cities_core::City;

/// Display phase derived from the most recent action.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    /// A bootstrap is fetching and loading the catalogue.
    #[default]
    Loading,
    /// A fresh query returned no rows.
    Empty,
    /// The last action failed with the given message.
    Error(String),
    /// Rows are available.
    Content,
}

/// Observable state of the city list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CityListState {
    /// Rows accumulated since the last fresh query.
    pub cities: Vec<City>,
    /// Current display phase.
    pub phase: Phase,
    /// Write time of the most recent successful bootstrap load.
    pub persist_duration: Option<Duration>,
}

/// Inputs accepted by [`CitySession::handle`](crate::CitySession::handle).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CityListAction {
    /// Fetch the remote dataset, replace the store and show the first page.
    Bootstrap,
    /// Replace the search text and run a fresh query.
    SearchChanged(String),
    /// Replace the favourites filter and run a fresh query.
    FavoritesToggled(bool),
    /// Append the next page for the current filters.
    LoadNextPage,
    /// Flip the favourite flag of a city and re-run the active filters.
    UpdateFavorite(i64),
}

impl CityListAction {
    /// Whether the action replaces the visible rows.
    #[must_use]
    pub const fn is_fresh_query(&self) -> bool {
        !matches!(self, Self::LoadNextPage)
    }
}
