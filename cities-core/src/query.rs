//! Predicates, sort orders and page requests over the city catalogue.

use std::cmp::Ordering;

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::City;

/// Fold text for case- and diacritic-insensitive substring matching.
///
/// Text is lowercased, decomposed (NFD) and stripped of combining marks.
/// Both the stored `name`/`country` keys and the search needle pass through
/// this function so that every store agrees on what "contains" means.
///
/// # Examples
/// ```
/// use cities_core::fold_search_text;
///
/// assert_eq!(fold_search_text("ÁVILA"), "avila");
/// assert_eq!(fold_search_text("São Paulo"), "sao paulo");
/// ```
#[must_use]
pub fn fold_search_text(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .collect()
}

/// A non-empty, folded search needle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm(String);

impl SearchTerm {
    /// Build a term from raw user input. Empty input yields `None`.
    ///
    /// Whitespace is significant: a single space is a valid needle.
    #[must_use]
    pub fn new(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            None
        } else {
            Some(Self(fold_search_text(raw)))
        }
    }

    /// The folded needle.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Report whether `city` contains the term in its name or country.
    #[must_use]
    pub fn matches(&self, city: &City) -> bool {
        fold_search_text(&city.name).contains(&self.0)
            || fold_search_text(&city.country).contains(&self.0)
    }
}

/// Row filter handed to [`CityStore::query`](crate::CityStore::query).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CityPredicate {
    /// Every row.
    #[default]
    All,
    /// Rows whose `is_favorite` flag is set.
    Favorites,
    /// Rows whose name or country contains the term.
    Matching(SearchTerm),
    /// Favourite rows whose name or country contains the term.
    FavoritesMatching(SearchTerm),
}

impl CityPredicate {
    /// Build the predicate for a search text and favourites toggle.
    ///
    /// # Examples
    /// ```
    /// use cities_core::{CityPredicate, SearchTerm};
    ///
    /// assert_eq!(CityPredicate::from_filters("", false), CityPredicate::All);
    /// assert_eq!(CityPredicate::from_filters("", true), CityPredicate::Favorites);
    /// assert!(matches!(
    ///     CityPredicate::from_filters("Mad", true),
    ///     CityPredicate::FavoritesMatching(term) if term.as_str() == "mad"
    /// ));
    /// ```
    #[must_use]
    pub fn from_filters(search_text: &str, favorites_only: bool) -> Self {
        match (SearchTerm::new(search_text), favorites_only) {
            (None, false) => Self::All,
            (None, true) => Self::Favorites,
            (Some(term), false) => Self::Matching(term),
            (Some(term), true) => Self::FavoritesMatching(term),
        }
    }

    /// The search term, if the predicate filters on text.
    #[must_use]
    pub const fn term(&self) -> Option<&SearchTerm> {
        match self {
            Self::Matching(term) | Self::FavoritesMatching(term) => Some(term),
            Self::All | Self::Favorites => None,
        }
    }

    /// Whether the predicate restricts results to favourites.
    #[must_use]
    pub const fn favorites_only(&self) -> bool {
        matches!(self, Self::Favorites | Self::FavoritesMatching(_))
    }

    /// Evaluate the predicate against a single row.
    #[must_use]
    pub fn matches(&self, city: &City) -> bool {
        if self.favorites_only() && !city.is_favorite {
            return false;
        }
        self.term().is_none_or(|term| term.matches(city))
    }
}

/// Ordering applied to query results.
///
/// Both orders are total, so repeated page requests against an unchanged
/// store return identical sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CitySort {
    /// `country` ascending, then `name` ascending, ties broken by `id`.
    #[default]
    CountryThenName,
    /// `id` ascending.
    Id,
}

impl CitySort {
    /// Compare two rows under this ordering.
    #[must_use]
    pub fn compare(self, lhs: &City, rhs: &City) -> Ordering {
        match self {
            Self::CountryThenName => lhs
                .country
                .cmp(&rhs.country)
                .then_with(|| lhs.name.cmp(&rhs.name))
                .then_with(|| lhs.id.cmp(&rhs.id)),
            Self::Id => lhs.id.cmp(&rhs.id),
        }
    }
}

/// The tuple that fully determines one page request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuerySpec {
    /// Raw search text; empty disables text filtering.
    pub search_text: String,
    /// Restrict results to favourites.
    pub favorites_only: bool,
    /// Number of matching rows to skip.
    pub offset: usize,
    /// Maximum number of rows to return.
    pub limit: usize,
}

impl QuerySpec {
    /// Build a page request.
    pub fn new(
        search_text: impl Into<String>,
        favorites_only: bool,
        offset: usize,
        limit: usize,
    ) -> Self {
        Self {
            search_text: search_text.into(),
            favorites_only,
            offset,
            limit,
        }
    }

    /// The predicate this request filters with.
    #[must_use]
    pub fn predicate(&self) -> CityPredicate {
        CityPredicate::from_filters(&self.search_text, self.favorites_only)
    }
}
