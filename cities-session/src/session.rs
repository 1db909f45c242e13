use std::sync::Arc;

use cities_core::{City, CitySource, CityStore, QueryEngine, QuerySpec};
use cities_loader::BulkLoader;
use log::{debug, error, info};
use tokio::{sync::watch, task};

use crate::{
    CityListAction, CityListState, Phase, QueryTicket, QueryTickets, SessionConfig, SessionError,
};

/// The single authority for what the city list shows.
///
/// Actions are processed one at a time by [`handle`](Self::handle). Every
/// action publishes at most one final [`CityListState`]; a bootstrap also
/// publishes [`Phase::Loading`] before it starts fetching. Failures never
/// escape: they become [`Phase::Error`] and the caller may re-send the action
/// to retry.
///
/// `handle` always executes the action it is given. Suppressing unchanged
/// search text or favourites toggles is left to the driver feeding it, such as
/// [`SessionHandle`](crate::SessionHandle).
///
/// # Examples
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use std::sync::Arc;
/// use cities_core::{City, test_support::{MemoryCityStore, StubCitySource}};
/// use cities_session::{CityListAction, CitySession, Phase, SessionConfig};
///
/// let source = Arc::new(StubCitySource::with_cities(vec![
///     City::new(1, "Montevideo", "UY", -34.9, -56.2),
///     City::new(2, "Buenos Aires", "AR", -34.6, -58.4),
/// ]));
/// let store = Arc::new(MemoryCityStore::default());
/// let mut session = CitySession::new(source, store, SessionConfig::default());
///
/// let runtime = tokio::runtime::Runtime::new()?;
/// let state = runtime.block_on(session.handle(CityListAction::Bootstrap));
/// assert_eq!(state.phase, Phase::Content);
/// assert_eq!(state.cities[0].name, "Buenos Aires");
/// # Ok(())
/// # }
/// ```
pub struct CitySession<S> {
    source: Arc<dyn CitySource>,
    loader: BulkLoader<S>,
    engine: QueryEngine<S>,
    config: SessionConfig,
    search_text: String,
    favorites_only: bool,
    current_offset: usize,
    view: CityListState,
    publisher: watch::Sender<CityListState>,
    tickets: QueryTickets,
    error_floor: Option<QueryTicket>,
}

impl<S> std::fmt::Debug for CitySession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CitySession")
            .field("config", &self.config)
            .field("search_text", &self.search_text)
            .field("favorites_only", &self.favorites_only)
            .field("current_offset", &self.current_offset)
            .field("phase", &self.view.phase)
            .finish_non_exhaustive()
    }
}

impl<S> CitySession<S>
where
    S: CityStore + 'static,
{
    /// Build a session over `store`, refreshed from `source`.
    pub fn new(source: Arc<dyn CitySource>, store: Arc<S>, config: SessionConfig) -> Self {
        let view = CityListState::default();
        let (publisher, _) = watch::channel(view.clone());
        Self {
            source,
            loader: BulkLoader::new(Arc::clone(&store)).with_policy(config.favorites),
            engine: QueryEngine::new(store),
            config,
            search_text: String::new(),
            favorites_only: false,
            current_offset: 0,
            view,
            publisher,
            tickets: QueryTickets::default(),
            error_floor: None,
        }
    }

    /// Current view of the list.
    #[must_use]
    pub const fn state(&self) -> &CityListState {
        &self.view
    }

    /// Receive every state the session publishes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CityListState> {
        self.publisher.subscribe()
    }

    /// The ticket counter consulted before publishing results.
    #[must_use]
    pub fn tickets(&self) -> QueryTickets {
        self.tickets.clone()
    }

    /// Current search text input.
    #[must_use]
    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    /// Current favourites filter input.
    #[must_use]
    pub const fn favorites_only(&self) -> bool {
        self.favorites_only
    }

    /// Number of rows loaded since the last fresh query.
    #[must_use]
    pub const fn current_offset(&self) -> usize {
        self.current_offset
    }

    /// Session settings.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Process `action` under a newly issued ticket.
    pub async fn handle(&mut self, action: CityListAction) -> &CityListState {
        let ticket = self.tickets.issue();
        self.handle_ticketed(action, ticket).await
    }

    /// Process `action` under a ticket issued when the action was accepted.
    ///
    /// If a newer ticket has been issued by the time the action finishes, its
    /// results are discarded instead of published; session inputs still change.
    /// Failures are always published. After a failed bootstrap, results of
    /// actions accepted before the failure are discarded so the error stays
    /// visible until the next action.
    pub async fn handle_ticketed(
        &mut self,
        action: CityListAction,
        ticket: QueryTicket,
    ) -> &CityListState {
        debug!("handling {action:?} with {ticket:?}");
        let outcome = match action {
            CityListAction::Bootstrap => self.bootstrap(ticket).await,
            CityListAction::SearchChanged(text) => {
                self.search_text = text;
                self.fresh_query(ticket).await
            }
            CityListAction::FavoritesToggled(favorites_only) => {
                self.favorites_only = favorites_only;
                self.fresh_query(ticket).await
            }
            CityListAction::LoadNextPage => self.next_page(ticket).await,
            CityListAction::UpdateFavorite(id) => self.update_favorite(id, ticket).await,
        };
        if let Err(err) = outcome {
            self.fail(&err);
        }
        &self.view
    }

    async fn bootstrap(&mut self, ticket: QueryTicket) -> Result<(), SessionError> {
        self.error_floor = None;
        self.view.phase = Phase::Loading;
        self.publish();

        let refreshed = self.refresh().await;
        if refreshed.is_err() {
            self.error_floor = Some(self.tickets.current());
        }
        refreshed?;

        self.search_text.clear();
        self.favorites_only = false;
        self.fresh_query(ticket).await
    }

    async fn refresh(&mut self) -> Result<(), SessionError> {
        let cities = self.source.fetch().await?;
        info!("fetched {} cities from the remote source", cities.len());
        let report = self.loader.load(cities, self.config.chunk_size).await?;
        self.view.persist_duration = Some(report.elapsed);
        Ok(())
    }

    /// Whether results computed under `ticket` may replace the published view.
    fn is_publishable(&self, ticket: QueryTicket) -> bool {
        self.tickets.is_current(ticket) && self.error_floor.is_none_or(|floor| ticket > floor)
    }

    async fn fresh_query(&mut self, ticket: QueryTicket) -> Result<(), SessionError> {
        let page = match self.run_query(0).await {
            Ok(page) => page,
            Err(err) => {
                self.current_offset = 0;
                self.view.cities.clear();
                return Err(err);
            }
        };
        if !self.is_publishable(ticket) {
            debug!("discarding results of superseded {ticket:?}");
            return Ok(());
        }
        self.current_offset = page.len();
        self.view.phase = if page.is_empty() {
            Phase::Empty
        } else {
            Phase::Content
        };
        self.view.cities = page;
        self.publish();
        Ok(())
    }

    async fn next_page(&mut self, ticket: QueryTicket) -> Result<(), SessionError> {
        let page = self.run_query(self.current_offset).await?;
        if !self.is_publishable(ticket) {
            debug!("discarding page of superseded {ticket:?}");
            return Ok(());
        }
        self.current_offset += page.len();
        self.view.cities.extend(page);
        self.view.phase = if self.view.cities.is_empty() {
            Phase::Empty
        } else {
            Phase::Content
        };
        self.publish();
        Ok(())
    }

    async fn update_favorite(&mut self, id: i64, ticket: QueryTicket) -> Result<(), SessionError> {
        let store = Arc::clone(self.engine.store());
        let city = task::spawn_blocking(move || store.toggle_favorite(id))
            .await
            .map_err(SessionError::Worker)??;
        info!("city {} favourite flag is now {}", city.id, city.is_favorite);
        self.fresh_query(ticket).await
    }

    async fn run_query(&self, offset: usize) -> Result<Vec<City>, SessionError> {
        let engine = self.engine.clone();
        let spec = QuerySpec::new(
            self.search_text.clone(),
            self.favorites_only,
            offset,
            self.config.page_size,
        );
        let page = task::spawn_blocking(move || engine.page(&spec))
            .await
            .map_err(SessionError::Worker)??;
        Ok(page)
    }

    fn fail(&mut self, err: &SessionError) {
        if err.is_precondition() {
            error!("city session used before its store was initialised: {err}");
        } else {
            error!("city session action failed: {err}");
        }
        self.view.phase = Phase::Error(err.to_string());
        self.publish();
    }

    fn publish(&self) {
        let view = &self.view;
        self.publisher.send_if_modified(|current| {
            if current == view {
                false
            } else {
                current.clone_from(view);
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cities_core::{
        FetchError,
        test_support::{MemoryCityStore, StubCitySource},
    };
    use rstest::{fixture, rstest};
    use std::collections::BTreeSet;

    fn names(state: &CityListState) -> Vec<&str> {
        state.cities.iter().map(|city| city.name.as_str()).collect()
    }

    fn numbered(count: i64) -> Vec<City> {
        (1..=count)
            .map(|id| City::new(id, format!("City {id:03}"), "AR", 0.0, 0.0))
            .collect()
    }

    fn session_with(
        source: StubCitySource,
        store: MemoryCityStore,
        page_size: usize,
    ) -> CitySession<MemoryCityStore> {
        CitySession::new(
            Arc::new(source),
            Arc::new(store),
            SessionConfig::default().with_page_size(page_size),
        )
    }

    #[fixture]
    fn hundred() -> CitySession<MemoryCityStore> {
        session_with(
            StubCitySource::with_cities(numbered(100)),
            MemoryCityStore::default(),
            50,
        )
    }

    #[rstest]
    #[tokio::test]
    async fn pagination_walks_every_row_once(
        #[from(hundred)] mut session: CitySession<MemoryCityStore>,
    ) {
        assert_eq!(session.handle(CityListAction::Bootstrap).await.cities.len(), 50);
        assert_eq!(session.handle(CityListAction::LoadNextPage).await.cities.len(), 100);
        let state = session.handle(CityListAction::LoadNextPage).await;
        assert_eq!(state.cities.len(), 100);
        assert_eq!(state.phase, Phase::Content);
        let ids: BTreeSet<_> = state.cities.iter().map(|city| city.id).collect();
        assert_eq!(ids.len(), 100);
        assert_eq!(session.current_offset(), 100);
    }

    #[rstest]
    #[tokio::test]
    async fn bootstrap_records_persist_duration(
        #[from(hundred)] mut session: CitySession<MemoryCityStore>,
    ) {
        let state = session.handle(CityListAction::Bootstrap).await;
        assert!(state.persist_duration.is_some());
    }

    #[rstest]
    #[tokio::test]
    async fn unmatched_search_is_empty() {
        let mut session = session_with(
            StubCitySource::with_cities(vec![
                City::new(1, "Buenos Aires", "Argentina", 0.0, 0.0),
                City::new(2, "Montevideo", "Uruguay", 0.0, 0.0),
            ]),
            MemoryCityStore::default(),
            50,
        );
        assert_eq!(session.handle(CityListAction::Bootstrap).await.cities.len(), 2);
        let state = session
            .handle(CityListAction::SearchChanged("z".to_owned()))
            .await;
        assert!(state.cities.is_empty());
        assert_eq!(state.phase, Phase::Empty);
        let state = session.handle(CityListAction::LoadNextPage).await;
        assert_eq!(state.phase, Phase::Empty);
    }

    #[rstest]
    #[tokio::test]
    async fn favorites_filter_isolates_favorites() {
        let store = MemoryCityStore::with_cities([
            City::new(1, "Quito", "Ecuador", 0.0, 0.0).with_favorite(true),
            City::new(2, "Caracas", "Venezuela", 0.0, 0.0),
        ]);
        let mut session = session_with(StubCitySource::default(), store, 50);
        let state = session
            .handle(CityListAction::FavoritesToggled(true))
            .await;
        assert_eq!(names(state), ["Quito"]);
    }

    #[rstest]
    #[tokio::test]
    async fn unfavoriting_in_favorites_view_removes_row() {
        let store = MemoryCityStore::with_cities([
            City::new(1, "Quito", "Ecuador", 0.0, 0.0).with_favorite(true),
            City::new(2, "Cuenca", "Ecuador", 0.0, 0.0).with_favorite(true),
        ]);
        let mut session = session_with(StubCitySource::default(), store, 50);
        session.handle(CityListAction::FavoritesToggled(true)).await;
        let state = session.handle(CityListAction::UpdateFavorite(1)).await;
        assert_eq!(names(state), ["Cuenca"]);
        assert!(session.favorites_only());
    }

    #[rstest]
    #[tokio::test]
    async fn fetch_failure_surfaces_as_error_and_retry_recovers() {
        let source = StubCitySource::with_error(FetchError::Http {
            url: "https://example.org/cities.json".to_owned(),
            status: 503,
        })
        .then_cities(numbered(3));
        let mut session = session_with(source, MemoryCityStore::default(), 50);

        let state = session.handle(CityListAction::Bootstrap).await;
        assert_eq!(
            state.phase,
            Phase::Error(
                "request to https://example.org/cities.json failed with status 503".to_owned()
            )
        );

        let state = session.handle(CityListAction::Bootstrap).await;
        assert_eq!(state.phase, Phase::Content);
        assert_eq!(state.cities.len(), 3);
    }

    #[rstest]
    #[tokio::test]
    async fn uninitialised_store_is_reported_as_error() {
        let mut session = session_with(
            StubCitySource::default(),
            MemoryCityStore::uninitialised(),
            50,
        );
        let state = session.handle(CityListAction::LoadNextPage).await;
        assert!(matches!(state.phase, Phase::Error(_)));
    }

    #[rstest]
    #[tokio::test]
    async fn superseded_results_are_not_published() {
        let store = MemoryCityStore::with_cities(numbered(3));
        let mut session = session_with(StubCitySource::default(), store, 50);
        session.handle(CityListAction::FavoritesToggled(false)).await;
        let tickets = session.tickets();
        let stale = tickets.issue();
        let latest = tickets.issue();

        let state = session
            .handle_ticketed(CityListAction::SearchChanged("001".to_owned()), stale)
            .await;
        assert_eq!(state.phase, Phase::Content);
        assert_eq!(names(state), ["City 001", "City 002", "City 003"]);
        assert_eq!(session.current_offset(), 3);

        let state = session
            .handle_ticketed(CityListAction::SearchChanged("002".to_owned()), latest)
            .await;
        assert_eq!(names(state), ["City 002"]);
    }

    #[rstest]
    #[tokio::test]
    async fn bootstrap_failure_outlives_queued_actions() {
        let source = StubCitySource::with_error(FetchError::Http {
            url: "https://example.org/cities.json".to_owned(),
            status: 503,
        });
        let store = MemoryCityStore::with_cities(numbered(3));
        let mut session = session_with(source, store, 50);
        let tickets = session.tickets();
        let bootstrap = tickets.issue();
        let toggle = tickets.issue();

        let state = session
            .handle_ticketed(CityListAction::Bootstrap, bootstrap)
            .await;
        assert!(matches!(state.phase, Phase::Error(_)));

        let state = session
            .handle_ticketed(CityListAction::FavoritesToggled(true), toggle)
            .await;
        assert!(matches!(state.phase, Phase::Error(_)));
        assert!(session.favorites_only());

        let state = session.handle(CityListAction::FavoritesToggled(false)).await;
        assert_eq!(state.phase, Phase::Content);
        assert_eq!(state.cities.len(), 3);
    }

    #[rstest]
    #[tokio::test]
    async fn superseded_failures_are_still_published() {
        let mut session = session_with(
            StubCitySource::default(),
            MemoryCityStore::uninitialised(),
            50,
        );
        let tickets = session.tickets();
        let stale = tickets.issue();
        tickets.issue();

        let state = session
            .handle_ticketed(CityListAction::SearchChanged("a".to_owned()), stale)
            .await;
        assert!(matches!(state.phase, Phase::Error(_)));
    }

    #[rstest]
    #[tokio::test]
    async fn subscribers_observe_published_state(
        #[from(hundred)] mut session: CitySession<MemoryCityStore>,
    ) {
        let mut receiver = session.subscribe();
        session.handle(CityListAction::Bootstrap).await;
        assert!(receiver.has_changed().expect("sender alive"));
        let published = receiver.borrow_and_update().clone();
        assert_eq!(&published, session.state());
    }
}
