//! Background driver serialising user actions into a [`CitySession`].

use std::sync::{Arc, Mutex, MutexGuard};

use cities_core::CityStore;
use log::debug;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

use crate::{
    CityListAction, CityListState, CitySession, QueryTicket, QueryTickets, SearchDebouncer,
    SessionError,
};

#[derive(Debug)]
struct Command {
    action: CityListAction,
    ticket: QueryTicket,
}

/// Filters most recently accepted from the caller.
#[derive(Debug, Default)]
struct RequestedInputs {
    search_text: String,
    favorites_only: bool,
}

/// Accepts actions, drops unchanged filters and tickets the rest.
///
/// Tickets are issued while holding the inputs lock so command order in the
/// channel always matches ticket order.
#[derive(Debug, Clone)]
struct Dispatcher {
    commands: mpsc::UnboundedSender<Command>,
    requested: Arc<Mutex<RequestedInputs>>,
    tickets: QueryTickets,
}

impl Dispatcher {
    fn lock(&self) -> Result<MutexGuard<'_, RequestedInputs>, SessionError> {
        self.requested.lock().map_err(|_| SessionError::Closed)
    }

    fn send(&self, action: CityListAction, ticket: QueryTicket) -> Result<(), SessionError> {
        self.commands
            .send(Command { action, ticket })
            .map_err(|_| SessionError::Closed)
    }

    fn bootstrap(&self) -> Result<(), SessionError> {
        let mut requested = self.lock()?;
        *requested = RequestedInputs::default();
        self.send(CityListAction::Bootstrap, self.tickets.issue())
    }

    fn search(&self, text: String) -> Result<(), SessionError> {
        let mut requested = self.lock()?;
        if requested.search_text == text {
            debug!("search text unchanged; skipping query");
            return Ok(());
        }
        requested.search_text.clone_from(&text);
        self.send(CityListAction::SearchChanged(text), self.tickets.issue())
    }

    fn favorites(&self, favorites_only: bool) -> Result<(), SessionError> {
        let mut requested = self.lock()?;
        if requested.favorites_only == favorites_only {
            debug!("favourites filter unchanged; skipping query");
            return Ok(());
        }
        requested.favorites_only = favorites_only;
        self.send(
            CityListAction::FavoritesToggled(favorites_only),
            self.tickets.issue(),
        )
    }

    fn dispatch(&self, action: CityListAction) -> Result<(), SessionError> {
        let _requested = self.lock()?;
        let ticket = if action.is_fresh_query() {
            self.tickets.issue()
        } else {
            self.tickets.current()
        };
        self.send(action, ticket)
    }
}

/// Runs a [`CitySession`] on background Tokio tasks.
///
/// Actions are queued on an unbounded channel and processed strictly in
/// order. Search keystrokes pass through a [`SearchDebouncer`] first. Search
/// text and favourites changes equal to the last accepted value are dropped
/// before they reach the session. Each published state is visible through
/// [`subscribe`](Self::subscribe).
///
/// # Examples
/// ```
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use std::sync::Arc;
/// use cities_core::{City, test_support::{MemoryCityStore, StubCitySource}};
/// use cities_session::{CitySession, Phase, SessionConfig, SessionHandle};
///
/// let runtime = tokio::runtime::Runtime::new()?;
/// runtime.block_on(async {
///     let source = Arc::new(StubCitySource::with_cities(vec![
///         City::new(1, "Lima", "PE", -12.0, -77.0),
///     ]));
///     let store = Arc::new(MemoryCityStore::default());
///     let handle = SessionHandle::spawn(CitySession::new(source, store, SessionConfig::default()));
///     let mut states = handle.subscribe();
///     handle.bootstrap()?;
///     let state = states.wait_for(|state| state.phase == Phase::Content).await?.clone();
///     assert_eq!(state.cities.len(), 1);
///     handle.shutdown().await?;
///     Ok::<_, Box<dyn std::error::Error>>(())
/// })?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SessionHandle {
    dispatcher: Dispatcher,
    keystrokes: mpsc::UnboundedSender<String>,
    states: watch::Receiver<CityListState>,
    actor: JoinHandle<()>,
    debouncer: JoinHandle<()>,
}

impl SessionHandle {
    /// Move `session` onto background tasks.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    #[must_use]
    pub fn spawn<S>(session: CitySession<S>) -> Self
    where
        S: CityStore + 'static,
    {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (keystrokes, keystroke_rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher {
            commands,
            requested: Arc::new(Mutex::new(RequestedInputs {
                search_text: session.search_text().to_owned(),
                favorites_only: session.favorites_only(),
            })),
            tickets: session.tickets(),
        };
        let states = session.subscribe();
        let search = SearchDebouncer::new(session.config().search_debounce);

        let actor = tokio::spawn(run_session(session, command_rx));
        let debouncer = tokio::spawn(run_debouncer(search, keystroke_rx, dispatcher.clone()));
        Self {
            dispatcher,
            keystrokes,
            states,
            actor,
            debouncer,
        }
    }

    /// Fetch, load and show the first page.
    pub fn bootstrap(&self) -> Result<(), SessionError> {
        self.dispatcher.bootstrap()
    }

    /// Record a search keystroke. The query runs once input settles.
    pub fn set_search_text(&self, text: impl Into<String>) -> Result<(), SessionError> {
        self.keystrokes
            .send(text.into())
            .map_err(|_| SessionError::Closed)
    }

    /// Show only favourites, or every city.
    pub fn set_favorites_only(&self, favorites_only: bool) -> Result<(), SessionError> {
        self.dispatcher.favorites(favorites_only)
    }

    /// Append the next page for the current filters.
    pub fn load_next_page(&self) -> Result<(), SessionError> {
        self.dispatcher.dispatch(CityListAction::LoadNextPage)
    }

    /// Flip the favourite flag of city `id`.
    pub fn toggle_favorite(&self, id: i64) -> Result<(), SessionError> {
        self.dispatcher.dispatch(CityListAction::UpdateFavorite(id))
    }

    /// Receive every state the session publishes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CityListState> {
        self.states.clone()
    }

    /// Snapshot of the latest published state.
    #[must_use]
    pub fn state(&self) -> CityListState {
        self.states.borrow().clone()
    }

    /// Stop accepting input, flush pending keystrokes and wait for queued
    /// actions to finish.
    pub async fn shutdown(self) -> Result<(), SessionError> {
        let Self {
            dispatcher,
            keystrokes,
            actor,
            debouncer,
            ..
        } = self;
        drop(keystrokes);
        drop(dispatcher);
        debouncer.await.map_err(SessionError::Worker)?;
        actor.await.map_err(SessionError::Worker)
    }
}

async fn run_session<S>(
    mut session: CitySession<S>,
    mut commands: mpsc::UnboundedReceiver<Command>,
) where
    S: CityStore + 'static,
{
    while let Some(Command { action, ticket }) = commands.recv().await {
        session.handle_ticketed(action, ticket).await;
    }
    debug!("city session driver stopped");
}

async fn run_debouncer(
    debouncer: SearchDebouncer,
    mut keystrokes: mpsc::UnboundedReceiver<String>,
    dispatcher: Dispatcher,
) {
    while let Some(text) = debouncer.next(&mut keystrokes).await {
        if dispatcher.search(text).is_err() {
            break;
        }
    }
}
