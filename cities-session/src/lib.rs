//! Pagination and session state machine for the city list.
//!
//! [`CitySession`] turns [`CityListAction`] values into calls on a
//! [`CitySource`](cities_core::CitySource), a
//! [`BulkLoader`](cities_loader::BulkLoader) and a
//! [`QueryEngine`](cities_core::QueryEngine), publishing one
//! [`CityListState`] per action. [`SessionHandle`] runs a session on a Tokio
//! task, serialises actions through a channel and debounces search input.

#![forbid(unsafe_code)]

mod config;
mod debounce;
mod driver;
mod error;
mod session;
mod state;
mod ticket;

pub use config::SessionConfig;
pub use debounce::SearchDebouncer;
pub use driver::SessionHandle;
pub use error::SessionError;
pub use session::CitySession;
pub use state::{CityListAction, CityListState, Phase};
pub use ticket::{QueryTicket, QueryTickets};
