//! Remote and on-disk adapters for the city dataset.
//!
//! The dataset is a JSON array of records shaped like
//! `{"_id": 1, "name": "...", "country": "AR", "coord": {"lon": 0.0, "lat": 0.0}}`.
//! [`HttpCitySource`] downloads it with `reqwest`; [`FileCitySource`] reads
//! a local copy through `cap-std`.
#![forbid(unsafe_code)]

mod file;
pub mod fs;
mod http;
mod record;

pub use file::FileCitySource;
pub use http::{
    DEFAULT_CITIES_URL, DEFAULT_USER_AGENT, HttpCitySource, HttpCitySourceConfig, SourceBuildError,
};
pub use record::{CityRecord, Coordinates, decode_cities};
