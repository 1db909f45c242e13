//! JSON payloads printed by the CLI.

use std::io::Write;

use cities_core::City;
use serde::Serialize;

use crate::CliError;

/// A city as printed, with its rendered flag.
#[derive(Debug, Serialize)]
pub(crate) struct CityView<'a> {
    #[serde(flatten)]
    pub(crate) city: &'a City,
    pub(crate) flag: String,
}

impl<'a> From<&'a City> for CityView<'a> {
    fn from(city: &'a City) -> Self {
        Self {
            city,
            flag: city.flag_emoji(),
        }
    }
}

pub(crate) fn views(cities: &[City]) -> Vec<CityView<'_>> {
    cities.iter().map(CityView::from).collect()
}

/// Output of `cities refresh`.
#[derive(Debug, Serialize)]
pub(crate) struct RefreshOutput<'a> {
    /// Seconds spent clearing and writing the catalogue.
    pub(crate) persisted_seconds: Option<f64>,
    /// First page of the refreshed catalogue.
    pub(crate) cities: Vec<CityView<'a>>,
}

/// Output of `cities list`.
#[derive(Debug, Serialize)]
pub(crate) struct ListOutput<'a> {
    pub(crate) page: usize,
    /// Rows matching the filters across all pages.
    pub(crate) total: usize,
    pub(crate) cities: Vec<CityView<'a>>,
}

pub(crate) fn write_json<T: Serialize>(out: &mut dyn Write, value: &T) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut *out, value).map_err(CliError::SerializeOutput)?;
    writeln!(out).map_err(CliError::WriteOutput)
}
