use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use cities_core::{City, CitySource, FetchError, SourceError};
use log::debug;

use crate::{decode_cities, fs::read_utf8_file};

/// Reads the city dataset from a local JSON file.
#[derive(Debug, Clone)]
pub struct FileCitySource {
    path: Utf8PathBuf,
}

impl FileCitySource {
    /// Build a source reading `path`.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the dataset file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

#[async_trait]
impl CitySource for FileCitySource {
    async fn fetch(&self) -> Result<Vec<City>, SourceError> {
        let bytes = read_utf8_file(&self.path).map_err(|err| FetchError::Read {
            path: self.path.clone().into_std_path_buf(),
            message: err.to_string(),
        })?;
        debug!("read {} bytes from {}", bytes.len(), self.path);
        Ok(decode_cities(&bytes)?)
    }
}
