//! HTTP-based `CitySource` downloading the published dataset.

use std::time::Duration;

use async_trait::async_trait;
use cities_core::{City, CitySource, FetchError, SourceError};
use log::{debug, info};
use reqwest::Client;
use thiserror::Error;

use crate::decode_cities;

/// Published location of the cities dataset.
pub const DEFAULT_CITIES_URL: &str = "https://gist.githubusercontent.com/hernan-uala/dce8843a8edbe0b0018b32e137bc2b3a/raw/0996accf70cb0ca0e16f9a99e0ee185fafca7af1/cities.json";

/// Default user agent for dataset requests.
pub const DEFAULT_USER_AGENT: &str = "cities-engine/0.1";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Error raised while building an [`HttpCitySource`].
#[derive(Debug, Error)]
#[error("failed to build HTTP client: {0}")]
pub struct SourceBuildError(#[source] reqwest::Error);

/// Configuration for [`HttpCitySource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpCitySourceConfig {
    /// Dataset URL.
    pub url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
}

impl Default for HttpCitySourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_CITIES_URL.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl HttpCitySourceConfig {
    /// Create a configuration for the given dataset URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Downloads the whole dataset in a single GET request.
///
/// # Example
///
/// ```no_run
/// use cities_core::CitySource;
/// use cities_data::HttpCitySource;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let source = HttpCitySource::new(cities_data::DEFAULT_CITIES_URL)?;
/// let cities = source.fetch().await?;
/// println!("{} cities", cities.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpCitySource {
    client: Client,
    config: HttpCitySourceConfig,
}

impl HttpCitySource {
    /// Create a source with default settings for `url`.
    pub fn new(url: impl Into<String>) -> Result<Self, SourceBuildError> {
        Self::with_config(HttpCitySourceConfig::new(url))
    }

    /// Create a source with explicit configuration.
    pub fn with_config(config: HttpCitySourceConfig) -> Result<Self, SourceBuildError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(SourceBuildError)?;
        Ok(Self { client, config })
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &HttpCitySourceConfig {
        &self.config
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error) -> FetchError {
        let url = self.config.url.clone();
        if error.is_timeout() {
            return FetchError::Timeout {
                url,
                timeout_secs: self.config.timeout.as_secs(),
            };
        }
        if let Some(status) = error.status() {
            return FetchError::Http {
                url,
                status: status.as_u16(),
            };
        }
        FetchError::Network {
            url,
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl CitySource for HttpCitySource {
    async fn fetch(&self) -> Result<Vec<City>, SourceError> {
        debug!("requesting city dataset from {}", self.config.url);
        let response = self
            .client
            .get(&self.config.url)
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err))?
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err))?;
        let body = response
            .bytes()
            .await
            .map_err(|err| self.convert_reqwest_error(&err))?;
        let cities = decode_cities(&body)?;
        info!("downloaded {} cities from {}", cities.len(), self.config.url);
        Ok(cities)
    }
}
