use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use regex::Regex;
use reqwest::blocking::Client;

use super::error::FetchError;

/// Retrieves the raw text of an inherited decisions document.
pub trait Fetcher {
    fn fetch(&self, location: &str) -> Result<String, FetchError>;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn fetch(&self, location: &str) -> Result<String, FetchError> {
        (**self).fetch(location)
    }
}

/// Reads `http://` and `https://` locations over the network and everything
/// else from the local filesystem.
///
/// Requests are made once; there are no retries.
pub struct SourceFetcher {
    client: Client,
    url_re: Regex,
}

impl SourceFetcher {
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        let url_re = Regex::new(r"^https?://")?;
        Ok(Self { client, url_re })
    }

    /// Whether `location` is fetched over HTTP rather than read from disk.
    pub fn is_url(&self, location: &str) -> bool {
        self.url_re.is_match(location)
    }
}

impl Fetcher for SourceFetcher {
    fn fetch(&self, location: &str) -> Result<String, FetchError> {
        if !self.is_url(location) {
            tracing::debug!(path = location, "reading inherited decisions");
            return std::fs::read_to_string(Path::new(location)).map_err(|source| {
                FetchError::Read {
                    location: location.to_string(),
                    source,
                }
            });
        }

        tracing::debug!(url = location, "fetching inherited decisions");
        let http_err = |source| FetchError::Http {
            location: location.to_string(),
            source,
        };

        let response = self.client.get(location).send().map_err(http_err)?;
        if !response.status().is_success() {
            return Err(FetchError::Status {
                location: location.to_string(),
                status: response.status(),
            });
        }

        response.text().map_err(http_err)
    }
}
