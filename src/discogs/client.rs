//! Blocking HTTP client for the discography metadata service.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::models::MetadataBlob;
use super::pacer::RequestPacer;
use super::retry::RetryPolicy;

/// Errors from the remote metadata service.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("rate limited by the metadata service")]
    RateLimited,
    #[error("connection failure: {0}")]
    Connection(String),
    #[error("{0} does not exist on the metadata service")]
    NotFound(String),
    #[error("could not parse the response for {0}: {1}")]
    Parse(String, String),
    #[error("unexpected status {status} fetching {what}")]
    Status { what: String, status: u16 },
}

impl FetchError {
    /// Rate limiting and connection drops are transient; everything else
    /// fails the same way on the next attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::RateLimited | FetchError::Connection(_))
    }
}

/// Read access to the canonical metadata catalog.
pub trait MetadataSource {
    /// Fetch a master by id.
    fn master(&self, id: u64) -> Result<MetadataBlob, FetchError>;

    /// Fetch a release by id.
    fn release(&self, id: u64) -> Result<MetadataBlob, FetchError>;

    /// Fetch an artist's display name by id, as the service spells it.
    fn artist_name(&self, id: i64) -> Result<String, FetchError>;
}

/// [`MetadataSource`] over the service's HTTP API.
///
/// Self-throttled: every request goes through the injected pacer and retry
/// policy, so callers never reason about the remote rate ceiling.
pub struct HttpMetadataSource {
    client: Client,
    base_url: String,
    token: Option<String>,
    pacer: RequestPacer,
    retry: RetryPolicy,
}

impl HttpMetadataSource {
    pub fn new(
        base_url: String,
        token: Option<String>,
        user_agent: &str,
        pacer: RequestPacer,
        retry: RetryPolicy,
    ) -> Self {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            token,
            pacer,
            retry,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request<T: DeserializeOwned>(&self, what: &str, path: &str) -> Result<T, FetchError> {
        self.retry.run(what, || {
            self.pacer.pace();
            let url = format!("{}{}", self.base_url, path);
            let mut request = self.client.get(&url);
            if let Some(token) = &self.token {
                request = request.header(
                    reqwest::header::AUTHORIZATION,
                    format!("Discogs token={token}"),
                );
            }
            let response = request
                .send()
                .map_err(|error| FetchError::Connection(error.to_string()))?;
            match response.status() {
                StatusCode::TOO_MANY_REQUESTS => Err(FetchError::RateLimited),
                StatusCode::NOT_FOUND => Err(FetchError::NotFound(what.to_string())),
                status if status.is_success() => response
                    .json::<T>()
                    .map_err(|error| FetchError::Parse(what.to_string(), error.to_string())),
                status => Err(FetchError::Status {
                    what: what.to_string(),
                    status: status.as_u16(),
                }),
            }
        })
    }
}

#[derive(Deserialize)]
struct ArtistPayload {
    name: String,
}

impl MetadataSource for HttpMetadataSource {
    fn master(&self, id: u64) -> Result<MetadataBlob, FetchError> {
        info!("[discogs] requesting master {id}");
        self.request(&format!("master {id}"), &format!("/masters/{id}"))
    }

    fn release(&self, id: u64) -> Result<MetadataBlob, FetchError> {
        info!("[discogs] requesting release {id}");
        self.request(&format!("release {id}"), &format!("/releases/{id}"))
    }

    fn artist_name(&self, id: i64) -> Result<String, FetchError> {
        info!("[discogs] requesting artist {id}");
        let payload: ArtistPayload =
            self.request(&format!("artist {id}"), &format!("/artists/{id}"))?;
        Ok(payload.name)
    }
}
