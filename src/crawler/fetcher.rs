//! HTTP fetcher implementation
//!
//! This module defines the retrieval interface used by fetch workers and its
//! default implementation over `reqwest`:
//! - Building HTTP clients with the configured timeouts and user agent
//! - Issuing one request per page, with no retries
//! - Classifying failures into `TransportError`
//! - Sharing one session across workers, or giving each worker its own

use crate::config::{CrawlConfig, SessionMode, UserAgentConfig};
use crate::crawler::source::FetchRequest;
use crate::{ConfigError, TransportError};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use std::sync::Arc;
use std::time::Duration;

/// A successful retrieval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// HTTP status code
    pub status_code: u16,
    /// Raw page payload
    pub body: String,
}

/// Retrieval interface consumed by the fetch pool
///
/// Implementations are called concurrently from every fetch worker.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, TransportError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `crawl` - Timeouts are taken from the crawl section
///
/// # Example
///
/// ```no_run
/// use archive_pager::config::load_config;
/// use archive_pager::crawler::build_http_client;
/// use std::path::Path;
///
/// let config = load_config(Path::new("config.toml")).unwrap();
/// let client = build_http_client(&config.user_agent, &config.crawl).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    crawl: &CrawlConfig,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(Duration::from_secs(crawl.request_timeout_secs))
        .connect_timeout(Duration::from_secs(crawl.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// `Fetcher` over a `reqwest::Client`
///
/// `reqwest::Client` pools connections internally and is safe to share.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, TransportError> {
        let url = request.url.to_string();
        let method = Method::from_bytes(request.method.as_bytes()).map_err(|e| {
            TransportError::Connect {
                url: url.clone(),
                message: format!("invalid method '{}': {}", request.method, e),
            }
        })?;

        let response = self
            .client
            .request(method, request.url.clone())
            .headers(header_map(&request.headers))
            .send()
            .await
            .map_err(|e| classify_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| TransportError::Body {
            url: url.clone(),
            message: e.to_string(),
        })?;

        Ok(FetchResponse {
            status_code: status.as_u16(),
            body,
        })
    }
}

/// Converts configured headers, skipping any that are not valid HTTP headers
fn header_map(headers: &std::collections::BTreeMap<String, String>) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => tracing::warn!("Skipping invalid header {}", name),
        }
    }
    map
}

/// Classifies a send error
fn classify_error(url: &str, error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        TransportError::Connect {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        TransportError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}

/// The fetchers handed to the fetch pool, one per worker
///
/// Whether workers share a session is decided here, explicitly, from the
/// configured `SessionMode`.
#[derive(Clone)]
pub enum FetcherSet {
    /// Every worker calls the same fetcher
    Shared(Arc<dyn Fetcher>),
    /// Worker `i` uses fetcher `i`
    PerWorker(Vec<Arc<dyn Fetcher>>),
}

impl FetcherSet {
    /// Builds HTTP fetchers for `workers` fetch workers
    pub fn http(
        mode: SessionMode,
        workers: usize,
        user_agent: &UserAgentConfig,
        crawl: &CrawlConfig,
    ) -> Result<Self, reqwest::Error> {
        match mode {
            SessionMode::Shared => {
                let client = build_http_client(user_agent, crawl)?;
                Ok(Self::Shared(Arc::new(HttpFetcher::new(client))))
            }
            SessionMode::PerWorker => {
                let fetchers = (0..workers)
                    .map(|_| {
                        build_http_client(user_agent, crawl)
                            .map(|client| Arc::new(HttpFetcher::new(client)) as Arc<dyn Fetcher>)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Self::PerWorker(fetchers))
            }
        }
    }

    /// Hands out exactly one fetcher to each of `workers` fetch workers
    ///
    /// A per-worker set must hold one fetcher per worker; any other size is
    /// rejected rather than letting two workers share a session.
    pub fn assign(&self, workers: usize) -> Result<Vec<Arc<dyn Fetcher>>, ConfigError> {
        match self {
            Self::Shared(fetcher) => Ok(vec![Arc::clone(fetcher); workers]),
            Self::PerWorker(fetchers) if fetchers.len() == workers => Ok(fetchers.clone()),
            Self::PerWorker(fetchers) => Err(ConfigError::Validation(format!(
                "per-worker session mode has {} client(s) for {} fetch workers",
                fetchers.len(),
                workers
            ))),
        }
    }
}

impl From<Arc<dyn Fetcher>> for FetcherSet {
    fn from(fetcher: Arc<dyn Fetcher>) -> Self {
        Self::Shared(fetcher)
    }
}
