use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

use super::parser::{parse_feed, RssFeed};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB
const USER_AGENT: &str = concat!("gator/", env!("CARGO_PKG_VERSION"));

/// Errors that can occur while fetching a feed.
///
/// None of these are retried: the scraper logs them and moves on to the
/// next tick.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the 30-second timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Body could not be parsed as an RSS channel
    #[error("Parse error: {0}")]
    Parse(String),
}

/// HTTP client that turns a feed URL into a parsed RSS document.
#[derive(Clone)]
pub struct FeedClient {
    client: reqwest::Client,
}

impl FeedClient {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// GET `url` and parse the body as RSS.
    pub async fn fetch(&self, url: &str) -> Result<RssFeed, FetchError> {
        let response = tokio::time::timeout(REQUEST_TIMEOUT, self.client.get(url).send())
            .await
            .map_err(|_| FetchError::Timeout)??;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let bytes = tokio::time::timeout(
            REQUEST_TIMEOUT,
            read_limited_bytes(response, MAX_FEED_SIZE),
        )
        .await
        .map_err(|_| FetchError::Timeout)??;

        parse_feed(&bytes).map_err(|e| FetchError::Parse(e.to_string()))
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
