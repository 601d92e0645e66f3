//! HTTP fetching with per-call timeouts, retries and a size cap.

use async_trait::async_trait;
use rand::Rng;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::{ExtractionConfig, RetryConfig};
use crate::errors::FetchError;

/// Result of a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// HTTP status code.
    pub status_code: u16,
    /// Final URL after redirects.
    pub final_url: String,
    /// Content type from headers.
    pub content_type: Option<String>,
    /// Response body.
    pub body: Vec<u8>,
    /// Time taken to fetch in milliseconds.
    pub duration_ms: f64,
}

impl FetchResult {
    /// Whether the fetch was successful (2xx status).
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body deserialized from JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        serde_json::from_slice(&self.body).map_err(|e| FetchError::Decode {
            url: self.final_url.clone(),
            message: e.to_string(),
        })
    }

    /// Whether the body is a zip archive.
    #[must_use]
    pub fn is_zip(&self) -> bool {
        self.body.starts_with(b"PK\x03\x04")
            || self
                .content_type
                .as_deref()
                .is_some_and(|ct| ct.contains("application/zip"))
    }
}

/// Protocol for outbound HTTP calls made by source adapters.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GETs a URL with query parameters.
    async fn fetch(
        &self,
        url: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> Result<FetchResult, FetchError>;

    /// Checks whether a URL exists with a HEAD request.
    ///
    /// 404 and 410 answer `Ok(false)`; other failures are errors.
    async fn probe(&self, url: &str, timeout: Duration) -> Result<bool, FetchError>;

    /// POSTs a JSON body.
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<FetchResult, FetchError>;
}

/// `Fetcher` backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    max_retries: usize,
    retry: RetryConfig,
    max_response_bytes: usize,
}

impl ReqwestFetcher {
    /// Builds a fetcher from the extraction configuration.
    pub fn new(config: &ExtractionConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .gzip(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::Transport {
                url: String::new(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
            retry: config.retry.clone(),
            max_response_bytes: config.max_response_bytes,
        })
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let delay = self.retry.delay_for_attempt(attempt);
        if !self.retry.jitter {
            return delay;
        }
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        if millis == 0 {
            return delay;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=millis))
    }

    async fn send<F>(&self, url: &str, timeout: Duration, build: F) -> Result<reqwest::Response, FetchError>
    where
        F: Fn() -> reqwest::RequestBuilder + Send + Sync,
    {
        let mut attempt = 0;
        loop {
            let result = build().timeout(timeout).send().await;
            let retry_reason = match result {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => {
                    let status = response.status().as_u16();
                    if attempt >= self.max_retries || !self.retry.should_retry_status(status) {
                        return Err(FetchError::Status {
                            url: url.to_string(),
                            status,
                        });
                    }
                    format!("HTTP {status}")
                }
                Err(e) => {
                    let err = map_reqwest_error(url, &e, timeout);
                    let transient = e.is_connect() && !e.is_timeout();
                    if attempt >= self.max_retries || !transient {
                        return Err(err);
                    }
                    err.to_string()
                }
            };

            let delay = self.backoff(attempt);
            debug!(url = %url, attempt, delay_ms = delay.as_millis() as u64, reason = %retry_reason, "Retrying request");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn read(&self, url: &str, timeout: Duration, mut response: reqwest::Response, started: Instant) -> Result<FetchResult, FetchError> {
        let status_code = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        if response
            .content_length()
            .is_some_and(|len| len > self.max_response_bytes as u64)
        {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
                limit: self.max_response_bytes,
            });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| map_reqwest_error(url, &e, timeout))?
        {
            if body.len() + chunk.len() > self.max_response_bytes {
                return Err(FetchError::TooLarge {
                    url: url.to_string(),
                    limit: self.max_response_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(FetchResult {
            status_code,
            final_url,
            content_type,
            body,
            duration_ms: started.elapsed().as_secs_f64() * 1000.0,
        })
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(
        &self,
        url: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> Result<FetchResult, FetchError> {
        let started = Instant::now();
        let response = self
            .send(url, timeout, || self.client.get(url).query(query))
            .await?;
        self.read(url, timeout, response, started).await
    }

    async fn probe(&self, url: &str, timeout: Duration) -> Result<bool, FetchError> {
        match self.send(url, timeout, || self.client.head(url)).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<FetchResult, FetchError> {
        let started = Instant::now();
        let response = self
            .send(url, timeout, || self.client.post(url).json(body))
            .await?;
        self.read(url, timeout, response, started).await
    }
}

fn map_reqwest_error(url: &str, err: &reqwest::Error, timeout: Duration) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    } else if err.is_decode() || err.is_body() {
        FetchError::Decode {
            url: url.to_string(),
            message: err.to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
