//! HTTP client with retry logic, timeouts, and cookie support

use crate::config::HttpConfig;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, Response};
use std::time::Duration;

/// Which failures a request may be repeated after
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryPolicy {
    /// Safe to replay: transport failures and 5xx responses
    Idempotent,
    /// Only replayed when the connection was never established
    SingleDelivery,
}

impl RetryPolicy {
    fn retries_status(self, status: reqwest::StatusCode) -> bool {
        self == RetryPolicy::Idempotent && status.is_server_error()
    }

    fn retries_error(self, err: &reqwest::Error) -> bool {
        match self {
            RetryPolicy::Idempotent => err.is_timeout() || err.is_connect() || err.is_request(),
            RetryPolicy::SingleDelivery => err.is_connect(),
        }
    }
}

pub struct HttpClient {
    inner: Client,
    max_attempts: u32,
    retry_delay: Duration,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> reqwest::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static("Mozilla/5.0 (X11; Linux x86_64) Chrome/120.0"),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeout))
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            inner: client,
            max_attempts: config.max_retries.max(1),
            retry_delay: Duration::from_secs(config.retry_delay),
        })
    }

    /// GET `url`, following redirects. The response is returned whatever
    /// its status; only transport failures and 5xx are retried.
    pub async fn get(&self, url: &str) -> reqwest::Result<Response> {
        self.with_retry(RetryPolicy::Idempotent, || self.inner.get(url).send())
            .await
    }

    /// POST a JSON body. A request that reached the server is never sent
    /// again, whatever the response.
    pub async fn post_json_with_headers<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
        headers: HeaderMap,
    ) -> reqwest::Result<Response> {
        self.with_retry(RetryPolicy::SingleDelivery, || {
            self.inner
                .post(url)
                .header("Content-Type", "application/json")
                .headers(headers.clone())
                .json(body)
                .send()
        })
        .await
    }

    /// Retry up to `max_attempts` times with a fixed delay
    async fn with_retry<F, Fut>(
        &self,
        policy: RetryPolicy,
        request_fn: F,
    ) -> reqwest::Result<Response>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = reqwest::Result<Response>>,
    {
        let mut attempt = 1;

        loop {
            match request_fn().await {
                Ok(resp) if policy.retries_status(resp.status()) && attempt < self.max_attempts => {
                    tracing::warn!(
                        "Server error {}, retrying in {:?}... (attempt {}/{})",
                        resp.status(),
                        self.retry_delay,
                        attempt,
                        self.max_attempts
                    );
                }
                Ok(resp) => return Ok(resp),
                Err(e) if policy.retries_error(&e) && attempt < self.max_attempts => {
                    tracing::warn!(
                        "Request error: {}, retrying in {:?}... (attempt {}/{})",
                        e,
                        self.retry_delay,
                        attempt,
                        self.max_attempts
                    );
                }
                Err(e) => return Err(e),
            }

            tokio::time::sleep(self.retry_delay).await;
            attempt += 1;
        }
    }
}
