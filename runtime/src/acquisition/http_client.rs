//! Async HTTP client wrapping reqwest.
//!
//! Not a browser, just HTTP requests. Handles redirects, timeouts and the
//! HTTP/1.1 fallback. Each call is a single attempt; retrying is the
//! fetcher's job.

use super::PageSource;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;

/// HTTP transport for page fetching.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    /// HTTP/1.1-only fallback client for sites that reject HTTP/2.
    h1_client: reqwest::Client,
}

impl HttpClient {
    /// Create a client that identifies itself with `user_agent`.
    pub fn new(timeout_ms: u64, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(user_agent)
            .build()?;

        let h1_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(user_agent)
            .http1_only()
            .build()?;

        Ok(Self { client, h1_client })
    }

    /// GET `url` and return the body.
    ///
    /// Falls back to HTTP/1.1 on protocol errors (some CDNs reject HTTP/2).
    pub async fn get(&self, url: &str, timeout_ms: u64) -> Result<String> {
        match self.get_inner(&self.client, url, timeout_ms).await {
            Ok(body) => Ok(body),
            Err(e) => {
                let err_str = format!("{e}");
                if err_str.contains("http2")
                    || err_str.contains("protocol")
                    || err_str.contains("connection closed")
                {
                    tracing::debug!("retrying {url} over HTTP/1.1 after: {err_str}");
                    self.get_inner(&self.h1_client, url, timeout_ms).await
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn get_inner(
        &self,
        client: &reqwest::Client,
        url: &str,
        timeout_ms: u64,
    ) -> Result<String> {
        let resp = client
            .get(url)
            .timeout(Duration::from_millis(timeout_ms))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            bail!("HTTP {} from {}", status.as_u16(), resp.url());
        }

        Ok(resp.text().await?)
    }
}

#[async_trait]
impl PageSource for HttpClient {
    async fn fetch_text(&self, url: &str, timeout_ms: u64) -> Result<String> {
        self.get(url, timeout_ms).await
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_USER_AGENT;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_http_client_creation() {
        let client = HttpClient::new(10000, DEFAULT_USER_AGENT);
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/problems/two-sum/"))
            .and(header("user-agent", DEFAULT_USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_string("1,234 online"))
            .mount(&server)
            .await;

        let client = HttpClient::new(5000, DEFAULT_USER_AGENT).unwrap();
        let body = client
            .fetch_text(&format!("{}/problems/two-sum/", server.uri()), 5000)
            .await
            .unwrap();
        assert_eq!(body, "1,234 online");
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = HttpClient::new(5000, DEFAULT_USER_AGENT).unwrap();
        let err = client
            .fetch_text(&format!("{}/busy", server.uri()), 5000)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = HttpClient::new(5000, DEFAULT_USER_AGENT).unwrap();
        let result = client.fetch_text(&format!("{}/slow", server.uri()), 50).await;
        assert!(result.is_err());
    }
}
