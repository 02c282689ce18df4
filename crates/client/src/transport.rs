//! HTTP transport used by the remote origin.
//!
//! The remote origin only needs a status code, the response headers and the
//! raw body. Everything about building and sending the request lives behind
//! [`HttpTransport`] so the origin can be driven without a network.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use url::Url;

/// Response returned by an [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Transport-level failure. Timeouts are reported apart from everything else.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { TransportError::Timeout(err.to_string()) } else { TransportError::Request(err.to_string()) }
    }
}

/// Performs a GET request.
#[async_trait]
pub trait HttpTransport: Send + Sync + fmt::Debug {
    async fn get(&self, url: &Url, headers: &HeaderMap) -> Result<HttpResponse, TransportError>;
}

/// [`HttpTransport`] backed by reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    /// Create a transport whose requests are bounded by `timeout`.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, TransportError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .use_rustls_tls()
            .gzip(true)
            .build()
            .map_err(|e| TransportError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url, headers: &HeaderMap) -> Result<HttpResponse, TransportError> {
        let response = self
            .http
            .get(url.as_str())
            .headers(headers.clone())
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        tracing::debug!(
            url = %url,
            status = status.as_u16(),
            bytes = body.len(),
            "remote response received"
        );

        Ok(HttpResponse { status, headers, body })
    }
}
