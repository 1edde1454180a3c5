//! HTTP client for backend calls.
//!
//! # Responsibilities
//! - Issue the upstream call with the forwarded method, headers and body
//! - Enforce the configured timeout on every call
//! - Classify transport failures into a recoverable error taxonomy
//!
//! # Design Decisions
//! - Redirects are never followed: 3xx responses pass through verbatim
//!   (Location header intact) so the original caller performs redirection
//! - One shared client: connection pooling across requests, built once
//! - Responses are fully buffered; body streaming is out of scope

use std::time::Duration;

use axum::http::{HeaderMap, Method, StatusCode};
use thiserror::Error;

/// Error type for upstream calls.
///
/// Always a recoverable value: the orchestrator converts these into JSON
/// error responses, never a panic or a hung connection.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request timed out")]
    Timeout(#[source] reqwest::Error),

    #[error("upstream unreachable")]
    Connect(#[source] reqwest::Error),

    #[error("upstream request failed")]
    Transport(#[source] reqwest::Error),
}

impl UpstreamError {
    /// Status code this failure is surfaced with.
    pub fn status(&self) -> StatusCode {
        match self {
            UpstreamError::Timeout(_) | UpstreamError::Connect(_) => StatusCode::BAD_GATEWAY,
            UpstreamError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Response from an upstream backend, fully buffered.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Shared upstream HTTP client.
#[derive(Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
}

impl UpstreamClient {
    /// Build the client with the given per-call timeout.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .tcp_nodelay(true)
            .build()?;
        Ok(Self { client })
    }

    /// Forward a request to `url` and buffer the response.
    ///
    /// `headers` must already be filtered: the transport recomputes Host and
    /// Content-Length itself. Cookies and query parameters ride along (the
    /// Cookie header is part of `headers`, the query string part of `url`).
    pub async fn forward(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Vec<u8>,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let mut request = self.client.request(method, url).headers(headers);
        if !body.is_empty() {
            request = request.body(body);
        }

        let response = request.send().await.map_err(classify)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(classify)?.to_vec();

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}

fn classify(error: reqwest::Error) -> UpstreamError {
    if error.is_timeout() {
        UpstreamError::Timeout(error)
    } else if error.is_connect() {
        UpstreamError::Connect(error)
    } else {
        UpstreamError::Transport(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_failure_is_recoverable() {
        let client = UpstreamClient::new(Duration::from_secs(1)).unwrap();
        // Nothing listens on this port.
        let result = client
            .forward(Method::GET, "http://127.0.0.1:1/x", HeaderMap::new(), Vec::new())
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, UpstreamError::Connect(_) | UpstreamError::Transport(_)));
        assert!(err.status().is_server_error());
        // Client-facing message stays free of internal error details.
        assert!(!err.to_string().contains("127.0.0.1"));
    }
}
