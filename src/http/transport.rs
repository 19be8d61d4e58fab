//! Outbound HTTP transport.
//!
//! # Responsibilities
//! - Send a fully assembled request upstream and buffer the response
//! - Enforce connect/request timeouts (the only per-attempt deadline)
//! - Optionally route through an egress proxy (the accelerator)
//!
//! # Design Decisions
//! - Status codes are data, not errors; the caller's validator decides
//! - Object-safe trait so tests and the accelerator can be swapped in

use std::time::Duration;

use futures_util::future::BoxFuture;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde_json::Value;

use crate::config::TimeoutConfig;
use crate::error::{FetchError, FetchResult};

/// A request ready to be sent upstream.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl OutboundRequest {
    /// A GET request without a body.
    pub fn get(url: impl Into<String>, headers: HeaderMap) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers,
            body: None,
        }
    }

    /// A POST request with an empty body.
    pub fn post_empty(url: impl Into<String>, headers: HeaderMap) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            headers,
            body: Some(Vec::new()),
        }
    }
}

/// A buffered upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    /// Parse the body as JSON.
    pub fn json(&self) -> FetchResult<Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Header value as a string, if present and visible ASCII.
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Anything that can carry an [`OutboundRequest`] upstream.
pub trait Transport: Send + Sync {
    fn send(&self, request: OutboundRequest) -> BoxFuture<'_, FetchResult<UpstreamResponse>>;
}

/// [`Transport`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Direct transport.
    pub fn new(timeouts: &TimeoutConfig) -> FetchResult<Self> {
        let client = Self::builder(timeouts)
            .build()
            .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;
        Ok(Self { client })
    }

    /// Transport that sends everything through an egress proxy.
    pub fn with_egress_proxy(proxy_url: &str, timeouts: &TimeoutConfig) -> FetchResult<Self> {
        let proxy = reqwest::Proxy::all(proxy_url)
            .map_err(|e| FetchError::InvalidRequest(format!("proxy '{}': {}", proxy_url, e)))?;
        let client = Self::builder(timeouts)
            .proxy(proxy)
            .build()
            .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;
        Ok(Self { client })
    }

    fn builder(timeouts: &TimeoutConfig) -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.upstream_request_secs))
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: OutboundRequest) -> BoxFuture<'_, FetchResult<UpstreamResponse>> {
        Box::pin(async move {
            let mut builder = self
                .client
                .request(request.method, &request.url)
                .headers(request.headers);
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder
                .send()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?;

            let status = response.status();
            let headers = response.headers().clone();
            let body = response
                .bytes()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?
                .to_vec();

            Ok(UpstreamResponse {
                status,
                headers,
                body,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn response(body: &str) -> UpstreamResponse {
        let mut headers = HeaderMap::new();
        headers.insert("x-rate-limit-remaining", HeaderValue::from_static("42"));
        UpstreamResponse {
            status: StatusCode::OK,
            headers,
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_response_json() {
        let value = response(r#"{"data":{"id":1}}"#).json().unwrap();
        assert_eq!(value["data"]["id"], 1);
        assert!(matches!(response("<html>").json(), Err(FetchError::Decode(_))));
    }

    #[test]
    fn test_header_str() {
        let res = response("{}");
        assert_eq!(res.header_str("x-rate-limit-remaining"), Some("42"));
        assert_eq!(res.header_str("x-missing"), None);
    }

    #[test]
    fn test_request_constructors() {
        let get = OutboundRequest::get("http://example.com/a", HeaderMap::new());
        assert_eq!(get.method, Method::GET);
        assert!(get.body.is_none());

        let post = OutboundRequest::post_empty("http://example.com/b", HeaderMap::new());
        assert_eq!(post.method, Method::POST);
        assert_eq!(post.body.as_deref(), Some(&[][..]));
    }

    #[test]
    fn test_invalid_proxy_rejected() {
        let result = ReqwestTransport::with_egress_proxy("::not a url::", &TimeoutConfig::default());
        assert!(matches!(result, Err(FetchError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let transport = ReqwestTransport::new(&TimeoutConfig::default()).unwrap();
        // Port 9 (discard) is closed on loopback in test environments.
        let result = transport
            .send(OutboundRequest::get("http://127.0.0.1:9/", HeaderMap::new()))
            .await;
        assert!(matches!(result, Err(FetchError::Transport(_))));
    }
}
