//! Syndication status lookup.
//!
//! The syndication CDN needs no guest credential, so this bypasses the
//! orchestrator: one GET with a browser User-Agent, `{}` on any failure.

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::{Map, Value};
use url::Url;

use crate::error::{FetchError, FetchResult};
use crate::http::transport::{OutboundRequest, Transport};

/// Longest status id accepted (u64 has 20 digits).
pub const MAX_STATUS_ID_LEN: usize = 20;

pub fn validate_status_id(id: &str) -> FetchResult<()> {
    if !id.is_empty() && id.len() <= MAX_STATUS_ID_LEN && id.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(FetchError::InvalidRequest(format!("invalid status id '{}'", id)))
    }
}

pub fn tweet_result_url(syndication_root: &str, id: &str) -> FetchResult<String> {
    let base = format!("{}/tweet-result", syndication_root.trim_end_matches('/'));
    let mut url = Url::parse(&base).map_err(|e| {
        FetchError::InvalidRequest(format!("syndication root '{}': {}", syndication_root, e))
    })?;
    url.query_pairs_mut().append_pair("id", id).append_pair("lang", "en");
    Ok(url.into())
}

/// GET `url` once, returning the parsed body or `{}`.
pub async fn fetch_syndicated(transport: &dyn Transport, url: &str, user_agent: &str) -> Value {
    let mut headers = HeaderMap::new();
    match HeaderValue::from_str(user_agent) {
        Ok(value) => {
            headers.insert(USER_AGENT, value);
        }
        Err(_) => tracing::warn!(user_agent, "Unusable user agent, sending none"),
    }

    let parsed = match transport.send(OutboundRequest::get(url, headers)).await {
        Ok(response) => response.json(),
        Err(e) => Err(e),
    };
    match parsed {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "Failed to fetch status via syndication");
            Value::Object(Map::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::transport::UpstreamResponse;
    use futures_util::future::BoxFuture;
    use reqwest::StatusCode;
    use serde_json::json;
    use std::sync::Mutex;

    struct OneShot {
        body: &'static [u8],
        fail: bool,
        seen: Mutex<Option<OutboundRequest>>,
    }

    impl Transport for OneShot {
        fn send(&self, request: OutboundRequest) -> BoxFuture<'_, FetchResult<UpstreamResponse>> {
            *self.seen.lock().unwrap() = Some(request);
            let result = if self.fail {
                Err(FetchError::Transport("timed out".to_string()))
            } else {
                Ok(UpstreamResponse {
                    status: StatusCode::OK,
                    headers: HeaderMap::new(),
                    body: self.body.to_vec(),
                })
            };
            Box::pin(async move { result })
        }
    }

    fn one_shot(body: &'static [u8], fail: bool) -> OneShot {
        OneShot {
            body,
            fail,
            seen: Mutex::new(None),
        }
    }

    #[test]
    fn test_status_id_rules() {
        assert!(validate_status_id("20").is_ok());
        assert!(validate_status_id("12345678901234567890").is_ok());
        assert!(validate_status_id("").is_err());
        assert!(validate_status_id("123456789012345678901").is_err());
        assert!(validate_status_id("12a").is_err());
        assert!(validate_status_id("-1").is_err());
    }

    #[test]
    fn test_tweet_result_url() {
        let url = tweet_result_url("https://cdn.syndication.twimg.com/", "20").unwrap();
        assert_eq!(url, "https://cdn.syndication.twimg.com/tweet-result?id=20&lang=en");
    }

    #[tokio::test]
    async fn test_syndicated_fetch_sends_only_user_agent() {
        let transport = one_shot(br#"{"id_str":"20","text":"just setting up my twttr"}"#, false);
        let body = fetch_syndicated(&transport, "https://cdn.example.com/tweet-result?id=20", "UA/1").await;
        assert_eq!(body["id_str"], "20");

        let seen = transport.seen.lock().unwrap().take().unwrap();
        assert_eq!(seen.headers.len(), 1);
        assert_eq!(seen.headers[USER_AGENT], "UA/1");
    }

    #[tokio::test]
    async fn test_syndicated_fetch_degrades_to_empty() {
        let failing = one_shot(b"", true);
        assert_eq!(fetch_syndicated(&failing, "https://cdn.example.com/x", "UA/1").await, json!({}));

        let garbage = one_shot(b"<html>", false);
        assert_eq!(fetch_syndicated(&garbage, "https://cdn.example.com/x", "UA/1").await, json!({}));
    }
}
