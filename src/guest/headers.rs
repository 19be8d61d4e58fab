//! Request assembly.
//!
//! # Responsibilities
//! - Build the browser-like baseline header set for one invocation
//! - Bind a guest credential and a fresh anti-forgery token to each attempt
//!
//! # Design Decisions
//! - Per-attempt headers overwrite any baseline header of the same name
//! - `Accept-Encoding` is left to the HTTP client so it can decompress

use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE,
    COOKIE, DNT, ORIGIN, REFERER, USER_AGENT,
};
use url::Url;
use uuid::Uuid;

use crate::error::{FetchError, FetchResult};
use crate::guest::credential::GuestCredential;
use crate::guest::useragent::BrowserIdentity;

pub const X_CSRF_TOKEN: &str = "x-csrf-token";
pub const X_GUEST_TOKEN: &str = "x-guest-token";
pub const X_ACTIVE_USER: &str = "x-twitter-active-user";

/// Self-generated CSRF token. Upstream only checks that the `x-csrf-token`
/// header and the `ct0` cookie agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AntiForgeryToken(String);

impl AntiForgeryToken {
    /// Random UUID v4 with separators stripped.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Fixed headers shared by every request of one invocation.
#[derive(Debug, Clone)]
pub struct BaselineHeaders {
    headers: HeaderMap,
    authorization: HeaderValue,
}

impl BaselineHeaders {
    /// Browser-like headers for `web_root`, with `identity` as User-Agent.
    pub fn browser(web_root: &str, bearer: &str, identity: &BrowserIdentity) -> FetchResult<Self> {
        let root = Url::parse(web_root)
            .map_err(|e| FetchError::InvalidRequest(format!("web root '{}': {}", web_root, e)))?;
        let host = root
            .host_str()
            .ok_or_else(|| FetchError::InvalidRequest(format!("web root '{}' has no host", web_root)))?;
        let origin = root.origin().ascii_serialization();

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("authority"), header_value(host)?);
        headers.insert(DNT, HeaderValue::from_static("1"));
        headers.insert(
            HeaderName::from_static("x-twitter-client-language"),
            HeaderValue::from_static("en"),
        );
        headers.insert(HeaderName::from_static("sec-ch-ua-mobile"), HeaderValue::from_static("?0"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(HeaderName::from_static(X_ACTIVE_USER), HeaderValue::from_static("yes"));
        headers.insert(
            HeaderName::from_static("sec-ch-ua-platform"),
            HeaderValue::from_static("\"Windows\""),
        );
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ORIGIN, header_value(&origin)?);
        headers.insert(HeaderName::from_static("sec-fetch-site"), HeaderValue::from_static("same-site"));
        headers.insert(HeaderName::from_static("sec-fetch-mode"), HeaderValue::from_static("cors"));
        headers.insert(HeaderName::from_static("sec-fetch-dest"), HeaderValue::from_static("empty"));
        headers.insert(REFERER, header_value(&format!("{}/", origin))?);
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en"));
        headers.insert(USER_AGENT, header_value(&identity.user_agent)?);
        headers.insert(HeaderName::from_static("sec-ch-ua"), header_value(&identity.sec_ch_ua)?);

        Ok(Self {
            headers,
            authorization: header_value(bearer)?,
        })
    }

    /// Headers for the guest activation call.
    pub fn issuance(&self) -> HeaderMap {
        let mut headers = self.headers.clone();
        headers.insert(AUTHORIZATION, self.authorization.clone());
        headers
    }

    /// Headers for a data fetch bound to `credential` and `csrf`.
    pub fn for_attempt(
        &self,
        credential: &GuestCredential,
        csrf: &AntiForgeryToken,
    ) -> FetchResult<HeaderMap> {
        let token = credential.token.as_str();
        let cookie = [
            format!("guest_id_ads=v1%3A{}", token),
            format!("guest_id_marketing=v1%3A{}", token),
            format!("guest_id=v1%3A{}", token),
            format!("ct0={}", csrf.as_str()),
        ]
        .join("; ");

        let mut headers = self.headers.clone();
        headers.insert(AUTHORIZATION, self.authorization.clone());
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&cookie)
                .map_err(|_| FetchError::MalformedCredential(format!("unusable token '{}'", token)))?,
        );
        headers.insert(HeaderName::from_static(X_CSRF_TOKEN), header_value(csrf.as_str())?);
        headers.insert(HeaderName::from_static(X_ACTIVE_USER), HeaderValue::from_static("yes"));
        headers.insert(
            HeaderName::from_static(X_GUEST_TOKEN),
            HeaderValue::from_str(token)
                .map_err(|_| FetchError::MalformedCredential(format!("unusable token '{}'", token)))?,
        );
        Ok(headers)
    }
}

fn header_value(value: &str) -> FetchResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| FetchError::InvalidRequest(format!("invalid header value '{}'", value)))
}
