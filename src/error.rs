//! Error types shared by the guest fetch pipeline.
//!
//! None of these cross the public boundary of [`GuestFetcher::fetch`]; they
//! exist so each stage can report why an attempt has to be retried.
//!
//! [`GuestFetcher::fetch`]: crate::guest::fetcher::GuestFetcher::fetch

use thiserror::Error;

/// Errors that can occur while talking to the upstream platform.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, TLS or body read failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The issuer (or the cache) handed back something that is not a guest credential.
    #[error("malformed guest credential: {0}")]
    MalformedCredential(String),

    /// The upstream body is not JSON.
    #[error("response body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    /// A request could not be assembled (bad URL, header value, proxy).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type for fetch pipeline operations.
pub type FetchResult<T> = Result<T, FetchError>;
