//! Credential store: an edge-local, TTL-aware key/value cache.
//!
//! The store is best-effort. Entries may vanish at any time and concurrent
//! writers race with last-write-wins semantics; callers must tolerate both.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures_util::future::{self, BoxFuture, FutureExt};
use thiserror::Error;
use tokio::time::Instant;

/// Errors surfaced by a [`CredentialStore`] backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// Side-effect-free descriptor identifying a guest session slot.
///
/// Distinct from the POST actually sent to the issuer: cache substrates
/// only index idempotent requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub method: &'static str,
    pub url: String,
    pub ttl_secs: u64,
}

impl CacheKey {
    /// Key for the guest session slot behind `activate_url`.
    pub fn guest_session(activate_url: &str, ttl: Duration) -> Self {
        Self {
            method: "GET",
            url: activate_url.to_string(),
            ttl_secs: ttl.as_secs(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} (max-age={})", self.method, self.url, self.ttl_secs)
    }
}

/// Injected key/value capability holding serialized credentials.
pub trait CredentialStore: Send + Sync {
    /// Payload for `key`, or `None` when absent or expired.
    fn get<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Result<Option<String>, StoreError>>;

    /// Replace the entry for `key`. The entry expires after `ttl`.
    fn put<'a>(
        &'a self,
        key: &'a CacheKey,
        payload: String,
        ttl: Duration,
    ) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Remove the entry for `key`. Returns whether an entry was present.
    ///
    /// Deleting a missing key is not an error.
    fn delete<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Result<bool, StoreError>>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: String,
    expires_at: Instant,
}

/// In-process [`CredentialStore`] shared by every invocation on this node.
///
/// Expiry uses the tokio clock, so tests can pause and advance it.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentialStore {
    inner: Arc<DashMap<CacheKey, CacheEntry>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn lookup(&self, key: &CacheKey) -> Option<String> {
        let now = Instant::now();
        let expired = match self.inner.get(key) {
            Some(entry) if entry.expires_at > now => return Some(entry.payload.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.inner.remove_if(key, |_, entry| entry.expires_at <= now);
        }
        None
    }

    fn replace(&self, key: &CacheKey, payload: String, ttl: Duration) {
        // Entries are immutable: delete, then write a new one.
        self.inner.remove(key);
        self.inner.insert(
            key.clone(),
            CacheEntry {
                payload,
                expires_at: Instant::now() + ttl,
            },
        );
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
        future::ready(Ok(self.lookup(key))).boxed()
    }

    fn put<'a>(
        &'a self,
        key: &'a CacheKey,
        payload: String,
        ttl: Duration,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        self.replace(key, payload, ttl);
        future::ready(Ok(())).boxed()
    }

    fn delete<'a>(&'a self, key: &'a CacheKey) -> BoxFuture<'a, Result<bool, StoreError>> {
        future::ready(Ok(self.inner.remove(key).is_some())).boxed()
    }
}
