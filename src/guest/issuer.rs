//! Credential acquisition: cache lookup first, upstream activation second.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::HeaderMap;

use crate::error::FetchResult;
use crate::guest::credential::GuestCredential;
use crate::guest::store::{CacheKey, CredentialStore};
use crate::http::transport::{OutboundRequest, Transport};
use crate::observability::metrics;

/// Where an acquired credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialOrigin {
    /// Reused from the credential store.
    Cached,
    /// Freshly activated upstream during this attempt.
    Issued,
}

/// A credential ready to be bound to an attempt.
#[derive(Debug, Clone)]
pub struct AcquiredCredential {
    pub credential: GuestCredential,
    pub origin: CredentialOrigin,
}

/// Requests new guest credentials from the upstream platform.
pub struct CredentialIssuer {
    transport: Arc<dyn Transport>,
    activate_url: String,
    max_age: Duration,
}

impl CredentialIssuer {
    pub fn new(transport: Arc<dyn Transport>, api_root: &str, max_age: Duration) -> Self {
        Self {
            transport,
            activate_url: format!("{}/1.1/guest/activate.json", api_root.trim_end_matches('/')),
            max_age,
        }
    }

    pub fn activate_url(&self) -> &str {
        &self.activate_url
    }

    /// `POST /1.1/guest/activate.json` with an empty body.
    pub async fn issue(&self, headers: HeaderMap) -> FetchResult<GuestCredential> {
        let response = self
            .transport
            .send(OutboundRequest::post_empty(self.activate_url.clone(), headers))
            .await?;
        let credential = GuestCredential::from_activation(&response.body, self.max_age)?;
        metrics::record_credential_issued();
        tracing::info!(guest_token = %credential.token, "Activated guest session");
        Ok(credential)
    }
}

/// Store/issuer interplay behind `obtain`.
pub struct CredentialSource {
    store: Arc<dyn CredentialStore>,
    issuer: CredentialIssuer,
    key: CacheKey,
}

impl CredentialSource {
    pub fn new(store: Arc<dyn CredentialStore>, issuer: CredentialIssuer) -> Self {
        let key = CacheKey::guest_session(issuer.activate_url(), issuer.max_age);
        Self { store, issuer, key }
    }

    /// Identity of the cached guest session slot.
    pub fn cache_key(&self) -> &CacheKey {
        &self.key
    }

    /// Reuse the cached credential unless `force_fresh`, otherwise issue one.
    ///
    /// A cache miss falls through to issuance and reports [`CredentialOrigin::Issued`].
    /// A cached payload that does not decode is an error, not a miss.
    pub async fn obtain(
        &self,
        force_fresh: bool,
        issuance_headers: HeaderMap,
    ) -> FetchResult<AcquiredCredential> {
        if !force_fresh {
            match self.store.get(&self.key).await {
                Ok(Some(payload)) => {
                    metrics::record_credential_lookup("hit");
                    let credential = GuestCredential::decode(&payload)?;
                    tracing::debug!(guest_token = %credential.token, "Guest token cache hit");
                    return Ok(AcquiredCredential {
                        credential,
                        origin: CredentialOrigin::Cached,
                    });
                }
                Ok(None) => {
                    metrics::record_credential_lookup("miss");
                    tracing::debug!("Guest token cache miss");
                }
                Err(e) => {
                    metrics::record_credential_lookup("error");
                    tracing::warn!(error = %e, "Credential store lookup failed, treating as miss");
                }
            }
        }

        let credential = self.issuer.issue(issuance_headers).await?;
        Ok(AcquiredCredential {
            credential,
            origin: CredentialOrigin::Issued,
        })
    }
}
