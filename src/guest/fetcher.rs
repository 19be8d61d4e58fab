//! Resilient fetch orchestrator.
//!
//! # State Machine (per invocation, at most `max_attempts` iterations)
//! ```text
//! acquire ──err──────────────────────────────────────────────▶ retry (force fresh)
//!    │
//! assemble ──err─────────────────────────────────────────────▶ retry (force fresh)
//!    │
//! execute ──transport/decode err──▶ invalidate cache ────────▶ retry (force fresh)
//!    │
//! quota < low water ──▶ invalidate cache (success or not)
//!    │
//! validate ──reject──────────────────────────────────────────▶ retry (force fresh)
//!    │
//! issued this attempt? ──▶ cache credential
//!    │
//! attach token ──▶ return body
//!
//! bound reached ──▶ return {}
//! ```
//!
//! Every failure collapses into "stop trusting the cached credential": a bad
//! credential, a bad response, a throttled session and upstream flakiness
//! look the same from here.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::{GuestConfig, UpstreamConfig};
use crate::error::FetchResult;
use crate::guest::credential::GuestCredential;
use crate::guest::headers::{AntiForgeryToken, BaselineHeaders};
use crate::guest::issuer::{CredentialIssuer, CredentialOrigin, CredentialSource};
use crate::guest::maintenance::{MaintenanceAction, MaintenanceScheduler};
use crate::guest::store::CredentialStore;
use crate::guest::useragent::{ChromeUserAgents, UserAgentSource};
use crate::http::transport::{OutboundRequest, Transport, UpstreamResponse};
use crate::observability::metrics;
use crate::resilience::backoff::Backoff;

/// Response header carrying the remaining request quota of the session.
pub const RATE_LIMIT_REMAINING: &str = "x-rate-limit-remaining";

/// Field added to accepted bodies, carrying the guest token that was used.
pub const GUEST_TOKEN_FIELD: &str = "guestToken";

/// Caller-supplied acceptance test over a parsed upstream body.
///
/// The orchestrator knows nothing about response schemas; this decides.
pub trait ValidationPolicy {
    fn accept(&self, body: &Value) -> bool;
}

impl<F> ValidationPolicy for F
where
    F: Fn(&Value) -> bool,
{
    fn accept(&self, body: &Value) -> bool {
        self(body)
    }
}

/// Why an attempt did not produce a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryReason {
    Credential,
    Transport,
    Decode,
    Rejected,
}

impl RetryReason {
    fn label(self) -> &'static str {
        match self {
            RetryReason::Credential => "credential",
            RetryReason::Transport => "transport",
            RetryReason::Decode => "decode",
            RetryReason::Rejected => "rejected",
        }
    }
}

/// Loop-carried state, rebuilt at the top of every iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct LoopState {
    attempt: u32,
    force_fresh: bool,
}

impl LoopState {
    /// State after a failed attempt. Forced refresh never reverts.
    fn after_failure(self) -> Self {
        Self {
            attempt: self.attempt,
            force_fresh: true,
        }
    }

    fn next_attempt(self) -> Self {
        Self {
            attempt: self.attempt + 1,
            force_fresh: self.force_fresh,
        }
    }
}

/// Fetches JSON from the guest API, absorbing every upstream failure.
pub struct GuestFetcher {
    source: CredentialSource,
    transport: Arc<dyn Transport>,
    accelerator: Option<Arc<dyn Transport>>,
    maintenance: MaintenanceScheduler,
    user_agents: Arc<dyn UserAgentSource>,
    web_root: String,
    bearer_token: String,
    max_attempts: u32,
    rate_limit_low_water: i64,
    backoff: Backoff,
}

impl GuestFetcher {
    pub fn new(
        upstream: &UpstreamConfig,
        guest: &GuestConfig,
        store: Arc<dyn CredentialStore>,
        transport: Arc<dyn Transport>,
        maintenance: MaintenanceScheduler,
    ) -> FetchResult<Self> {
        // Unusable web roots or bearers fail here rather than on every fetch.
        let probe = ChromeUserAgents::default().generate();
        BaselineHeaders::browser(&upstream.web_root, &upstream.bearer_token, &probe)?;

        let issuer = CredentialIssuer::new(transport.clone(), &upstream.api_root, guest.max_age());
        Ok(Self {
            source: CredentialSource::new(store, issuer),
            transport,
            accelerator: None,
            maintenance,
            user_agents: Arc::new(ChromeUserAgents::default()),
            web_root: upstream.web_root.clone(),
            bearer_token: upstream.bearer_token.clone(),
            max_attempts: guest.max_attempts,
            rate_limit_low_water: guest.rate_limit_low_water,
            backoff: Backoff::from_millis(guest.backoff_base_ms, guest.backoff_max_ms),
        })
    }

    /// Use `accelerator` for fetches that ask for it.
    pub fn with_accelerator(mut self, accelerator: Arc<dyn Transport>) -> Self {
        self.accelerator = Some(accelerator);
        self
    }

    pub fn with_user_agents(mut self, user_agents: Arc<dyn UserAgentSource>) -> Self {
        self.user_agents = user_agents;
        self
    }

    pub fn has_accelerator(&self) -> bool {
        self.accelerator.is_some()
    }

    /// GET `url` with a guest credential until `validate` accepts the body.
    ///
    /// Returns the accepted body with [`GUEST_TOKEN_FIELD`] attached, or an
    /// empty object once every attempt has failed. Never errors: an empty
    /// object means "try again later".
    pub async fn fetch<V>(&self, url: &str, use_accelerator: bool, validate: V) -> Value
    where
        V: ValidationPolicy,
    {
        let identity = self.user_agents.generate();
        tracing::debug!(user_agent = %identity.user_agent, "Outgoing user agent for this request");
        let baseline = match BaselineHeaders::browser(&self.web_root, &self.bearer_token, &identity) {
            Ok(baseline) => baseline,
            Err(e) => {
                tracing::error!(error = %e, "Cannot assemble baseline headers");
                return Value::Object(Map::new());
            }
        };

        let mut state = LoopState::default();
        while state.attempt < self.max_attempts {
            state = state.next_attempt();
            if state.attempt > 1 {
                let delay = self.backoff.delay(state.attempt - 1);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }

            match self
                .attempt(url, use_accelerator, &baseline, state, &validate)
                .await
            {
                Ok(body) => {
                    metrics::record_attempt("accepted");
                    return body;
                }
                Err(reason) => {
                    metrics::record_attempt(reason.label());
                    tracing::debug!(
                        attempt = state.attempt,
                        reason = reason.label(),
                        "Attempt failed, forcing a fresh guest token"
                    );
                    state = state.after_failure();
                }
            }
        }

        metrics::record_exhausted();
        tracing::warn!(
            url = %url,
            attempts = state.attempt,
            "Upstream repeatedly denied our requests, giving up"
        );
        Value::Object(Map::new())
    }

    async fn attempt<V>(
        &self,
        url: &str,
        use_accelerator: bool,
        baseline: &BaselineHeaders,
        state: LoopState,
        validate: &V,
    ) -> Result<Value, RetryReason>
    where
        V: ValidationPolicy,
    {
        let acquired = match self.source.obtain(state.force_fresh, baseline.issuance()).await {
            Ok(acquired) => acquired,
            Err(e) => {
                tracing::warn!(attempt = state.attempt, error = %e, "Guest credential unavailable");
                return Err(RetryReason::Credential);
            }
        };
        let credential = acquired.credential;

        let csrf = AntiForgeryToken::generate();
        let headers = match baseline.for_attempt(&credential, &csrf) {
            Ok(headers) => headers,
            Err(e) => {
                tracing::warn!(attempt = state.attempt, error = %e, "Cannot bind guest token");
                return Err(RetryReason::Credential);
            }
        };

        let request = OutboundRequest::get(url, headers);
        let response = match self.transport_for(use_accelerator).send(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(attempt = state.attempt, error = %e, "Unknown error while fetching from API");
                self.invalidate_cached();
                return Err(RetryReason::Transport);
            }
        };
        let mut body = match response.json() {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(
                    attempt = state.attempt,
                    status = %response.status,
                    error = %e,
                    "Upstream returned an unreadable body"
                );
                self.invalidate_cached();
                return Err(RetryReason::Decode);
            }
        };

        let mut nearly_exhausted = false;
        if let Some(remaining) = remaining_quota(&response) {
            tracing::debug!(remaining, "Remaining rate limit");
            if remaining < self.rate_limit_low_water {
                tracing::info!(remaining, "Purging guest token on this node due to low rate limit");
                self.invalidate_cached();
                nearly_exhausted = true;
            }
        }

        if !validate.accept(&body) {
            tracing::debug!(attempt = state.attempt, body = %body, "Validator rejected response");
            return Err(RetryReason::Rejected);
        }

        // A token that is about to run out is used once more but never cached.
        if acquired.origin == CredentialOrigin::Issued && !nearly_exhausted {
            self.cache_credential(&credential);
        }

        if let Value::Object(map) = &mut body {
            map.insert(GUEST_TOKEN_FIELD.to_string(), Value::String(credential.token));
        }
        Ok(body)
    }

    fn transport_for(&self, use_accelerator: bool) -> &dyn Transport {
        match (&self.accelerator, use_accelerator) {
            (Some(accelerator), true) => {
                tracing::debug!("Fetching using accelerator");
                accelerator.as_ref()
            }
            _ => self.transport.as_ref(),
        }
    }

    fn invalidate_cached(&self) {
        self.maintenance.schedule(MaintenanceAction::Invalidate {
            key: self.source.cache_key().clone(),
        });
    }

    fn cache_credential(&self, credential: &GuestCredential) {
        match credential.encode() {
            Ok(payload) => {
                tracing::debug!(guest_token = %credential.token, "Caching guest token");
                self.maintenance.schedule(MaintenanceAction::Store {
                    key: self.source.cache_key().clone(),
                    payload,
                    ttl: credential.max_age(),
                });
            }
            Err(e) => tracing::warn!(error = %e, "Cannot encode guest token for caching"),
        }
    }
}

/// Remaining quota from the response headers.
///
/// A missing or empty header counts as exhausted (0). Otherwise the leading
/// integer is used (`"5abc"` is 5); a value with no leading digits is ignored.
fn remaining_quota(response: &UpstreamResponse) -> Option<i64> {
    match response.header_str(RATE_LIMIT_REMAINING) {
        None => Some(0),
        Some(raw) if raw.is_empty() => Some(0),
        Some(raw) => leading_integer(raw),
    }
}

fn leading_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };
    let end = digits.bytes().take_while(u8::is_ascii_digit).count();
    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}
