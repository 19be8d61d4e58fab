//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Platform-wide guest bearer credential sent on every upstream call.
///
/// The web app ships a different bearer, but age-restricted accounts are
/// hidden from it.
pub const GUEST_BEARER_TOKEN: &str = "Bearer AAAAAAAAAAAAAAAAAAAAAPYXBAAAAAAACLXUNDekMxqa8h%2F40K4moUkGsoc%3DTYfbDKbT3jJPCEVnMYqilB28NHfOPqkca3qaAxGfsyKCs0wRbw";

/// Root configuration for the service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration for the API surface.
    pub listener: ListenerConfig,

    /// Upstream platform endpoints and credentials.
    pub upstream: UpstreamConfig,

    /// Guest credential lifecycle and retry policy.
    pub guest: GuestConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Optional egress accelerator.
    pub accelerator: AcceleratorConfig,

    /// Deferred maintenance queue.
    pub maintenance: MaintenanceConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream platform endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// REST API root, used for guest activation.
    pub api_root: String,

    /// Web root, used for GraphQL calls and browser-like Origin/Referer headers.
    pub web_root: String,

    /// Syndication CDN root.
    pub syndication_root: String,

    /// Full `Authorization` header value, including the `Bearer ` prefix.
    pub bearer_token: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_root: "https://api.twitter.com".to_string(),
            web_root: "https://twitter.com".to_string(),
            syndication_root: "https://cdn.syndication.twimg.com".to_string(),
            bearer_token: GUEST_BEARER_TOKEN.to_string(),
        }
    }
}

/// Guest credential lifecycle and retry policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GuestConfig {
    /// Maximum age of a guest credential in seconds (also the cache TTL).
    pub max_age_secs: u64,

    /// Maximum number of attempts per fetch invocation.
    pub max_attempts: u32,

    /// Remaining-quota value below which the cached credential is evicted.
    pub rate_limit_low_water: i64,

    /// Base delay between attempts in milliseconds (0 disables backoff).
    pub backoff_base_ms: u64,

    /// Maximum delay between attempts in milliseconds.
    pub backoff_max_ms: u64,
}

impl GuestConfig {
    /// Credential max age as a [`Duration`].
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

impl Default for GuestConfig {
    fn default() -> Self {
        Self {
            max_age_secs: 3 * 60 * 60,
            max_attempts: 16,
            rate_limit_low_water: 10,
            backoff_base_ms: 0,
            backoff_max_ms: 2000,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Upstream request timeout (per attempt) in seconds.
    pub upstream_request_secs: u64,

    /// Total time allowed for one API request in seconds.
    pub api_request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_request_secs: 10,
            api_request_secs: 60,
        }
    }
}

/// Egress accelerator configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AcceleratorConfig {
    /// Route accelerated fetches through the proxy below.
    pub enabled: bool,

    /// Egress proxy URL (e.g., "http://10.0.0.2:3128").
    pub proxy_url: Option<String>,
}

/// Deferred maintenance queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MaintenanceConfig {
    /// Bounded queue capacity before actions spill into detached tasks.
    pub queue_capacity: usize,

    /// How long shutdown waits for queued actions, in seconds.
    pub drain_timeout_secs: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            drain_timeout_secs: 5,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
