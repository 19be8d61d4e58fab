//! Upstream platform operations built on the guest fetcher.
//!
//! # Data Flow
//! ```text
//! API handler / CLI
//!     → user.rs (validate name, build GraphQL URL) → GuestFetcher::fetch(is_user_response)
//!     → status.rs (validate id, build syndication URL) → single direct GET
//! ```

pub mod status;
pub mod user;

use std::sync::Arc;

use serde_json::Value;

use crate::config::UpstreamConfig;
use crate::error::FetchResult;
use crate::guest::fetcher::GuestFetcher;
use crate::guest::useragent::{ChromeUserAgents, UserAgentSource};
use crate::http::transport::Transport;

pub use status::validate_status_id;
pub use user::{is_user_response, validate_screen_name};

/// Platform lookups. Input errors are the only `Err`; upstream failure is `{}`.
pub struct PlatformClient {
    fetcher: Arc<GuestFetcher>,
    transport: Arc<dyn Transport>,
    user_agents: Arc<dyn UserAgentSource>,
    web_root: String,
    syndication_root: String,
}

impl PlatformClient {
    pub fn new(
        fetcher: Arc<GuestFetcher>,
        transport: Arc<dyn Transport>,
        upstream: &UpstreamConfig,
    ) -> Self {
        Self {
            fetcher,
            transport,
            user_agents: Arc::new(ChromeUserAgents::default()),
            web_root: upstream.web_root.clone(),
            syndication_root: upstream.syndication_root.clone(),
        }
    }

    pub fn with_user_agents(mut self, user_agents: Arc<dyn UserAgentSource>) -> Self {
        self.user_agents = user_agents;
        self
    }

    pub fn fetcher(&self) -> &GuestFetcher {
        &self.fetcher
    }

    /// Resilient profile lookup by screen name.
    pub async fn fetch_user(&self, screen_name: &str, use_accelerator: bool) -> FetchResult<Value> {
        validate_screen_name(screen_name)?;
        let url = user::user_by_screen_name_url(&self.web_root, screen_name)?;
        Ok(self.fetcher.fetch(&url, use_accelerator, is_user_response).await)
    }

    /// Status lookup through the syndication CDN.
    pub async fn fetch_status(&self, id: &str) -> FetchResult<Value> {
        validate_status_id(id)?;
        let url = status::tweet_result_url(&self.syndication_root, id)?;
        let identity = self.user_agents.generate();
        Ok(status::fetch_syndicated(self.transport.as_ref(), &url, &identity.user_agent).await)
    }
}
