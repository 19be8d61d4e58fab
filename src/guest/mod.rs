//! Guest credential lifecycle and resilient fetching.
//!
//! # Data Flow
//! ```text
//! fetch(url, validate)
//!     → useragent.rs (one browser identity per invocation)
//!     → headers.rs (baseline + per-attempt credential binding)
//!     → issuer.rs (cached credential or fresh activation)
//!     → http::transport (direct or accelerator)
//!     → fetcher.rs (quota check, validation, retry)
//!     → maintenance.rs (deferred cache writes and evictions)
//!     → store.rs (shared credential cache)
//! ```

pub mod credential;
pub mod fetcher;
pub mod headers;
pub mod issuer;
pub mod maintenance;
pub mod store;
pub mod useragent;

pub use credential::GuestCredential;
pub use fetcher::{GuestFetcher, ValidationPolicy, GUEST_TOKEN_FIELD};
pub use maintenance::{MaintenanceAction, MaintenanceScheduler};
pub use store::{CacheKey, CredentialStore, MemoryCredentialStore, StoreError};
pub use useragent::{BrowserIdentity, ChromeUserAgents, FixedUserAgent, UserAgentSource};
