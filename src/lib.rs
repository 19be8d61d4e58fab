//! Guest API fetch service library.
//!
//! Acquires, caches and rotates guest credentials for an unauthenticated
//! social-media API, and turns its flaky, rate-limited endpoints into a
//! bounded, never-failing fetch.

pub mod config;
pub mod error;
pub mod guest;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod platform;
pub mod resilience;

pub use config::schema::ServiceConfig;
pub use error::{FetchError, FetchResult};
pub use guest::GuestFetcher;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use platform::PlatformClient;
