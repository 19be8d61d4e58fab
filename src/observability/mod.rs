//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! guest fetcher, maintenance worker, API handlers produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and histograms)
//!
//! Consumers:
//!     → stdout
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows from the API layer into handler spans
//! - Metrics are cheap (atomic increments) and optional

pub mod logging;
pub mod metrics;
